use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlMapperDbError;
use crate::types::RowValues;

/// A writable destination for one column of the current row.
///
/// Cursors call [`ScanTarget::scan`] once per column; the destination decides how (and
/// whether) the database value converts into its own type.
pub trait ScanTarget {
    /// # Errors
    /// Returns `SqlMapperDbError::InvalidDataType` if `value` cannot be represented.
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError>;
}

/// Sink for columns no field maps to. Reads the value and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ScanTarget for Discard {
    fn scan(&mut self, _value: &RowValues) -> Result<(), SqlMapperDbError> {
        Ok(())
    }
}

fn mismatch(value: &RowValues, target: &str) -> SqlMapperDbError {
    SqlMapperDbError::invalid_data_type(format_args!(
        "cannot scan {} into {target}",
        value.type_name()
    ))
}

fn scan_wide_int(value: &RowValues, target: &str) -> Result<i64, SqlMapperDbError> {
    if let Some(i) = value.as_int() {
        return Ok(*i);
    }
    match value {
        RowValues::Bool(b) => Ok(i64::from(*b)),
        _ => Err(mismatch(value, target)),
    }
}

macro_rules! impl_scan_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ScanTarget for $ty {
                fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
                    let wide = scan_wide_int(value, stringify!($ty))?;
                    *self = <$ty>::try_from(wide).map_err(|_| {
                        SqlMapperDbError::invalid_data_type(format_args!(
                            "value {wide} out of range for {}",
                            stringify!($ty)
                        ))
                    })?;
                    Ok(())
                }
            }
        )*
    };
}

impl_scan_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ScanTarget for f64 {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = value.as_float().ok_or_else(|| mismatch(value, "f64"))?;
        Ok(())
    }
}

impl ScanTarget for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = value.as_float().ok_or_else(|| mismatch(value, "f32"))? as f32;
        Ok(())
    }
}

impl ScanTarget for bool {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = value.as_bool().ok_or_else(|| mismatch(value, "bool"))?;
        Ok(())
    }
}

impl ScanTarget for String {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = match value {
            RowValues::Text(s) => s.clone(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Bool(b) => b.to_string(),
            RowValues::Timestamp(dt) => dt.format("%F %T%.f").to_string(),
            RowValues::JSON(json) => json.to_string(),
            RowValues::Blob(bytes) => String::from_utf8(bytes.clone()).map_err(|e| {
                SqlMapperDbError::invalid_data_type(format_args!(
                    "BLOB is not valid UTF-8 text: {e}"
                ))
            })?,
            RowValues::Null => return Err(mismatch(value, "String")),
        };
        Ok(())
    }
}

impl ScanTarget for Vec<u8> {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = value
            .as_blob()
            .or_else(|| value.as_text().map(str::as_bytes))
            .ok_or_else(|| mismatch(value, "Vec<u8>"))?
            .to_vec();
        Ok(())
    }
}

impl ScanTarget for NaiveDateTime {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = value
            .as_timestamp()
            .ok_or_else(|| mismatch(value, "NaiveDateTime"))?;
        Ok(())
    }
}

impl ScanTarget for JsonValue {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        *self = match value {
            RowValues::JSON(json) => json.clone(),
            RowValues::Text(s) => serde_json::from_str(s).map_err(|e| {
                SqlMapperDbError::invalid_data_type(format_args!("TEXT is not valid JSON: {e}"))
            })?,
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Null => JsonValue::Null,
            _ => return Err(mismatch(value, "serde_json::Value")),
        };
        Ok(())
    }
}

/// NULL becomes `None`; anything else is scanned into a fresh `T`.
impl<T: ScanTarget + Default> ScanTarget for Option<T> {
    fn scan(&mut self, value: &RowValues) -> Result<(), SqlMapperDbError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.scan(value)?;
        *self = Some(inner);
        Ok(())
    }
}
