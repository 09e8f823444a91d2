use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use super::scan::ScanTarget;

/// Separator placed between a nested record's prefix and its inner column names.
pub const PREFIX_SEPARATOR: &str = "_";

/// Column name to field location map for one record instance.
///
/// Built fresh for every row: each entry borrows a field of the record being scanned.
#[derive(Default)]
pub struct FieldBindings<'a> {
    fields: HashMap<String, &'a mut dyn ScanTarget>,
}

impl<'a> FieldBindings<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    /// Walk `record` from the root namespace and collect every field it exposes.
    pub fn for_record<R: Record>(record: &'a mut R) -> Self {
        let mut bindings = Self::new();
        record.bind_fields("", &mut bindings);
        bindings
    }

    /// Register a leaf field under `column`. A later field resolving to the same column
    /// replaces the earlier one.
    pub fn bind_leaf(&mut self, column: String, target: &'a mut dyn ScanTarget) {
        self.fields.insert(column, target);
    }

    /// Remove and return the destination for `column`, if any field maps to it.
    pub fn take(&mut self, column: &str) -> Option<&'a mut dyn ScanTarget> {
        self.fields.remove(column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Resolved column names, sorted.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self.fields.keys().cloned().collect();
        columns.sort();
        columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Debug for FieldBindings<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBindings")
            .field("columns", &self.columns())
            .finish()
    }
}

/// Join a namespace prefix and a field's resolved name.
///
/// ```rust
/// use sql_mapper::mapper::column_name;
///
/// assert_eq!(column_name("", "id"), "id");
/// assert_eq!(column_name("user_address", "street"), "user_address_street");
/// ```
#[must_use]
pub fn column_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}{PREFIX_SEPARATOR}{name}")
    }
}

/// Anything a record field can be: a scalar leaf, or a nested record.
///
/// `column` is the field's fully resolved name. Leaves register themselves under it;
/// records treat it as the prefix for their own fields.
pub trait Bindable {
    fn bind<'a>(&'a mut self, column: String, bindings: &mut FieldBindings<'a>);
}

/// A struct whose fields map onto result columns. Implement it with [`crate::impl_record!`].
pub trait Record: Default {
    /// Register every mapped field under `prefix`.
    fn bind_fields<'a>(&'a mut self, prefix: &str, bindings: &mut FieldBindings<'a>);
}

impl<T: ScanTarget + Default> Bindable for Option<T> {
    fn bind<'a>(&'a mut self, column: String, bindings: &mut FieldBindings<'a>) {
        bindings.bind_leaf(column, self);
    }
}

crate::impl_leaf!(
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    bool,
    String,
    Vec<u8>,
    NaiveDateTime,
    JsonValue,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Audit {
        created_by: String,
        version: i64,
    }
    crate::impl_record!(Audit { created_by => "CreatedBy", version });

    #[derive(Debug, Default)]
    struct Geo {
        lat: f64,
        lng: f64,
    }
    crate::impl_record!(Geo { lat, lng });

    #[derive(Debug, Default)]
    struct Address {
        street: String,
        geo: Geo,
    }
    crate::impl_record!(Address { street, geo => "pos" });

    #[derive(Debug, Default)]
    #[allow(non_snake_case)]
    struct Customer {
        ID: i64,
        Name: String,
        home: Address,
        audit: Audit,
        secret: String,
    }
    crate::impl_record!(Customer { ID, Name => "full_name", home => "addr", ..audit });

    #[test]
    fn resolution_rule_covers_tags_defaults_nesting_and_embedding() {
        let mut customer = Customer::default();
        let bindings = FieldBindings::for_record(&mut customer);
        assert_eq!(
            bindings.columns(),
            vec![
                "CreatedBy",
                "addr_pos_lat",
                "addr_pos_lng",
                "addr_street",
                "full_name",
                "id",
                "version",
            ]
        );
        assert!(!bindings.contains("secret"));
    }

    #[test]
    fn resolution_is_a_pure_function_of_shape() {
        let mut first = Customer::default();
        let mut second = Customer {
            ID: 9,
            ..Customer::default()
        };
        let a = FieldBindings::for_record(&mut first).columns();
        let b = FieldBindings::for_record(&mut second).columns();
        assert_eq!(a, b);
    }

    #[test]
    fn taken_binding_writes_through_to_the_record() {
        let mut geo = Geo::default();
        {
            let mut bindings = FieldBindings::for_record(&mut geo);
            let lat = bindings.take("lat").unwrap();
            lat.scan(&crate::types::RowValues::Float(51.5)).unwrap();
            assert!(bindings.take("lat").is_none());
        }
        assert!((geo.lat - 51.5).abs() < f64::EPSILON);
        assert!(geo.lng.abs() < f64::EPSILON);
    }

    #[derive(Debug, Default)]
    #[allow(non_snake_case)]
    struct Blank {
        Code: String,
        Origin: Geo,
    }
    crate::impl_record!(Blank { Code => "", Origin => "" });

    #[test]
    fn empty_tag_falls_back_to_the_field_name() {
        let mut blank = Blank::default();
        let bindings = FieldBindings::for_record(&mut blank);
        assert_eq!(bindings.columns(), vec!["code", "origin_lat", "origin_lng"]);
    }

    #[test]
    fn column_name_composes_prefixes() {
        assert_eq!(column_name("", "lat"), "lat");
        assert_eq!(column_name(&column_name("addr", "pos"), "lat"), "addr_pos_lat");
    }
}
