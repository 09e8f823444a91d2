/// Implement [`Record`](crate::Record) and [`Bindable`](crate::Bindable) for a struct.
///
/// List the fields that take part in mapping; unlisted fields keep their `Default`
/// value. Each entry is one of:
///
/// * `field` maps to the lower-cased field name.
/// * `field => "tag"` maps to `tag` exactly as written. An empty tag counts as no tag.
/// * `..field` embeds another record: its columns join this namespace unprefixed.
///
/// Whether an entry is a leaf column or a nested record is decided by the field's
/// type. A nested record's columns are named `<name>_<inner>` where `<name>` is the
/// tag or lower-cased field name.
///
/// ```rust
/// use sql_mapper::impl_record;
///
/// #[derive(Debug, Default)]
/// struct Address {
///     street: String,
/// }
/// impl_record!(Address { street });
///
/// #[derive(Debug, Default)]
/// struct User {
///     id: i64,
///     name: String,
///     address: Address,
/// }
/// impl_record!(User { id => "user_id", name, address });
/// // columns: user_id, name, address_street
/// ```
#[macro_export]
macro_rules! impl_record {
    ($ty:ty { $($fields:tt)* }) => {
        impl $crate::mapper::Record for $ty {
            #[allow(unused_variables)]
            fn bind_fields<'a>(
                &'a mut self,
                prefix: &str,
                bindings: &mut $crate::mapper::FieldBindings<'a>,
            ) {
                $crate::__record_fields!(self, prefix, bindings; $($fields)*);
            }
        }

        impl $crate::mapper::Bindable for $ty {
            fn bind<'a>(
                &'a mut self,
                column: ::std::string::String,
                bindings: &mut $crate::mapper::FieldBindings<'a>,
            ) {
                $crate::mapper::Record::bind_fields(self, &column, bindings);
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_fields {
    ($this:ident, $prefix:ident, $bindings:ident;) => {};

    ($this:ident, $prefix:ident, $bindings:ident; .. $field:ident $(, $($rest:tt)*)?) => {
        $crate::mapper::Record::bind_fields(&mut $this.$field, $prefix, $bindings);
        $crate::__record_fields!($this, $prefix, $bindings; $($($rest)*)?);
    };

    ($this:ident, $prefix:ident, $bindings:ident; $field:ident => $tag:literal $(, $($rest:tt)*)?) => {
        let tag: &str = $tag;
        let name = if tag.is_empty() {
            stringify!($field).to_lowercase()
        } else {
            tag.to_owned()
        };
        $crate::mapper::Bindable::bind(
            &mut $this.$field,
            $crate::mapper::column_name($prefix, &name),
            $bindings,
        );
        $crate::__record_fields!($this, $prefix, $bindings; $($($rest)*)?);
    };

    ($this:ident, $prefix:ident, $bindings:ident; $field:ident $(, $($rest:tt)*)?) => {
        $crate::mapper::Bindable::bind(
            &mut $this.$field,
            $crate::mapper::column_name($prefix, &stringify!($field).to_lowercase()),
            $bindings,
        );
        $crate::__record_fields!($this, $prefix, $bindings; $($($rest)*)?);
    };
}

/// Implement [`Bindable`](crate::Bindable) for types that scan as a single column.
///
/// The type must already implement [`ScanTarget`](crate::ScanTarget).
#[macro_export]
macro_rules! impl_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::mapper::Bindable for $ty {
                fn bind<'a>(
                    &'a mut self,
                    column: ::std::string::String,
                    bindings: &mut $crate::mapper::FieldBindings<'a>,
                ) {
                    bindings.bind_leaf(column, self);
                }
            }
        )*
    };
}
