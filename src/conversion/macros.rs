//! Helper macros for implementing `FieldValue` on user types

/// Implement `FieldValue` for a field-less enum, converting by variant name
/// or ordinal.
///
/// ```
/// use csvmap::enum_field_value;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Status { Active, Suspended }
///
/// enum_field_value!(Status { Active, Suspended });
/// ```
#[macro_export]
macro_rules! enum_field_value {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::conversion::FieldValue for $ty {
            fn kind() -> $crate::conversion::ValueKind {
                $crate::conversion::ValueKind::Enum($crate::conversion::EnumInfo {
                    name: stringify!($ty),
                    variants: &[$(stringify!($variant)),+],
                })
            }

            fn to_value(&self) -> $crate::conversion::Value {
                match self {
                    $($ty::$variant => {
                        $crate::conversion::Value::Text(stringify!($variant).to_string())
                    })+
                }
            }

            fn from_value(value: $crate::conversion::Value) -> Result<Self, String> {
                let by_name = |name: &str| match name {
                    $(stringify!($variant) => Some($ty::$variant),)+
                    _ => None,
                };
                let by_ordinal = |ordinal: u64| {
                    let names: &[&str] = &[$(stringify!($variant)),+];
                    usize::try_from(ordinal)
                        .ok()
                        .and_then(|i| names.get(i))
                        .and_then(|name| by_name(name))
                        .ok_or_else(|| format!("{} has no variant {}", stringify!($ty), ordinal))
                };
                match value {
                    $crate::conversion::Value::Text(name) => by_name(&name).ok_or_else(|| {
                        format!("'{}' is not a variant of {}", name, stringify!($ty))
                    }),
                    $crate::conversion::Value::UInt(ordinal) => by_ordinal(ordinal),
                    $crate::conversion::Value::Int(ordinal) if ordinal >= 0 => {
                        by_ordinal(ordinal as u64)
                    }
                    other => Err(format!("expected {}, found {:?}", stringify!($ty), other)),
                }
            }
        }
    };
}

/// Implement `FieldValue` for a `Clone + Default + Send + Sync` type
/// converted by a registered `TypeConverter`. A null field reads as the
/// type's default.
#[macro_export]
macro_rules! custom_field_value {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::conversion::FieldValue for $ty {
            fn kind() -> $crate::conversion::ValueKind {
                $crate::conversion::ValueKind::Custom {
                    type_id: ::std::any::TypeId::of::<$ty>(),
                    type_name: stringify!($ty),
                }
            }

            fn to_value(&self) -> $crate::conversion::Value {
                $crate::conversion::Value::custom(self.clone())
            }

            fn from_value(value: $crate::conversion::Value) -> Result<Self, String> {
                if value.is_null() {
                    return Ok(<$ty as ::std::default::Default>::default());
                }
                value
                    .downcast_ref::<$ty>()
                    .cloned()
                    .ok_or_else(|| format!("expected {}, found {:?}", stringify!($ty), value))
            }
        }
    )+};
}
