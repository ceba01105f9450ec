//! Dynamic field values and the kinds they convert to

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc,
};
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Dynamic value exchanged between converters and record members
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Duration(TimeDelta),
    List(Vec<Value>),
    /// Value of a type with no built-in kind
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Wrap a value of a user type
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Value::Custom(Arc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the wrapped user type, if this is one
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Custom(inner) => (**inner).downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn variant_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "date time",
            Value::DateTimeOffset(_) => "date time with offset",
            Value::Duration(_) => "duration",
            Value::List(_) => "list",
            Value::Custom(_) => "custom value",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Int(a), Value::UInt(b)) | (Value::UInt(b), Value::Int(a)) => {
                *a >= 0 && *a as u64 == *b
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::UInt(v) => write!(f, "UInt({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Char(v) => write!(f, "Char({:?})", v),
            Value::Text(v) => write!(f, "Text({:?})", v),
            Value::Date(v) => write!(f, "Date({})", v),
            Value::Time(v) => write!(f, "Time({})", v),
            Value::DateTime(v) => write!(f, "DateTime({})", v),
            Value::DateTimeOffset(v) => write!(f, "DateTimeOffset({})", v),
            Value::Duration(v) => write!(f, "Duration({})", v),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Width and signedness of an integer member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    ISize,
    U8,
    U16,
    U32,
    U64,
    USize,
}

impl IntKind {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64 | IntKind::ISize
        )
    }

    /// Inclusive value range
    pub fn bounds(self) -> (i128, i128) {
        match self {
            IntKind::I8 => (i8::MIN as i128, i8::MAX as i128),
            IntKind::I16 => (i16::MIN as i128, i16::MAX as i128),
            IntKind::I32 => (i32::MIN as i128, i32::MAX as i128),
            IntKind::I64 => (i64::MIN as i128, i64::MAX as i128),
            IntKind::ISize => (isize::MIN as i128, isize::MAX as i128),
            IntKind::U8 => (0, u8::MAX as i128),
            IntKind::U16 => (0, u16::MAX as i128),
            IntKind::U32 => (0, u32::MAX as i128),
            IntKind::U64 => (0, u64::MAX as i128),
            IntKind::USize => (0, usize::MAX as i128),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::ISize => "isize",
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::U64 => "u64",
            IntKind::USize => "usize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    F32,
    F64,
}

/// Variant names of a field-less enum, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumInfo {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

/// Built-in kinds a field converts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Integer(IntKind),
    Float(FloatKind),
    Char,
    Text,
    Date,
    Time,
    DateTime,
    DateTimeOffset,
    Duration,
    Enum(EnumInfo),
    Nullable(Box<ValueKind>),
    Collection(Box<ValueKind>),
    Custom {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl ValueKind {
    /// Value used for blank fields when null is treated as default
    pub fn zero_value(&self) -> Value {
        match self {
            ValueKind::Boolean => Value::Bool(false),
            ValueKind::Integer(kind) if kind.is_signed() => Value::Int(0),
            ValueKind::Integer(_) => Value::UInt(0),
            ValueKind::Float(_) => Value::Float(0.0),
            ValueKind::Char => Value::Char('\0'),
            ValueKind::Text => Value::Text(String::new()),
            ValueKind::Date => Value::Date(NaiveDate::default()),
            ValueKind::Time => Value::Time(NaiveTime::MIN),
            ValueKind::DateTime => Value::DateTime(NaiveDateTime::default()),
            ValueKind::DateTimeOffset => Value::DateTimeOffset(DateTime::from_naive_utc_and_offset(
                NaiveDateTime::default(),
                Utc.fix(),
            )),
            ValueKind::Duration => Value::Duration(TimeDelta::zero()),
            ValueKind::Enum(info) => info
                .variants
                .first()
                .map(|v| Value::Text(v.to_string()))
                .unwrap_or(Value::Null),
            ValueKind::Collection(_) => Value::List(Vec::new()),
            ValueKind::Nullable(_) | ValueKind::Custom { .. } => Value::Null,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueKind::Nullable(_))
    }

    /// Whether a null token converts to this kind's zero value without
    /// `treat_null_as_default`. A custom zero is `Null`, which the type's
    /// `FieldValue` turns into its default.
    pub fn accepts_null_token(&self) -> bool {
        matches!(self, ValueKind::Nullable(_) | ValueKind::Custom { .. })
    }

    /// Kind with any nullable wrapper removed
    pub fn underlying(&self) -> &ValueKind {
        match self {
            ValueKind::Nullable(inner) => inner.underlying(),
            other => other,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            ValueKind::Boolean => "bool".to_string(),
            ValueKind::Integer(kind) => kind.name().to_string(),
            ValueKind::Float(FloatKind::F32) => "f32".to_string(),
            ValueKind::Float(FloatKind::F64) => "f64".to_string(),
            ValueKind::Char => "char".to_string(),
            ValueKind::Text => "String".to_string(),
            ValueKind::Date => "NaiveDate".to_string(),
            ValueKind::Time => "NaiveTime".to_string(),
            ValueKind::DateTime => "NaiveDateTime".to_string(),
            ValueKind::DateTimeOffset => "DateTime".to_string(),
            ValueKind::Duration => "TimeDelta".to_string(),
            ValueKind::Enum(info) => info.name.to_string(),
            ValueKind::Nullable(inner) => format!("Option<{}>", inner.type_name()),
            ValueKind::Collection(inner) => format!("Vec<{}>", inner.type_name()),
            ValueKind::Custom { type_name, .. } => type_name.to_string(),
        }
    }
}

/// A type that can live in a mapped field
pub trait FieldValue: Sized + 'static {
    fn kind() -> ValueKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, String>;

    /// Element or wrapped type for `Option<T>` and `Vec<T>`
    fn inner_type_id() -> Option<TypeId> {
        None
    }
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T, String> {
    Err(format!("expected {}, found {}", expected, value.variant_name()))
}

macro_rules! signed_field_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::Integer(IntKind::$kind)
            }

            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn from_value(value: Value) -> Result<Self, String> {
                match value {
                    Value::Int(v) => <$ty>::try_from(v).map_err(|e| e.to_string()),
                    Value::UInt(v) => <$ty>::try_from(v).map_err(|e| e.to_string()),
                    other => mismatch(stringify!($ty), &other),
                }
            }
        }
    )*};
}

macro_rules! unsigned_field_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::Integer(IntKind::$kind)
            }

            fn to_value(&self) -> Value {
                Value::UInt(*self as u64)
            }

            fn from_value(value: Value) -> Result<Self, String> {
                match value {
                    Value::UInt(v) => <$ty>::try_from(v).map_err(|e| e.to_string()),
                    Value::Int(v) => <$ty>::try_from(v).map_err(|e| e.to_string()),
                    other => mismatch(stringify!($ty), &other),
                }
            }
        }
    )*};
}

signed_field_value!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => ISize);
unsigned_field_value!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => USize);

impl FieldValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Float(FloatKind::F64)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::UInt(v) => Ok(v as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl FieldValue for f32 {
    fn kind() -> ValueKind {
        ValueKind::Float(FloatKind::F32)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FieldValue for bool {
    fn kind() -> ValueKind {
        ValueKind::Boolean
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(v),
            other => mismatch("bool", &other),
        }
    }
}

impl FieldValue for char {
    fn kind() -> ValueKind {
        ValueKind::Char
    }

    fn to_value(&self) -> Value {
        Value::Char(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Char(v) => Ok(v),
            other => mismatch("char", &other),
        }
    }
}

impl FieldValue for String {
    fn kind() -> ValueKind {
        ValueKind::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(v) => Ok(v),
            Value::Char(c) => Ok(c.to_string()),
            other => mismatch("text", &other),
        }
    }
}

macro_rules! chrono_field_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::$variant
            }

            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }

            fn from_value(value: Value) -> Result<Self, String> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => mismatch(stringify!($ty), &other),
                }
            }
        }
    )*};
}

chrono_field_value!(
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    TimeDelta => Duration,
);

impl FieldValue for DateTime<Utc> {
    fn kind() -> ValueKind {
        ValueKind::DateTimeOffset
    }

    fn to_value(&self) -> Value {
        Value::DateTimeOffset(self.with_timezone(&Utc.fix()))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::DateTimeOffset(v) => Ok(v.with_timezone(&Utc)),
            Value::DateTime(v) => Ok(DateTime::from_naive_utc_and_offset(v, Utc)),
            other => mismatch("DateTime<Utc>", &other),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> ValueKind {
        ValueKind::Nullable(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn inner_type_id() -> Option<TypeId> {
        Some(TypeId::of::<T>())
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> ValueKind {
        ValueKind::Collection(Box::new(T::kind()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            other => mismatch("list", &other),
        }
    }

    fn inner_type_id() -> Option<TypeId> {
        Some(TypeId::of::<T>())
    }
}
