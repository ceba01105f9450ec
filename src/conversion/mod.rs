//! Field type conversion
//!
//! This module contains the dynamic value model, the converter options and
//! their merge rules, the built-in converters and the type-keyed registry.

#[macro_use]
pub mod macros;
pub mod converter;
pub mod number;
pub mod options;
pub mod registry;
pub mod value;

pub use converter::{converter_fn, BuiltinConverter, FieldContext, FnConverter, TypeConverter};
pub use options::{DateTimeStyles, NumberStyles, TypeConverterOptions, TypeConverterOptionsCache};
pub use registry::TypeConverterRegistry;
pub use value::{EnumInfo, FieldValue, FloatKind, IntKind, Value, ValueKind};
