//! Type-keyed converter registry and field conversion dispatch

use super::converter::{BuiltinConverter, FieldContext, TypeConverter};
use super::value::{Value, ValueKind};
use crate::error::CsvResult;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Converters registered for exact types
#[derive(Clone, Default)]
pub struct TypeConverterRegistry {
    converters: HashMap<TypeId, Arc<dyn TypeConverter>>,
    builtin: BuiltinConverter,
}

impl fmt::Debug for TypeConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConverterRegistry")
            .field("registered", &self.converters.len())
            .finish()
    }
}

impl TypeConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` for values of type `T`
    pub fn add<T: Any>(&mut self, converter: impl TypeConverter + 'static) {
        self.add_shared::<T>(Arc::new(converter));
    }

    pub fn add_shared<T: Any>(&mut self, converter: Arc<dyn TypeConverter>) {
        log::debug!("registering type converter for {}", std::any::type_name::<T>());
        self.converters.insert(TypeId::of::<T>(), converter);
    }

    pub fn remove<T: Any>(&mut self) -> Option<Arc<dyn TypeConverter>> {
        self.converters.remove(&TypeId::of::<T>())
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    pub fn get_by_id(&self, type_id: TypeId) -> Option<&Arc<dyn TypeConverter>> {
        self.converters.get(&type_id)
    }

    /// Converter registered for the field's declared type, else for the
    /// type wrapped by `Option`
    fn registered(&self, field: &FieldContext<'_>) -> Option<&dyn TypeConverter> {
        self.get_by_id(field.type_id)
            .or_else(|| field.inner_type_id.and_then(|id| self.get_by_id(id)))
            .or_else(|| match field.kind.underlying() {
                ValueKind::Custom { type_id, .. } => self.get_by_id(*type_id),
                _ => None,
            })
            .map(|converter| converter.as_ref())
    }

    /// Convert field text to a value.
    ///
    /// Null tokens produce the kind's zero value for nullable and custom
    /// targets, or for any target when null is treated as default. Then the
    /// member converter, a registered converter and the built-in converter
    /// are tried in that order.
    pub fn convert_from_string(
        &self,
        text: &str,
        field: &FieldContext<'_>,
        member: Option<&dyn TypeConverter>,
    ) -> CsvResult<Value> {
        let options = field.options;
        let treat_as_default = options.treat_null_as_default.unwrap_or(false);
        if options.is_null_token(text) && (field.kind.accepts_null_token() || treat_as_default) {
            return Ok(field.kind.zero_value());
        }
        if matches!(field.kind, ValueKind::Nullable(_)) && text.trim().is_empty() {
            return Ok(Value::Null);
        }

        match member.or_else(|| self.registered(field)) {
            Some(converter) => converter.convert_from_string(text, field),
            None => self.builtin.convert_from_string(text, field),
        }
    }

    /// Convert a value to field text; null always writes as empty
    pub fn convert_to_string(
        &self,
        value: &Value,
        field: &FieldContext<'_>,
        member: Option<&dyn TypeConverter>,
    ) -> CsvResult<String> {
        if value.is_null() {
            return Ok(String::new());
        }
        match member.or_else(|| self.registered(field)) {
            Some(converter) => converter.convert_to_string(value, field),
            None => self.builtin.convert_to_string(value, field),
        }
    }
}
