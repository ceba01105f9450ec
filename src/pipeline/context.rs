//! Per-session configuration state shared by readers and writers

use crate::config::CsvConfiguration;
use crate::conversion::{
    FieldContext, TypeConverterOptions, TypeConverterOptionsCache, TypeConverterRegistry, Value,
    ValueKind,
};
use crate::error::{CsvError, CsvResult, FieldPosition};
use crate::mapping::{
    type_info, ClassMap, ClassMapCollection, FieldAccessor, Mappable, MemberMapData, RecordMap,
    ResolvedMap, TypeInfo, Upcast,
};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Target of a single field conversion
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldTarget<'a> {
    pub kind: &'a ValueKind,
    pub type_id: TypeId,
    pub inner_type: Option<TypeId>,
}

impl<'a> FieldTarget<'a> {
    pub fn of(accessor: &'a FieldAccessor) -> Self {
        Self {
            kind: &accessor.kind,
            type_id: accessor.value_type,
            inner_type: accessor.inner_type,
        }
    }

    /// One element of a collection member
    pub fn element(accessor: &'a FieldAccessor) -> Self {
        let kind = match &accessor.kind {
            ValueKind::Collection(element) => element.as_ref(),
            other => other,
        };
        Self {
            kind,
            type_id: accessor.inner_type.unwrap_or(accessor.value_type),
            inner_type: None,
        }
    }
}

/// Class maps, converters and options of one reader or writer session
#[derive(Clone)]
pub struct CsvContext {
    configuration: CsvConfiguration,
    maps: ClassMapCollection,
    converters: TypeConverterRegistry,
    options: TypeConverterOptionsCache,
    type_infos: HashMap<TypeId, TypeInfo>,
}

impl fmt::Debug for CsvContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvContext")
            .field("configuration", &self.configuration)
            .field("class_maps", &self.maps.len())
            .field("converters", &self.converters)
            .field("options", &self.options.len())
            .finish()
    }
}

impl CsvContext {
    /// Create a context, rejecting inconsistent configurations
    pub fn new(configuration: CsvConfiguration) -> CsvResult<Self> {
        configuration.validate().map_err(CsvError::configuration)?;
        Ok(Self {
            configuration,
            maps: ClassMapCollection::new(),
            converters: TypeConverterRegistry::new(),
            options: TypeConverterOptionsCache::new(),
            type_infos: HashMap::new(),
        })
    }

    pub fn configuration(&self) -> &CsvConfiguration {
        &self.configuration
    }

    /// Build and register the class map defined by `M`
    pub fn register_class_map<M: RecordMap>(&mut self) -> CsvResult<Arc<ClassMap>> {
        let map = M::build()?;
        if map.record_type() != TypeId::of::<M::Target>() {
            return Err(CsvError::configuration(format!(
                "class map for {} was built for {}",
                std::any::type_name::<M::Target>(),
                map.type_name()
            )));
        }
        Ok(self.maps.add(map))
    }

    pub fn register_class_map_instance(&mut self, map: ClassMap) -> Arc<ClassMap> {
        self.maps.add(map)
    }

    pub fn unregister_class_map<T: Mappable>(&mut self) -> Option<Arc<ClassMap>> {
        self.maps.remove_for::<T>()
    }

    pub fn class_maps(&self) -> &ClassMapCollection {
        &self.maps
    }

    /// Options registered per converted type
    pub fn type_converter_options(&mut self) -> &mut TypeConverterOptionsCache {
        &mut self.options
    }

    /// Converters registered per converted type
    pub fn type_converters(&mut self) -> &mut TypeConverterRegistry {
        &mut self.converters
    }

    /// Description of `T`, compiled once per session
    pub fn type_info<T: Mappable>(&mut self) -> TypeInfo {
        self.type_infos
            .entry(TypeId::of::<T>())
            .or_insert_with(type_info::<T>)
            .clone()
    }

    /// Class map for `T`: the one registered for `T` or its nearest
    /// ancestor, else an automatic map that is registered for later use
    pub fn resolve_map<T: Mappable>(&mut self) -> ResolvedMap {
        let info = self.type_info::<T>();
        if let Some(found) = self.maps.find(&info) {
            if found.map.record_type() != info.id {
                log::trace!("using class map of {} for {}", found.map.type_name(), info.name);
            }
            return found;
        }

        log::debug!("no class map registered for {}, mapping automatically", info.name);
        let mut map = ClassMap::from_info(info);
        map.auto_map();
        ResolvedMap {
            map: self.maps.add(map),
            upcast: Upcast::identity(),
        }
    }

    /// Options built from the session culture
    pub fn global_options(&self) -> TypeConverterOptions {
        TypeConverterOptions::new().with_culture(self.configuration.culture.clone())
    }

    /// Effective options for a field: global, then the options registered
    /// for the declared type (or the type an `Option` wraps), then the
    /// member's own overrides
    pub fn options_for(
        &self,
        type_id: TypeId,
        inner_type: Option<TypeId>,
        member: Option<&TypeConverterOptions>,
    ) -> TypeConverterOptions {
        let mut options = self.global_options();
        let registered = self
            .options
            .get_by_id(type_id)
            .or_else(|| inner_type.and_then(|id| self.options.get_by_id(id)));
        if let Some(registered) = registered {
            options.merge_from(registered);
        }
        if let Some(member) = member {
            options.merge_from(member);
        }
        options
    }

    pub(crate) fn convert_from_text(
        &self,
        text: &str,
        target: FieldTarget<'_>,
        member: Option<&MemberMapData>,
        position: FieldPosition,
    ) -> CsvResult<Value> {
        let options = self.options_for(
            target.type_id,
            target.inner_type,
            member.map(|m| &m.type_converter_options),
        );
        let field = FieldContext::new(target.kind, target.type_id, &options, position)
            .with_inner_type(target.inner_type);
        let converter = member.and_then(|m| m.type_converter.as_deref());
        self.converters.convert_from_string(text, &field, converter)
    }

    pub(crate) fn convert_to_text(
        &self,
        value: &Value,
        target: FieldTarget<'_>,
        member: Option<&MemberMapData>,
        position: FieldPosition,
    ) -> CsvResult<String> {
        let options = self.options_for(
            target.type_id,
            target.inner_type,
            member.map(|m| &m.type_converter_options),
        );
        let field = FieldContext::new(target.kind, target.type_id, &options, position)
            .with_inner_type(target.inner_type);
        let converter = member.and_then(|m| m.type_converter.as_deref());
        self.converters.convert_to_string(value, &field, converter)
    }
}
