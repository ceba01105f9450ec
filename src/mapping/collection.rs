//! Registered class maps, looked up by record type or its ancestors

use super::class_map::ClassMap;
use super::reflect::{type_info, Mappable, TypeInfo, Upcast};
use crate::error::CsvResult;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// A user-defined class map for one record type
///
/// ```
/// use csvmap::error::CsvResult;
/// use csvmap::mapping::{ClassMap, Mappable, RecordMap, TypeDescriptor};
///
/// #[derive(Default)]
/// struct Person {
///     id: i32,
/// }
///
/// impl Mappable for Person {
///     fn describe(d: &mut TypeDescriptor<Self>) {
///         d.default_constructor();
///         d.field("Id", |p| &p.id, |p, v| p.id = v);
///     }
/// }
///
/// struct PersonMap;
///
/// impl RecordMap for PersonMap {
///     type Target = Person;
///
///     fn build() -> CsvResult<ClassMap> {
///         let mut map = ClassMap::new::<Person>();
///         map.map("Id")?.name("Identifier");
///         Ok(map)
///     }
/// }
/// ```
pub trait RecordMap {
    type Target: Mappable;

    fn build() -> CsvResult<ClassMap>;
}

/// Map found for a record type
#[derive(Clone)]
pub struct ResolvedMap {
    pub map: Arc<ClassMap>,
    /// View of the requested type as the map's record type
    pub upcast: Upcast,
}

/// Class maps keyed by record type
#[derive(Clone, Default)]
pub struct ClassMapCollection {
    maps: HashMap<TypeId, Arc<ClassMap>>,
}

impl ClassMapCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `map` for its record type, replacing any previous map
    pub fn add(&mut self, mut map: ClassMap) -> Arc<ClassMap> {
        map.reindex(0);
        let map = Arc::new(map);
        log::debug!("registered class map for {}", map.type_name());
        self.maps.insert(map.record_type(), map.clone());
        map
    }

    pub fn remove(&mut self, record_type: TypeId) -> Option<Arc<ClassMap>> {
        self.maps.remove(&record_type)
    }

    pub fn remove_for<T: Mappable>(&mut self) -> Option<Arc<ClassMap>> {
        self.remove(TypeId::of::<T>())
    }

    /// Map registered for exactly this type
    pub fn get(&self, record_type: TypeId) -> Option<Arc<ClassMap>> {
        self.maps.get(&record_type).cloned()
    }

    /// Map registered for `info`'s type or, failing that, for its nearest
    /// ancestor
    pub fn find(&self, info: &TypeInfo) -> Option<ResolvedMap> {
        info.lineage().into_iter().find_map(|ancestor| {
            self.maps.get(&ancestor.id).map(|map| ResolvedMap {
                map: map.clone(),
                upcast: ancestor.upcast,
            })
        })
    }

    pub fn find_for<T: Mappable>(&self) -> Option<ResolvedMap> {
        self.find(&type_info::<T>())
    }

    pub fn contains(&self, record_type: TypeId) -> bool {
        self.maps.contains_key(&record_type)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn clear(&mut self) {
        self.maps.clear();
    }
}
