//! Unit tests for class maps, auto mapping and hierarchy lookup

use assert_matches::assert_matches;
use csvmap::error::{CsvError, CsvResult};
use csvmap::mapping::{type_info, ClassMap, ClassMapCollection, RecordMap};
use std::any::TypeId;

#[path = "../common/mod.rs"]
mod common;

use common::{Animal, Dog, Puppy, Series, A, B, C};

fn headers(map: &ClassMap) -> Vec<String> {
    map.header_columns().into_iter().map(|(_, name)| name).collect()
}

struct AnimalMap;

impl RecordMap for AnimalMap {
    type Target = Animal;

    fn build() -> CsvResult<ClassMap> {
        let mut map = ClassMap::new::<Animal>();
        map.map("Name")?.name("AnimalName");
        map.map("Legs")?;
        Ok(map)
    }
}

struct DogMap;

impl RecordMap for DogMap {
    type Target = Dog;

    fn build() -> CsvResult<ClassMap> {
        let mut map = ClassMap::auto::<Dog>();
        map.map("Name")?.name("DogName");
        Ok(map)
    }
}

#[cfg(test)]
mod auto_map_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_members_expand_inline() {
        let mut map = ClassMap::auto::<A>();
        map.reindex(0);
        assert_eq!(headers(&map), vec!["AId", "BId", "CId"]);
        assert_eq!(map.column_count(), 3);
    }

    #[test]
    fn test_inherited_members_come_first() {
        let mut map = ClassMap::auto::<Puppy>();
        map.reindex(0);
        assert_eq!(headers(&map), vec!["Name", "Legs", "Breed", "AgeWeeks"]);
    }

    #[test]
    fn test_auto_map_keeps_explicit_bindings() {
        let mut map = ClassMap::new::<A>();
        map.map("B.BId").unwrap().name("Inner");
        map.auto_map();
        map.reindex(0);
        assert_eq!(headers(&map), vec!["AId", "Inner", "CId"]);
    }

    #[test]
    fn test_collection_header() {
        let mut map = ClassMap::auto::<Series>();
        map.reindex(0);
        assert_eq!(headers(&map), vec!["Label", "Points"]);
        assert!(map.member_map("Points").unwrap().is_collection());

        map.map("Points").unwrap().index_range(1, 3);
        assert_eq!(headers(&map), vec!["Label", "Points", "Points", "Points"]);
    }
}

#[cfg(test)]
mod member_map_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_member_options() {
        let mut map = ClassMap::new::<Animal>();
        map.map("Legs")
            .unwrap()
            .names(["Legs", "LegCount"])
            .default_value(4u8)
            .optional();

        let data = map.member_map("Legs").unwrap().data();
        assert_eq!(data.names, vec!["Legs", "LegCount"]);
        assert!(data.is_name_set);
        assert!(data.optional);
        assert!(data.default.is_some());
        assert!(!data.is_index_set);
    }

    #[test]
    fn test_nested_paths_through_references() {
        let mut map = ClassMap::new::<A>();
        map.map("B.C.CId").unwrap().index(7);
        assert_eq!(map.reference_maps().len(), 1);
        assert_eq!(map.member_map("B.C.CId").unwrap().data().index, 7);
        assert!(map.member_map("B.BId").is_none());
    }

    #[test]
    fn test_invalid_paths() {
        let mut map = ClassMap::new::<A>();
        assert_matches!(map.map("Nope"), Err(CsvError::Configuration { .. }));
        assert_matches!(map.map("B"), Err(CsvError::Configuration { .. }));
        assert_matches!(map.map("AId.Value"), Err(CsvError::Configuration { .. }));
        assert_matches!(map.map(""), Err(CsvError::Configuration { .. }));
    }

    #[test]
    fn test_references_checks_target_type() {
        let mut map = ClassMap::new::<A>();
        assert!(map.references("B", ClassMap::auto::<C>()).is_err());

        let mut inner = ClassMap::new::<B>();
        inner.map("BId").unwrap().name("B_Id");
        map.references("B", inner).unwrap();
        assert_eq!(
            map.member_map("B.BId").unwrap().header_name(),
            "B_Id"
        );
    }

    #[test]
    fn test_ignored_member_has_no_column() {
        let mut map = ClassMap::auto::<Animal>();
        map.map("Legs").unwrap().ignore(true);
        map.reindex(0);
        assert_eq!(headers(&map), vec!["Name"]);
        assert_eq!(map.column_count(), 1);
    }
}

#[cfg(test)]
mod collection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn register<M: RecordMap>(maps: &mut ClassMapCollection) {
        maps.add(M::build().unwrap());
    }

    #[test]
    fn test_derived_map_wins_regardless_of_order() {
        let mut base_first = ClassMapCollection::new();
        register::<AnimalMap>(&mut base_first);
        register::<DogMap>(&mut base_first);

        let mut derived_first = ClassMapCollection::new();
        register::<DogMap>(&mut derived_first);
        register::<AnimalMap>(&mut derived_first);

        for maps in [&base_first, &derived_first] {
            let dog = maps.find_for::<Dog>().unwrap();
            assert_eq!(dog.map.record_type(), TypeId::of::<Dog>());

            let puppy = maps.find_for::<Puppy>().unwrap();
            assert_eq!(puppy.map.record_type(), TypeId::of::<Dog>());

            let animal = maps.find_for::<Animal>().unwrap();
            assert_eq!(animal.map.record_type(), TypeId::of::<Animal>());
        }
    }

    #[test]
    fn test_ancestor_map_applies_to_descendant() {
        let mut maps = ClassMapCollection::new();
        register::<AnimalMap>(&mut maps);

        let resolved = maps.find(&type_info::<Puppy>()).unwrap();
        assert_eq!(resolved.map.record_type(), TypeId::of::<Animal>());

        let puppy = Puppy {
            dog: Dog {
                animal: Animal {
                    name: "Rex".into(),
                    legs: 4,
                },
                breed: "Beagle".into(),
            },
            age_weeks: 9,
        };
        let viewed = resolved.upcast.apply(&puppy).unwrap();
        assert_eq!(viewed.downcast_ref::<Animal>().unwrap().name, "Rex");
    }

    #[test]
    fn test_unrelated_type_has_no_map() {
        let mut maps = ClassMapCollection::new();
        register::<DogMap>(&mut maps);
        assert!(maps.find_for::<Animal>().is_none());
        assert!(maps.find_for::<A>().is_none());
    }

    #[test]
    fn test_add_reindexes_and_replaces() {
        let mut maps = ClassMapCollection::new();
        let first = maps.add(ClassMap::auto::<Animal>());
        assert_eq!(first.member_map("Legs").unwrap().data().index, 1);

        maps.add(AnimalMap::build().unwrap());
        assert_eq!(maps.len(), 1);
        let current = maps.get(TypeId::of::<Animal>()).unwrap();
        assert_eq!(current.member_map("Name").unwrap().header_name(), "AnimalName");

        assert!(maps.remove_for::<Animal>().is_some());
        assert!(maps.is_empty());
    }
}
