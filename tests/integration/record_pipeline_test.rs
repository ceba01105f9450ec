//! Integration tests for reading and writing mapped records

use assert_matches::assert_matches;
use csvmap::config::{CsvConfiguration, Culture};
use csvmap::conversion::{converter_fn, NumberStyles, TypeConverterOptions, Value};
use csvmap::error::{CsvError, CsvResult};
use csvmap::mapping::{ClassMap, Mappable, RecordMap, TypeDescriptor};
use csvmap::pipeline::{CsvReader, CsvWriter};
use csvmap::SessionState;
use std::io::Cursor;

#[path = "../common/mod.rs"]
mod common;

use common::{input, Account, Animal, Dog, Money, Person, Puppy, Series, Status, A, B, C};

fn reader(text: &str) -> CsvReader<Cursor<Vec<u8>>> {
    CsvReader::new(input(text), CsvConfiguration::default()).unwrap()
}

fn reader_with(text: &str, config: CsvConfiguration) -> CsvReader<Cursor<Vec<u8>>> {
    CsvReader::new(input(text), config).unwrap()
}

fn written(writer: CsvWriter<Vec<u8>>) -> String {
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

fn register_money(context: &mut csvmap::CsvContext) {
    context.type_converters().add::<Money>(converter_fn(
        |text| {
            let cents = text.replace('.', "").parse::<i64>().map_err(|e| e.to_string())?;
            Ok(Value::custom(Money(cents)))
        },
        |value| {
            value
                .downcast_ref::<Money>()
                .map(|m| format!("{}.{:02}", m.0 / 100, m.0 % 100))
                .ok_or_else(|| "not money".to_string())
        },
    ));
}

fn graphs() -> Vec<A> {
    vec![
        A { a_id: 1, b: None },
        A {
            a_id: 2,
            b: Some(B {
                b_id: 3,
                c: C::default(),
            }),
        },
    ]
}

struct AnimalMap;

impl RecordMap for AnimalMap {
    type Target = Animal;

    fn build() -> CsvResult<ClassMap> {
        let mut map = ClassMap::auto::<Animal>();
        map.map("Name")?.name("AnimalName");
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
mod read_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_field_reports_row_and_index() {
        let mut reader = reader("Id,Name\r\na,b\r\n");
        assert!(reader.read().unwrap());
        match reader.get_field(2) {
            Err(CsvError::MissingField { position }) => {
                assert_eq!(position.row, 2);
                assert_eq!(position.index, Some(2));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_read_records_by_header_name() {
        let mut reader = reader("Name,Id\r\nAda,1\r\nGrace,2\r\n");
        let people: Vec<Person> = reader
            .read_all_records::<Person>()
            .collect::<CsvResult<_>>()
            .unwrap();
        assert_eq!(
            people,
            vec![
                Person {
                    id: 1,
                    name: "Ada".into()
                },
                Person {
                    id: 2,
                    name: "Grace".into()
                },
            ]
        );
        assert_eq!(reader.state(), SessionState::Exhausted);
    }

    #[test]
    fn test_read_without_header_uses_indexes() {
        let config = CsvConfiguration::default().with_header_record(false);
        let mut reader = reader_with("7,Linus\r\n", config);
        let person = reader.read_record::<Person>().unwrap().unwrap();
        assert_eq!(person.id, 7);
        assert_eq!(person.name, "Linus");
        assert!(reader.header().is_none());
    }

    #[test]
    fn test_header_case_setting() {
        let text = "id,NAME\r\n1,x\r\n";
        assert_matches!(
            reader(text).read_record::<Person>(),
            Err(CsvError::MissingField { .. })
        );

        let config = CsvConfiguration::default().with_ignore_header_case(true);
        let person = reader_with(text, config).read_record::<Person>().unwrap().unwrap();
        assert_eq!(person.name, "x");
    }

    #[test]
    fn test_thousands_separator_from_registered_options() {
        let mut reader = reader("Id,Name\r\n\"1,234\",x\r\n");
        reader
            .context_mut()
            .type_converter_options()
            .add::<i32>(TypeConverterOptions::new().with_number_style(NumberStyles::NUMBER));
        let person = reader.read_record::<Person>().unwrap().unwrap();
        assert_eq!(person.id, 1234);
    }

    #[test]
    fn test_conversion_error_names_the_field() {
        let mut reader = reader("Id,Name\r\n1,a\r\nbad,b\r\n");
        assert!(reader.read_record::<Person>().unwrap().is_some());
        match reader.read_record::<Person>() {
            Err(CsvError::Conversion {
                text, position, ..
            }) => {
                assert_eq!(text, "bad");
                assert_eq!(position.row, 3);
                assert_eq!(position.index, Some(0));
                assert_eq!(position.name.as_deref(), Some("Id"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_absent_nested_reference_stays_none() {
        let mut reader = reader("AId,BId,CId\r\n1,,\r\n2,3,0\r\n");
        let records: Vec<A> = reader
            .read_all_records::<A>()
            .collect::<CsvResult<_>>()
            .unwrap();
        assert_eq!(records, graphs());
    }

    #[test]
    fn test_raw_records_and_header() {
        let mut reader = reader("a,b\r\n1,2\r\n");
        assert!(reader.read_header().unwrap());
        assert_eq!(reader.state(), SessionState::Ready);
        assert_eq!(reader.header().unwrap(), ["a", "b"]);
        assert_eq!(reader.read_raw_record().unwrap().unwrap(), vec!["1", "2"]);
        assert_eq!(reader.get_field_by_name("b").unwrap(), "2");
        assert_eq!(reader.get_field_as::<u16>(0).unwrap(), 1);
        assert!(reader.read_raw_record().unwrap().is_none());
        assert_matches!(reader.read_header(), Err(CsvError::InvalidState { .. }));
    }

    #[test]
    fn test_ragged_rows_policy() {
        let text = "a,b\r\n1\r\n1,2,3\r\n";
        assert_matches!(reader(text).read(), Err(CsvError::MalformedInput { .. }));

        let config = CsvConfiguration::default().with_ragged_rows(true);
        let mut reader = reader_with(text, config);
        assert_eq!(reader.read_raw_record().unwrap().unwrap().len(), 1);
        assert_eq!(reader.read_raw_record().unwrap().unwrap().len(), 3);
    }

    #[test]
    fn test_custom_types_and_enums() {
        let mut reader = reader(
            "Number,Status,Balance,Overdraft,Opened,Active\r\n\
             7,Suspended,10.50,,2024-03-01,true\r\n",
        );
        register_money(reader.context_mut());
        let account = reader.read_record::<Account>().unwrap().unwrap();
        assert_eq!(
            account,
            Account {
                number: 7,
                status: Status::Suspended,
                balance: Money(1050),
                overdraft: None,
                opened: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
                active: true,
            }
        );
    }

    #[test]
    fn test_null_token_on_custom_value_reads_default() {
        let text = "Number,Status,Balance,Overdraft,Opened,Active\r\n\
                    1,Active,NULL,,,true\r\n";
        let mut accounts = reader(text);
        register_money(accounts.context_mut());
        accounts
            .context_mut()
            .type_converter_options()
            .add::<Money>(TypeConverterOptions::new().with_null_values(["NULL"]));

        let account = accounts.read_record::<Account>().unwrap().unwrap();
        assert_eq!(account.balance, Money::default());
        assert!(account.active);

        let mut accounts = reader(text);
        register_money(accounts.context_mut());
        accounts.context_mut().type_converter_options().add::<Money>(
            TypeConverterOptions::new()
                .with_null_values(["NULL"])
                .with_treat_null_as_default(true),
        );
        let account = accounts.read_record::<Account>().unwrap().unwrap();
        assert_eq!(account.balance, Money(0));
    }

    #[test]
    fn test_missing_constructor_is_configuration_error() {
        #[derive(Debug)]
        struct Bare {
            id: i32,
        }

        impl Mappable for Bare {
            fn describe(d: &mut TypeDescriptor<Self>) {
                d.field("Id", |b| &b.id, |b, v| b.id = v);
            }
        }

        let mut reader = reader("Id\r\n1\r\n");
        assert_matches!(
            reader.read_record::<Bare>(),
            Err(CsvError::Configuration { .. })
        );
    }
}

#[cfg(test)]
mod member_option_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct CheckedAnimalMap;

    impl RecordMap for CheckedAnimalMap {
        type Target = Animal;

        fn build() -> CsvResult<ClassMap> {
            let mut map = ClassMap::new::<Animal>();
            map.map("Name")?.validate(|text| !text.trim().is_empty());
            map.map("Legs")?.default_value(4u8);
            Ok(map)
        }
    }

    fn checked_reader(text: &str) -> CsvReader<Cursor<Vec<u8>>> {
        let mut reader = reader(text);
        reader
            .context_mut()
            .register_class_map::<CheckedAnimalMap>()
            .unwrap();
        reader
    }

    #[test]
    fn test_default_for_missing_column() {
        let animal = checked_reader("Name\r\nRex\r\n")
            .read_record::<Animal>()
            .unwrap()
            .unwrap();
        assert_eq!(animal.legs, 4);
    }

    #[test]
    fn test_default_for_empty_field() {
        let animal = checked_reader("Name,Legs\r\nRex,\r\n")
            .read_record::<Animal>()
            .unwrap()
            .unwrap();
        assert_eq!(animal.legs, 4);
    }

    #[test]
    fn test_validation_failure() {
        let result = checked_reader("Name,Legs\r\n ,2\r\n").read_record::<Animal>();
        match result {
            Err(CsvError::FieldValidation { text, position }) => {
                assert_eq!(text, " ");
                assert_eq!(position.index, Some(0));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_optional_member_is_skipped() {
        let mut map = ClassMap::new::<Animal>();
        map.map("Name").unwrap();
        map.map("Legs").unwrap().optional();

        let mut reader = reader("Name\r\nEel\r\n");
        reader.context_mut().register_class_map_instance(map);
        let animal = reader.read_record::<Animal>().unwrap().unwrap();
        assert_eq!(animal.name, "Eel");
        assert_eq!(animal.legs, 0);
    }

    #[test]
    fn test_alternative_names() {
        let mut map = ClassMap::new::<Animal>();
        map.map("Name").unwrap().names(["Name", "Species"]);
        map.map("Legs").unwrap();

        let mut reader = reader("Species,Legs\r\nAnt,6\r\n");
        reader.context_mut().register_class_map_instance(map);
        assert_eq!(reader.read_record::<Animal>().unwrap().unwrap().name, "Ant");
    }

    #[test]
    fn test_constant_member() {
        let mut map = ClassMap::auto::<Animal>();
        map.map("Legs").unwrap().constant(8u8);

        let mut reader = reader("Name,Legs\r\nSpider,2\r\n");
        reader.context_mut().register_class_map_instance(map.clone());
        assert_eq!(reader.read_record::<Animal>().unwrap().unwrap().legs, 8);

        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        writer.context_mut().register_class_map_instance(map);
        writer
            .write_records(&[Animal {
                name: "Spider".into(),
                legs: 2,
            }])
            .unwrap();
        assert_eq!(written(writer), "Name,Legs\r\nSpider,8\r\n");
    }

    #[test]
    fn test_options_precedence() {
        struct Reading {
            first: f64,
            second: f64,
            third: f64,
        }

        impl Mappable for Reading {
            fn describe(d: &mut TypeDescriptor<Self>) {
                d.constructor(|| Reading {
                    first: 0.0,
                    second: 0.0,
                    third: 0.0,
                });
                d.field("First", |r| &r.first, |r, v| r.first = v);
                d.field("Second", |r| &r.second, |r, v| r.second = v);
                d.field("Third", |r| &r.third, |r, v| r.third = v);
            }
        }

        let config = CsvConfiguration::default()
            .with_delimiter(';')
            .with_culture(Culture::de_de());

        let mut map = ClassMap::auto::<Reading>();
        map.map("Third")
            .unwrap()
            .type_converter_options(TypeConverterOptions::new().with_culture(Culture::de_de()));

        let mut reader = reader_with("First;Second;Third\r\n1.5;2.5;3,5\r\n", config.clone());
        reader.context_mut().register_class_map_instance(map.clone());
        reader
            .context_mut()
            .type_converter_options()
            .add::<f64>(TypeConverterOptions::new().with_culture(Culture::invariant()));
        let reading = reader.read_record::<Reading>().unwrap().unwrap();
        assert_eq!(reading.first, 1.5);
        assert_eq!(reading.second, 2.5);
        assert_eq!(reading.third, 3.5);

        let mut reader = reader_with("First;Second;Third\r\n1,5;2,5;3,5\r\n", config);
        reader.context_mut().register_class_map_instance(map);
        let reading = reader.read_record::<Reading>().unwrap().unwrap();
        assert_eq!(reading.first, 1.5);
        assert_eq!(reading.second, 2.5);
        assert_eq!(reading.third, 3.5);
    }

    #[test]
    fn test_member_converter() {
        let mut map = ClassMap::auto::<Person>();
        map.map("Name").unwrap().type_converter(converter_fn(
            |text| Ok(Value::Text(text.to_uppercase())),
            |value| Ok(value.as_text().unwrap_or_default().to_lowercase()),
        ));

        let mut reader = reader("Id,Name\r\n1,ada\r\n");
        reader.context_mut().register_class_map_instance(map.clone());
        let person = reader.read_record::<Person>().unwrap().unwrap();
        assert_eq!(person.name, "ADA");

        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        writer.context_mut().register_class_map_instance(map);
        writer.write_records(&[person]).unwrap();
        assert_eq!(written(writer), "Id,Name\r\n1,ada\r\n");
    }
}

#[cfg(test)]
mod collection_member_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collection_by_repeated_header() {
        let mut reader = reader("Label,Points,Points,Points\r\nx,1,2,3\r\n");
        let series = reader.read_record::<Series>().unwrap().unwrap();
        assert_eq!(series.points, vec![1, 2, 3]);
    }

    #[test]
    fn test_collection_by_index_range() {
        let mut map = ClassMap::auto::<Series>();
        map.map("Points").unwrap().index_range(1, 2);

        let config = CsvConfiguration::default().with_header_record(false);
        let mut reader = reader_with("x,1,2,3\r\n", config);
        reader.context_mut().register_class_map_instance(map);
        assert_eq!(reader.read_record::<Series>().unwrap().unwrap().points, vec![1, 2]);
    }

    #[test]
    fn test_open_range_takes_remaining_columns() {
        let mut map = ClassMap::auto::<Series>();
        map.map("Points").unwrap().index_range(1, 0);

        let config = CsvConfiguration::default()
            .with_header_record(false)
            .with_ragged_rows(true);
        let mut reader = reader_with("x,1,2,3,4\r\ny,5\r\n", config);
        reader.context_mut().register_class_map_instance(map);
        let all: Vec<Series> = reader
            .read_all_records::<Series>()
            .collect::<CsvResult<_>>()
            .unwrap();
        assert_eq!(all[0].points, vec![1, 2, 3, 4]);
        assert_eq!(all[1].points, vec![5]);
    }

    #[test]
    fn test_collection_written_one_column_per_element() {
        let config = CsvConfiguration::default().with_header_record(false);
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        writer
            .write_record(&Series {
                label: "x".into(),
                points: vec![4, 5, 6],
            })
            .unwrap();
        assert_eq!(written(writer), "x,4,5,6\r\n");
    }
}

#[cfg(test)]
mod hierarchy_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dog_reader(text: &str, derived_first: bool) -> CsvReader<Cursor<Vec<u8>>> {
        let mut reader = reader(text);
        let context = reader.context_mut();
        if derived_first {
            context.register_class_map::<DogMap>().unwrap();
            context.register_class_map::<AnimalMap>().unwrap();
        } else {
            context.register_class_map::<AnimalMap>().unwrap();
            context.register_class_map::<DogMap>().unwrap();
        }
        reader
    }

    #[test]
    fn test_derived_map_used_regardless_of_registration_order() {
        let text = "DogName,Legs,Breed\r\nRex,4,Beagle\r\n";
        for derived_first in [false, true] {
            let dog = dog_reader(text, derived_first)
                .read_record::<Dog>()
                .unwrap()
                .unwrap();
            assert_eq!(dog.animal.name, "Rex");
            assert_eq!(dog.breed, "Beagle");
        }
    }

    #[test]
    fn test_nearest_ancestor_map_for_unmapped_type() {
        let text = "DogName,Legs,Breed\r\nFido,3,Mutt\r\n";
        for derived_first in [false, true] {
            let puppy = dog_reader(text, derived_first)
                .read_record::<Puppy>()
                .unwrap()
                .unwrap();
            assert_eq!(puppy.dog.animal.name, "Fido");
            assert_eq!(puppy.dog.animal.legs, 3);
            assert_eq!(puppy.age_weeks, 0);
        }
    }

    #[test]
    fn test_base_map_still_applies_to_base() {
        let animal = dog_reader("AnimalName,Legs\r\nCat,4\r\n", false)
            .read_record::<Animal>()
            .unwrap()
            .unwrap();
        assert_eq!(animal.name, "Cat");
    }
}

#[cfg(test)]
mod write_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absent_reference_written_as_empty_fields() {
        let config = CsvConfiguration::default().with_new_object_for_null_references(false);
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        writer.write_records(&graphs()).unwrap();
        assert_eq!(written(writer), "AId,BId,CId\r\n1,,\r\n2,3,0\r\n");
    }

    #[test]
    fn test_absent_reference_written_from_new_object() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        writer.write_records(&graphs()).unwrap();
        assert_eq!(written(writer), "AId,BId,CId\r\n1,0,0\r\n2,3,0\r\n");
    }

    #[test]
    fn test_empty_policy_ignores_nested_defaults() {
        let mut map = ClassMap::auto::<A>();
        map.map("B.C.CId").unwrap().default_value(9);

        let config = CsvConfiguration::default().with_new_object_for_null_references(false);
        let mut writer = CsvWriter::new(Vec::new(), config).unwrap();
        writer.context_mut().register_class_map_instance(map);
        writer.write_records(&graphs()[..1]).unwrap();
        assert_eq!(written(writer), "AId,BId,CId\r\n1,,\r\n");
    }

    #[test]
    fn test_failed_record_leaves_no_partial_row() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        let result = writer.write_records(&[Account::default()]);
        assert_matches!(result, Err(CsvError::Conversion { .. }));
        assert_eq!(
            written(writer),
            "Number,Status,Balance,Overdraft,Opened,Active\r\n"
        );
    }

    #[test]
    fn test_custom_types_written_with_registered_converter() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        register_money(writer.context_mut());
        writer
            .write_record(&Account {
                number: 7,
                status: Status::Closed,
                balance: Money(250),
                overdraft: Some(12.5),
                opened: None,
                active: false,
            })
            .unwrap();
        assert_eq!(written(writer), "7,Closed,2.50,12.5,,false\r\n");
    }

    #[test]
    fn test_manual_fields_and_records() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        writer.write_header::<Person>().unwrap();
        writer.write_field("9").unwrap();
        writer.write_field_value(&"Nine, Inc".to_string()).unwrap();
        writer.next_record().unwrap();
        writer
            .write_record(&Person {
                id: 10,
                name: "Ten".into(),
            })
            .unwrap();
        assert_eq!(writer.row(), 3);
        assert_eq!(written(writer), "Id,Name\r\n9,\"Nine, Inc\"\r\n10,Ten\r\n");
    }

    #[test]
    fn test_header_only_once() {
        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        writer.write_header::<Person>().unwrap();
        assert_matches!(
            writer.write_header::<Person>(),
            Err(CsvError::InvalidState { .. })
        );
        writer.write_records(&[Person::default()]).unwrap();
        assert_eq!(written(writer), "Id,Name\r\n0,\r\n");
    }
}
