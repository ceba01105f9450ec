//! Round-trip tests: what the writer emits, the reader reads back unchanged

use csvmap::config::{CsvConfiguration, NewLine, QuoteStrategy};
use csvmap::conversion::Value;
use csvmap::error::CsvResult;
use csvmap::pipeline::{CsvReader, CsvWriter};

#[path = "../common/mod.rs"]
mod common;

use common::{input, Account, Money, Person, Reading, Series, Status, A, B, C};

fn write_with<T: csvmap::Mappable>(records: &[T], config: &CsvConfiguration) -> String {
    let mut writer = CsvWriter::new(Vec::new(), config.clone()).unwrap();
    writer.write_records(records).unwrap();
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

fn read_with<T: csvmap::Mappable>(text: &str, config: &CsvConfiguration) -> Vec<T> {
    let mut reader = CsvReader::new(input(text), config.clone()).unwrap();
    reader
        .read_all_records::<T>()
        .collect::<CsvResult<_>>()
        .unwrap()
}

fn raw_round_trip(fields: &[&str], config: &CsvConfiguration) -> Vec<String> {
    let config = config.clone().with_header_record(false);
    let mut writer = CsvWriter::new(Vec::new(), config.clone()).unwrap();
    for field in fields {
        writer.write_field(field).unwrap();
    }
    writer.next_record().unwrap();
    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

    let mut reader = CsvReader::new(input(&text), config).unwrap();
    reader.read_raw_record().unwrap().unwrap()
}

#[cfg(test)]
mod record_round_trip_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_people_survive_awkward_text() {
        let people = vec![
            Person {
                id: 1,
                name: "Smith, John".into(),
            },
            Person {
                id: -2,
                name: "The \"Boss\"".into(),
            },
            Person {
                id: 3,
                name: "two\r\nlines".into(),
            },
            Person {
                id: 4,
                name: String::new(),
            },
        ];
        let config = CsvConfiguration::default();
        let text = write_with(&people, &config);
        assert_eq!(read_with::<Person>(&text, &config), people);
    }

    #[test]
    fn test_nested_graphs() {
        let graphs = vec![
            A {
                a_id: 1,
                b: Some(B {
                    b_id: 2,
                    c: C { c_id: 3 },
                }),
            },
            A { a_id: 4, b: None },
        ];
        let config = CsvConfiguration::default().with_new_object_for_null_references(false);
        let text = write_with(&graphs, &config);
        assert_eq!(read_with::<A>(&text, &config), graphs);
    }

    #[test]
    fn test_accounts_with_registered_converter() {
        let accounts = vec![
            Account {
                number: 10,
                status: Status::Active,
                balance: Money(100),
                overdraft: Some(-0.25),
                opened: chrono::NaiveDate::from_ymd_opt(2020, 12, 31),
                active: true,
            },
            Account {
                number: 11,
                status: Status::Closed,
                balance: Money(0),
                overdraft: None,
                opened: None,
                active: false,
            },
        ];
        let money = || {
            csvmap::converter_fn(
                |text| {
                    text.parse::<i64>()
                        .map(|cents| Value::custom(Money(cents)))
                        .map_err(|e| e.to_string())
                },
                |value| {
                    value
                        .downcast_ref::<Money>()
                        .map(|m| m.0.to_string())
                        .ok_or_else(|| "not money".to_string())
                },
            )
        };

        let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default()).unwrap();
        writer.context_mut().type_converters().add::<Money>(money());
        writer.write_records(&accounts).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let mut reader = CsvReader::new(input(&text), CsvConfiguration::default()).unwrap();
        reader.context_mut().type_converters().add::<Money>(money());
        let read: Vec<Account> = reader
            .read_all_records::<Account>()
            .collect::<CsvResult<_>>()
            .unwrap();
        assert_eq!(read, accounts);
    }

    #[test]
    fn test_collections_without_header() {
        let series = vec![
            Series {
                label: "a".into(),
                points: vec![1, 2, 3],
            },
            Series {
                label: "b".into(),
                points: vec![4, 5, 6],
            },
        ];
        let config = CsvConfiguration::default().with_header_record(false);
        let text = write_with(&series, &config);
        assert_eq!(read_with::<Series>(&text, &config), series);
    }

    #[test]
    fn test_collections_with_header() {
        let series = vec![
            Series {
                label: "a".into(),
                points: vec![1, 2, 3],
            },
            Series {
                label: "b".into(),
                points: vec![4, 5, 6],
            },
        ];
        let config = CsvConfiguration::default();
        let text = write_with(&series, &config);
        assert_eq!(text, "Label,Points,Points,Points\r\na,1,2,3\r\nb,4,5,6\r\n");
        assert_eq!(read_with::<Series>(&text, &config), series);
        let text = csvmap::write_all(&series).unwrap();
        assert_eq!(csvmap::read_all::<Series>(&text).unwrap(), series);
    }

    #[test]
    fn test_collection_between_members() {
        let readings = vec![
            Reading {
                id: 1,
                samples: vec![0.5, 1.25],
                note: "first".into(),
            },
            Reading {
                id: 2,
                samples: vec![-3.0, 4.5],
                note: "second, with comma".into(),
            },
        ];
        let config = CsvConfiguration::default();
        let text = write_with(&readings, &config);
        assert_eq!(
            text,
            "Id,Samples,Samples,Note\r\n1,0.5,1.25,first\r\n2,-3,4.5,\"second, with comma\"\r\n"
        );
        assert_eq!(read_with::<Reading>(&text, &config), readings);
    }

    #[test]
    fn test_semicolon_dialect() {
        let people = vec![Person {
            id: 5,
            name: "a;b".into(),
        }];
        let config = CsvConfiguration::semicolon_european().with_new_line(NewLine::Lf);
        let text = write_with(&people, &config);
        assert_eq!(text, "Id;Name\n5;\"a;b\"\n");
        assert_eq!(read_with::<Person>(&text, &config), people);
    }
}

#[cfg(test)]
mod quoting_idempotence_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const AWKWARD: &[&str] = &[
        "",
        "plain",
        ",",
        ",,",
        "\"",
        "\"\"",
        "a\"b",
        "\"leading",
        "trailing\"",
        "\n",
        "\r",
        "\r\n",
        "line\nbreak",
        " padded ",
        "mixed, \"all\"\r\nof it",
    ];

    #[test]
    fn test_smart_quoting_reads_back() {
        let config = CsvConfiguration::default();
        assert_eq!(raw_round_trip(AWKWARD, &config), AWKWARD);
    }

    #[test]
    fn test_always_quoting_reads_back() {
        let config = CsvConfiguration::default().with_quote_strategy(QuoteStrategy::Always);
        assert_eq!(raw_round_trip(AWKWARD, &config), AWKWARD);
    }

    #[test]
    fn test_each_field_alone() {
        let config = CsvConfiguration::default();
        for field in AWKWARD {
            assert_eq!(raw_round_trip(&[*field], &config), vec![field.to_string()]);
        }
    }

    #[test]
    fn test_alternate_dialect_reads_back() {
        let config = CsvConfiguration::tab_separated().with_quote('\'');
        let fields = ["it's", "tab\there", "comma,kept", "'", ""];
        assert_eq!(raw_round_trip(&fields, &config), fields);
    }
}
