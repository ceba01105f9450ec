//! Delimited text reader and writer with declarative record mapping
//!
//! Records are tokenized from any `std::io::Read`, and each field is
//! converted to and from typed members of user record types through class
//! maps. Types describe their members once by implementing
//! [`mapping::Mappable`]; maps are derived automatically or configured by
//! hand, and are looked up along the type's declared ancestors.
//!
//! ```
//! use csvmap::{CsvConfiguration, CsvReader, Mappable, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Person {
//!     id: i32,
//!     name: String,
//! }
//!
//! impl Mappable for Person {
//!     fn describe(d: &mut TypeDescriptor<Self>) {
//!         d.default_constructor();
//!         d.field("Id", |p| &p.id, |p, v| p.id = v);
//!         d.field("Name", |p| &p.name, |p, v| p.name = v);
//!     }
//! }
//!
//! let input = "Id,Name\r\n1,Ada\r\n2,Grace\r\n";
//! let mut reader = CsvReader::new(input.as_bytes(), CsvConfiguration::default()).unwrap();
//! let people: Vec<Person> = reader
//!     .read_all_records::<Person>()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(people[1].name, "Grace");
//! ```

pub mod cli;
pub mod config;
pub mod conversion;
pub mod error;
pub mod formatter;
pub mod mapping;
pub mod parser;
pub mod pipeline;
pub mod validation;

// Re-export commonly used types
pub use config::{CsvConfiguration, Culture, NewLine, QuoteStrategy};
pub use conversion::{
    converter_fn, DateTimeStyles, FieldValue, NumberStyles, TypeConverter, TypeConverterOptions,
    Value, ValueKind,
};
pub use error::{CsvError, CsvResult, FieldPosition};
pub use mapping::{ClassMap, Mappable, RecordMap, TypeDescriptor};
pub use pipeline::{CsvContext, CsvReader, CsvWriter, SessionState};

/// Read every record of `input` as `T` with the default configuration
pub fn read_all<T: Mappable>(input: &str) -> CsvResult<Vec<T>> {
    let mut reader = CsvReader::new(input.as_bytes(), CsvConfiguration::default())?;
    let records: CsvResult<Vec<T>> = reader.read_all_records::<T>().collect();
    records
}

/// Write `records` with a header using the default configuration
pub fn write_all<T: Mappable>(records: &[T]) -> CsvResult<String> {
    let mut writer = CsvWriter::new(Vec::new(), CsvConfiguration::default())?;
    writer.write_records(records)?;
    let bytes = writer.into_inner()?;
    String::from_utf8(bytes).map_err(|e| CsvError::Other(e.into()))
}
