//! Member bindings: how one scalar member maps to one or more columns

use super::reflect::FieldAccessor;
use crate::conversion::{FieldValue, TypeConverter, TypeConverterOptions, Value};
use std::fmt;
use std::sync::Arc;

pub type FieldValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Binding configuration for one member
#[derive(Clone)]
pub struct MemberMapData {
    /// Declared member name
    pub member: &'static str,
    pub accessor: FieldAccessor,
    /// Header names, matched first-found
    pub names: Vec<String>,
    /// Occurrence of a duplicated header name to use
    pub name_index: usize,
    pub is_name_set: bool,
    pub index: usize,
    /// Last column of an index range; `None` or less than `index` means all
    /// remaining columns
    pub index_end: Option<usize>,
    pub is_index_set: bool,
    pub default: Option<Value>,
    pub constant: Option<Value>,
    pub ignore: bool,
    pub optional: bool,
    pub type_converter: Option<Arc<dyn TypeConverter>>,
    pub type_converter_options: TypeConverterOptions,
    pub validate: Option<FieldValidator>,
}

/// Builder for a member binding, obtained from `ClassMap::map`
#[derive(Clone)]
pub struct MemberMap {
    data: MemberMapData,
}

impl fmt::Debug for MemberMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberMap")
            .field("member", &self.data.member)
            .field("names", &self.data.names)
            .field("index", &self.data.index)
            .field("index_end", &self.data.index_end)
            .field("ignore", &self.data.ignore)
            .field("optional", &self.data.optional)
            .finish()
    }
}

impl MemberMap {
    pub(crate) fn new(member: &'static str, accessor: FieldAccessor) -> Self {
        Self {
            data: MemberMapData {
                member,
                accessor,
                names: vec![member.to_string()],
                name_index: 0,
                is_name_set: false,
                index: 0,
                index_end: None,
                is_index_set: false,
                default: None,
                constant: None,
                ignore: false,
                optional: false,
                type_converter: None,
                type_converter_options: TypeConverterOptions::default(),
                validate: None,
            },
        }
    }

    pub fn data(&self) -> &MemberMapData {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut MemberMapData {
        &mut self.data
    }

    /// Header name of the column
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.names([name])
    }

    /// Alternative header names; the first one present in the header is used
    pub fn names<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data.names = names.into_iter().map(Into::into).collect();
        self.data.is_name_set = true;
        self
    }

    /// Use the n-th (0-based) occurrence of a header name that appears more
    /// than once
    pub fn name_index(&mut self, index: usize) -> &mut Self {
        self.data.name_index = index;
        self
    }

    /// Column index of the field
    pub fn index(&mut self, index: usize) -> &mut Self {
        self.data.index = index;
        self.data.index_end = None;
        self.data.is_index_set = true;
        self
    }

    /// Column range `[start, end]` read into a collection member
    pub fn index_range(&mut self, start: usize, end: usize) -> &mut Self {
        self.data.index = start;
        self.data.index_end = Some(end);
        self.data.is_index_set = true;
        self
    }

    /// Value used when the field is absent or empty
    pub fn default_value<T: FieldValue>(&mut self, value: T) -> &mut Self {
        self.data.default = Some(value.to_value());
        self
    }

    /// Value always read into the member and written to the column
    pub fn constant<T: FieldValue>(&mut self, value: T) -> &mut Self {
        self.data.constant = Some(value.to_value());
        self
    }

    /// A missing column is skipped instead of failing the record
    pub fn optional(&mut self) -> &mut Self {
        self.data.optional = true;
        self
    }

    /// Leave the member out of reading and writing
    pub fn ignore(&mut self, ignore: bool) -> &mut Self {
        self.data.ignore = ignore;
        self
    }

    /// Converter used for this member instead of the registry
    pub fn type_converter(&mut self, converter: impl TypeConverter + 'static) -> &mut Self {
        self.data.type_converter = Some(Arc::new(converter));
        self
    }

    /// Options overriding the per-type and global options for this member
    pub fn type_converter_options(&mut self, options: TypeConverterOptions) -> &mut Self {
        self.data.type_converter_options.merge_from(&options);
        self
    }

    /// Predicate over the raw field text, checked before conversion
    pub fn validate<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.data.validate = Some(Arc::new(predicate));
        self
    }

    /// Header name used when writing
    pub fn header_name(&self) -> &str {
        self.data
            .names
            .first()
            .map(String::as_str)
            .unwrap_or(self.data.member)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self.data.accessor.kind,
            crate::conversion::ValueKind::Collection(_)
        )
    }
}
