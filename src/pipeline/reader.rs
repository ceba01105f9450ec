//! Reading records into mapped types

use super::context::{CsvContext, FieldTarget};
use super::header::HeaderIndex;
use super::SessionState;
use crate::config::CsvConfiguration;
use crate::conversion::{FieldValue, Value};
use crate::error::{CsvError, CsvResult, FieldPosition};
use crate::mapping::{ClassMap, Mappable, MemberMap, MemberMapData, ReferenceMap};
use crate::parser::CsvParser;
use std::any::{Any, TypeId};
use std::io::Read;
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Reader session over a character source
pub struct CsvReader<R: Read> {
    parser: CsvParser<R>,
    context: CsvContext,
    state: SessionState,
    header: Option<HeaderIndex>,
    record: Option<Vec<String>>,
    expected_width: Option<usize>,
}

impl<R: Read> CsvReader<R> {
    pub fn new(reader: R, configuration: CsvConfiguration) -> CsvResult<Self> {
        Ok(Self::with_context(reader, CsvContext::new(configuration)?))
    }

    /// Reader sharing class maps and converters already set up in `context`
    pub fn with_context(reader: R, context: CsvContext) -> Self {
        Self {
            parser: CsvParser::new(reader, context.configuration()),
            context,
            state: SessionState::Unstarted,
            header: None,
            record: None,
            expected_width: None,
        }
    }

    pub fn context(&self) -> &CsvContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CsvContext {
        &mut self.context
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Logical records consumed, header included
    pub fn row(&self) -> usize {
        self.parser.row()
    }

    /// Physical lines consumed
    pub fn raw_row(&self) -> usize {
        self.parser.raw_row()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_ref().map(HeaderIndex::names)
    }

    /// Fields of the current record
    pub fn current_record(&self) -> Option<&[String]> {
        self.record.as_deref()
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            log::trace!("reader {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn position(&self) -> FieldPosition {
        FieldPosition::new(self.parser.row(), self.parser.raw_row())
    }

    fn ensure_open(&self, operation: &str) -> CsvResult<()> {
        if self.state == SessionState::Closed {
            return Err(CsvError::invalid_state(operation, self.state));
        }
        Ok(())
    }

    fn require_record(&self, operation: &str) -> CsvResult<&[String]> {
        self.ensure_open(operation)?;
        self.record
            .as_deref()
            .ok_or_else(|| CsvError::invalid_state(operation, self.state))
    }

    /// Consume the next record as the header. Returns `false` when the
    /// input is empty.
    pub fn read_header(&mut self) -> CsvResult<bool> {
        match self.state {
            SessionState::Unstarted | SessionState::HeaderPending => {}
            state => return Err(CsvError::invalid_state("read the header", state)),
        }
        self.transition(SessionState::HeaderPending);

        match self.parser.next_record()? {
            None => {
                self.transition(SessionState::Exhausted);
                Ok(false)
            }
            Some(names) => {
                log::debug!("header has {} columns: {:?}", names.len(), names);
                self.expected_width = Some(names.len());
                self.header = Some(HeaderIndex::new(
                    names,
                    self.context.configuration().ignore_header_case,
                ));
                self.transition(SessionState::Ready);
                Ok(true)
            }
        }
    }

    /// Advance to the next data record, reading the header first when one
    /// is expected. Returns `false` at end of input.
    pub fn read(&mut self) -> CsvResult<bool> {
        match self.state {
            SessionState::Closed => return Err(CsvError::invalid_state("read", self.state)),
            SessionState::Exhausted => return Ok(false),
            SessionState::Unstarted | SessionState::HeaderPending
                if self.context.configuration().has_header_record =>
            {
                if !self.read_header()? {
                    return Ok(false);
                }
            }
            _ => {}
        }

        self.record = None;
        match self.parser.next_record()? {
            None => {
                self.transition(SessionState::Exhausted);
                Ok(false)
            }
            Some(fields) => {
                self.check_width(&fields)?;
                self.record = Some(fields);
                self.transition(SessionState::Reading);
                Ok(true)
            }
        }
    }

    fn check_width(&mut self, fields: &[String]) -> CsvResult<()> {
        if self.context.configuration().allow_ragged_rows {
            return Ok(());
        }
        // a kept blank line is a single empty field
        if fields.len() == 1 && fields[0].is_empty() {
            return Ok(());
        }
        match self.expected_width {
            None => {
                self.expected_width = Some(fields.len());
                Ok(())
            }
            Some(expected) if expected == fields.len() => Ok(()),
            Some(expected) => Err(CsvError::malformed(
                self.parser.row(),
                self.parser.raw_row(),
                format!("expected {} fields but found {}", expected, fields.len()),
            )),
        }
    }

    /// Advance and return the new record's raw fields
    pub fn read_raw_record(&mut self) -> CsvResult<Option<Vec<String>>> {
        if self.read()? {
            Ok(self.record.clone())
        } else {
            Ok(None)
        }
    }

    /// Raw text of a field of the current record
    pub fn get_field(&self, index: usize) -> CsvResult<&str> {
        let record = self.require_record("get a field")?;
        record
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CsvError::missing_field(self.position().with_index(index)))
    }

    /// Raw text of the first column called `name`
    pub fn get_field_by_name(&self, name: &str) -> CsvResult<&str> {
        let record = self.require_record("get a field")?;
        let header = self.header.as_ref().ok_or_else(|| {
            CsvError::configuration("fields can only be looked up by name after a header record")
        })?;
        header
            .find(name, 0)
            .and_then(|index| record.get(index))
            .map(String::as_str)
            .ok_or_else(|| CsvError::missing_field(self.position().with_name(name)))
    }

    /// Field of the current record converted to `T`
    pub fn get_field_as<T: FieldValue>(&self, index: usize) -> CsvResult<T> {
        let text = self.get_field(index)?;
        let kind = T::kind();
        let target = FieldTarget {
            kind: &kind,
            type_id: TypeId::of::<T>(),
            inner_type: T::inner_type_id(),
        };
        let position = self.position().with_index(index);
        let value = self
            .context
            .convert_from_text(text, target, None, position.clone())?;
        T::from_value(value)
            .map_err(|reason| CsvError::conversion(text, kind.type_name(), position, reason))
    }

    /// Current record converted to `T` through its class map
    pub fn get_record<T: Mappable>(&mut self) -> CsvResult<T> {
        self.ensure_open("get a record")?;
        let resolved = self.context.resolve_map::<T>();
        let info = self.context.type_info::<T>();
        let record = self.require_record("get a record")?;

        let mut instance = info.construct().ok_or_else(|| {
            CsvError::configuration(format!("{} has no constructor", info.name))
        })?;
        let target = resolved.upcast.apply_mut(instance.as_mut()).ok_or_else(|| {
            CsvError::configuration(format!(
                "{} cannot be viewed as {}",
                info.name,
                resolved.map.type_name()
            ))
        })?;

        let scope = ReadScope {
            context: &self.context,
            header: self.header.as_ref(),
            record,
            position: self.position(),
        };
        scope.populate(&resolved.map, target)?;

        instance
            .downcast::<T>()
            .map(|record| *record)
            .map_err(|_| {
                CsvError::configuration(format!("constructor of {} built another type", info.name))
            })
    }

    /// Advance and convert the new record
    pub fn read_record<T: Mappable>(&mut self) -> CsvResult<Option<T>> {
        if self.read()? {
            self.get_record().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Lazily read every remaining record. The iterator ends after the
    /// first error.
    pub fn read_all_records<T: Mappable>(&mut self) -> Records<'_, R, T> {
        Records {
            reader: self,
            done: false,
            _marker: PhantomData,
        }
    }

    pub fn close(&mut self) {
        self.record = None;
        self.transition(SessionState::Closed);
    }

    pub fn into_inner(self) -> R {
        self.parser.into_inner()
    }
}

/// Iterator returned by [`CsvReader::read_all_records`]
pub struct Records<'r, R: Read, T> {
    reader: &'r mut CsvReader<R>,
    done: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<R: Read, T: Mappable> Iterator for Records<'_, R, T> {
    type Item = CsvResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record::<T>() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: Read, T: Mappable> FusedIterator for Records<'_, R, T> {}

/// Population of one object graph from the current record
struct ReadScope<'a> {
    context: &'a CsvContext,
    header: Option<&'a HeaderIndex>,
    record: &'a [String],
    position: FieldPosition,
}

impl ReadScope<'_> {
    fn populate(&self, map: &ClassMap, target: &mut dyn Any) -> CsvResult<()> {
        for member in map.member_maps() {
            self.read_member(member, target)?;
        }
        for reference in map.reference_maps() {
            self.read_reference(reference, target)?;
        }
        Ok(())
    }

    fn by_name(&self, data: &MemberMapData) -> bool {
        self.header.is_some() && !data.is_index_set
    }

    /// Column a member reads from, `None` when its name is not in the header
    fn column(&self, data: &MemberMapData) -> Option<usize> {
        match self.header {
            Some(header) if !data.is_index_set => header.find_any(&data.names, data.name_index),
            _ => Some(data.index),
        }
    }

    fn field_position(&self, member: &MemberMap, index: Option<usize>) -> FieldPosition {
        let mut position = self.position.clone();
        position.index = index;
        if self.by_name(member.data()) {
            position.name = Some(member.header_name().to_string());
        }
        position
    }

    fn assign(
        &self,
        data: &MemberMapData,
        target: &mut dyn Any,
        value: Value,
        text: &str,
        position: FieldPosition,
    ) -> CsvResult<()> {
        data.accessor
            .set(target, value)
            .map_err(|reason| {
                CsvError::conversion(text, data.accessor.kind.type_name(), position, reason)
            })
    }

    /// Default for an absent field, a skip for optional members, else an
    /// error
    fn absent(
        &self,
        member: &MemberMap,
        target: &mut dyn Any,
        position: FieldPosition,
    ) -> CsvResult<()> {
        let data = member.data();
        match &data.default {
            Some(default) => self.assign(data, target, default.clone(), "", position),
            None if data.optional => Ok(()),
            None => Err(CsvError::missing_field(position)),
        }
    }

    fn read_member(&self, member: &MemberMap, target: &mut dyn Any) -> CsvResult<()> {
        let data = member.data();
        if data.ignore {
            return Ok(());
        }
        if let Some(constant) = &data.constant {
            let position = self.field_position(member, None);
            return self.assign(data, target, constant.clone(), "", position);
        }
        if member.is_collection() {
            return self.read_collection(member, target);
        }

        let index = self.column(data);
        let position = self.field_position(member, index);
        let Some(text) = index.and_then(|index| self.record.get(index)) else {
            return self.absent(member, target, position);
        };
        if text.is_empty() {
            if let Some(default) = &data.default {
                return self.assign(data, target, default.clone(), text, position);
            }
        }
        if let Some(validate) = &data.validate {
            if !validate(text) {
                return Err(CsvError::FieldValidation {
                    text: text.clone(),
                    position,
                });
            }
        }

        let value = self.context.convert_from_text(
            text,
            FieldTarget::of(&data.accessor),
            Some(data),
            position.clone(),
        )?;
        self.assign(data, target, value, text, position)
    }

    /// Columns a collection member reads, in order
    fn collection_columns(&self, data: &MemberMapData) -> Vec<usize> {
        match self.header {
            Some(header) if !data.is_index_set => (data.name_index..)
                .map_while(|occurrence| header.find_any(&data.names, occurrence))
                .filter(|index| *index < self.record.len())
                .collect(),
            _ => {
                let start = data.index;
                let end = match data.index_end {
                    Some(end) if end >= start => (end + 1).min(self.record.len()),
                    _ => self.record.len(),
                };
                (start..end.max(start)).collect()
            }
        }
    }

    fn read_collection(&self, member: &MemberMap, target: &mut dyn Any) -> CsvResult<()> {
        let data = member.data();
        let columns = self.collection_columns(data);
        if columns.is_empty() {
            let position = self.field_position(member, Some(data.index));
            return self.absent(member, target, position);
        }

        let mut items = Vec::with_capacity(columns.len());
        for index in columns {
            let text = &self.record[index];
            let position = self.field_position(member, Some(index));
            if let Some(validate) = &data.validate {
                if !validate(text) {
                    return Err(CsvError::FieldValidation {
                        text: text.clone(),
                        position,
                    });
                }
            }
            items.push(self.context.convert_from_text(
                text,
                FieldTarget::element(&data.accessor),
                Some(data),
                position,
            )?);
        }
        let position = self.field_position(member, Some(data.index));
        self.assign(data, target, Value::List(items), "", position)
    }

    /// Some mapped column under `map` holds text
    fn has_any_field(&self, map: &ClassMap) -> bool {
        let own = map.member_maps().iter().any(|member| {
            let data = member.data();
            if data.ignore || data.constant.is_some() {
                return false;
            }
            self.column(data)
                .and_then(|index| self.record.get(index))
                .map_or(false, |text| !text.is_empty())
        });
        own || map
            .reference_maps()
            .iter()
            .any(|reference| self.has_any_field(reference.map()))
    }

    fn read_reference(&self, reference: &ReferenceMap, target: &mut dyn Any) -> CsvResult<()> {
        let accessor = reference.accessor();
        if accessor.nullable && !self.has_any_field(reference.map()) {
            return Ok(());
        }
        if let Some(child) = accessor.get_mut(target) {
            return self.populate(reference.map(), child);
        }

        let info = reference.map().type_info();
        let mut child = info.construct().ok_or_else(|| {
            CsvError::configuration(format!(
                "{} has no constructor (member '{}')",
                info.name,
                reference.member()
            ))
        })?;
        self.populate(reference.map(), child.as_mut())?;
        accessor.install(target, child).map_err(CsvError::configuration)
    }
}
