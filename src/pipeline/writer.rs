//! Writing mapped records as delimited text

use super::context::{CsvContext, FieldTarget};
use super::SessionState;
use crate::config::CsvConfiguration;
use crate::conversion::{FieldValue, Value, ValueKind};
use crate::error::{CsvError, CsvResult, FieldPosition};
use crate::formatter::RecordFormatter;
use crate::mapping::{ClassMap, Mappable};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Writer session over a character sink
pub struct CsvWriter<W: Write> {
    formatter: RecordFormatter<W>,
    context: CsvContext,
    state: SessionState,
    header_written: bool,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(sink: W, configuration: CsvConfiguration) -> CsvResult<Self> {
        Ok(Self::with_context(sink, CsvContext::new(configuration)?))
    }

    pub fn with_context(sink: W, context: CsvContext) -> Self {
        Self {
            formatter: RecordFormatter::new(sink, context.configuration()),
            context,
            state: SessionState::Unstarted,
            header_written: false,
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

    /// Records written so far, header included
    pub fn row(&self) -> usize {
        self.formatter.records_written()
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            log::trace!("writer {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn begin(&mut self, operation: &str) -> CsvResult<()> {
        match self.state {
            SessionState::Closed | SessionState::Exhausted => {
                Err(CsvError::invalid_state(operation, self.state))
            }
            SessionState::Unstarted => {
                let next = if self.context.configuration().has_header_record {
                    SessionState::HeaderPending
                } else {
                    SessionState::Ready
                };
                self.transition(next);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn position(&self) -> FieldPosition {
        let row = self.formatter.records_written() + 1;
        FieldPosition::new(row, row)
    }

    /// Append raw text to the current record
    pub fn write_field(&mut self, raw: &str) -> CsvResult<()> {
        self.begin("write a field")?;
        self.formatter.write_field(raw);
        Ok(())
    }

    /// Append a value converted with the options registered for `T`
    pub fn write_field_value<T: FieldValue>(&mut self, value: &T) -> CsvResult<()> {
        self.begin("write a field")?;
        let kind = T::kind();
        let target = FieldTarget {
            kind: &kind,
            type_id: TypeId::of::<T>(),
            inner_type: T::inner_type_id(),
        };
        let position = self.position().with_index(self.formatter.field_count());
        let text = self
            .context
            .convert_to_text(&value.to_value(), target, None, position)?;
        self.formatter.write_field(&text);
        Ok(())
    }

    /// End the current record
    pub fn next_record(&mut self) -> CsvResult<()> {
        self.begin("end a record")?;
        self.formatter.end_record()?;
        self.transition(SessionState::Writing);
        Ok(())
    }

    /// Write the header names of `T`'s class map
    pub fn write_header<T: Mappable>(&mut self) -> CsvResult<()> {
        self.begin("write the header")?;
        if self.header_written || self.state == SessionState::Writing {
            return Err(CsvError::invalid_state("write the header", self.state));
        }
        let resolved = self.context.resolve_map::<T>();
        let names: Vec<String> = resolved
            .map
            .header_columns()
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        log::debug!("writing header for {} with {} columns", resolved.map.type_name(), names.len());
        self.emit_header(&names)
    }

    /// Convert `record` through its class map and write it as one record.
    ///
    /// Fields already written with `write_field` lead the record. Nothing
    /// reaches the sink when a conversion fails.
    pub fn write_record<T: Mappable>(&mut self, record: &T) -> CsvResult<()> {
        self.begin("write a record")?;
        let (_, cells) = self.record_cells(record)?;
        self.emit(&cells)
    }

    /// Write every record, preceded by the header when one is configured
    /// and none was written yet. Returns the number of records written.
    ///
    /// The header is sized from the first record, so a collection member
    /// repeats its name once per element.
    pub fn write_records<'a, T, I>(&mut self, records: I) -> CsvResult<usize>
    where
        T: Mappable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        self.begin("write records")?;
        let mut header_pending = self.context.configuration().has_header_record
            && !self.header_written
            && self.state != SessionState::Writing;

        let mut count = 0;
        for record in records {
            if header_pending {
                header_pending = false;
                let (map, cells) = match self.record_cells(record) {
                    Ok(collected) => collected,
                    Err(err) => {
                        self.write_header::<T>()?;
                        return Err(err);
                    }
                };
                let names = header_names(&map, &cells);
                log::debug!("writing header for {} with {} columns", map.type_name(), names.len());
                self.emit_header(&names)?;
                self.emit(&cells)?;
            } else {
                self.write_record(record)?;
            }
            count += 1;
        }
        if header_pending {
            self.write_header::<T>()?;
        }
        Ok(count)
    }

    /// Cells of `record` in column order, with the map that produced them
    fn record_cells<T: Mappable>(
        &mut self,
        record: &T,
    ) -> CsvResult<(Arc<ClassMap>, Vec<(usize, String)>)> {
        let resolved = self.context.resolve_map::<T>();
        let owner = resolved.upcast.apply(record as &dyn Any).ok_or_else(|| {
            CsvError::configuration(format!(
                "record cannot be viewed as {}",
                resolved.map.type_name()
            ))
        })?;

        let scope = WriteScope {
            context: &self.context,
            position: self.position(),
        };
        let mut cells = Vec::with_capacity(resolved.map.column_count());
        scope.collect(&resolved.map, Some(owner), &mut cells)?;
        // stable: the elements of a collection share one column index
        cells.sort_by_key(|(index, _)| *index);
        Ok((resolved.map, cells))
    }

    fn emit(&mut self, cells: &[(usize, String)]) -> CsvResult<()> {
        for (_, text) in cells {
            self.formatter.write_field(text);
        }
        self.formatter.end_record()?;
        self.transition(SessionState::Writing);
        Ok(())
    }

    fn emit_header(&mut self, names: &[String]) -> CsvResult<()> {
        for name in names {
            self.formatter.write_field(name);
        }
        self.formatter.end_record()?;
        self.header_written = true;
        self.transition(SessionState::Ready);
        Ok(())
    }

    pub fn flush(&mut self) -> CsvResult<()> {
        self.formatter.flush()?;
        Ok(())
    }

    /// End any pending record, flush and refuse further writes
    pub fn close(&mut self) -> CsvResult<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        if self.formatter.field_count() > 0 {
            self.formatter.end_record()?;
        }
        self.formatter.flush()?;
        self.transition(SessionState::Closed);
        Ok(())
    }

    /// Close the session and hand back the sink
    pub fn into_inner(mut self) -> CsvResult<W> {
        self.close()?;
        Ok(self.formatter.into_inner())
    }
}

/// Header name of every cell, looked up by the cell's column index
fn header_names(map: &ClassMap, cells: &[(usize, String)]) -> Vec<String> {
    let columns: HashMap<usize, String> = map.header_columns().into_iter().collect();
    cells
        .iter()
        .map(|(index, _)| columns.get(index).cloned().unwrap_or_default())
        .collect()
}

/// Collection of one object graph's cells
struct WriteScope<'a> {
    context: &'a CsvContext,
    position: FieldPosition,
}

impl WriteScope<'_> {
    /// Append `(column index, text)` cells for every binding under `map`.
    /// `owner` is `None` for an absent reference written as empty fields.
    fn collect(
        &self,
        map: &ClassMap,
        owner: Option<&dyn Any>,
        cells: &mut Vec<(usize, String)>,
    ) -> CsvResult<()> {
        for member in map.member_maps() {
            let data = member.data();
            if data.ignore {
                continue;
            }
            let Some(owner) = owner else {
                if !member.is_collection() {
                    cells.push((data.index, String::new()));
                }
                continue;
            };

            let value = match &data.constant {
                Some(constant) => constant.clone(),
                None => data.accessor.get(owner).ok_or_else(|| {
                    CsvError::configuration(format!(
                        "cannot read member '{}' of {}",
                        data.member,
                        map.type_name()
                    ))
                })?,
            };
            let position = self
                .position
                .clone()
                .with_index(data.index)
                .with_name(member.header_name());

            match (&data.accessor.kind, value) {
                (ValueKind::Collection(_), Value::List(items)) => {
                    for item in &items {
                        let text = self.context.convert_to_text(
                            item,
                            FieldTarget::element(&data.accessor),
                            Some(data),
                            position.clone(),
                        )?;
                        cells.push((data.index, text));
                    }
                }
                (_, value) => {
                    let text = self.context.convert_to_text(
                        &value,
                        FieldTarget::of(&data.accessor),
                        Some(data),
                        position,
                    )?;
                    cells.push((data.index, text));
                }
            }
        }

        for reference in map.reference_maps() {
            let accessor = reference.accessor();
            let fresh: Box<dyn Any>;
            let child = match owner.map(|owner| accessor.get(owner)) {
                Some(Some(child)) => Some(child),
                Some(None) if self.context.configuration().use_new_object_for_null_references => {
                    let info = reference.map().type_info();
                    fresh = info.construct().ok_or_else(|| {
                        CsvError::configuration(format!(
                            "{} has no constructor (member '{}')",
                            info.name,
                            reference.member()
                        ))
                    })?;
                    Some(&*fresh)
                }
                _ => None,
            };
            self.collect(reference.map(), child, cells)?;
        }
        Ok(())
    }
}
