//! Delimited text output
//!
//! Fields are buffered per record and handed to the sink only when the
//! record ends.

pub mod quotes;

pub use quotes::QuoteEngine;

use crate::config::CsvConfiguration;
use std::io::{self, Write};

/// Write-side mirror of the tokenizer
pub struct RecordFormatter<W: Write> {
    sink: W,
    engine: QuoteEngine,
    delimiter: char,
    terminator: String,
    buffer: String,
    field_count: usize,
    only_field_empty: bool,
    records_written: usize,
}

impl<W: Write> RecordFormatter<W> {
    pub fn new(sink: W, config: &CsvConfiguration) -> Self {
        Self {
            sink,
            engine: QuoteEngine::new(config),
            delimiter: config.delimiter,
            terminator: config.new_line.as_str().to_string(),
            buffer: String::with_capacity(256),
            field_count: 0,
            only_field_empty: false,
            records_written: 0,
        }
    }

    /// Append one raw field to the current record
    pub fn write_field(&mut self, raw: &str) {
        if self.field_count > 0 {
            self.buffer.push(self.delimiter);
        }
        let formatted = self.engine.format(raw);
        self.only_field_empty = self.field_count == 0 && formatted.is_empty();
        self.buffer.push_str(&formatted);
        self.field_count += 1;
    }

    /// Append a whole pre-converted row
    pub fn write_row<S: AsRef<str>>(&mut self, fields: &[S]) -> io::Result<()> {
        for field in fields {
            self.write_field(field.as_ref());
        }
        self.end_record()
    }

    /// Terminate the current record and hand it to the sink
    pub fn end_record(&mut self) -> io::Result<()> {
        if self.field_count == 1 && self.only_field_empty {
            // a lone empty field would read back as a blank line
            self.buffer = self.engine.quote("");
        }
        self.buffer.push_str(&self.terminator);
        self.sink.write_all(self.buffer.as_bytes())?;
        self.buffer.clear();
        self.field_count = 0;
        self.only_field_empty = false;
        self.records_written += 1;
        Ok(())
    }

    /// Fields in the record being built
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Drop the fields of the record being built
    pub fn discard_record(&mut self) {
        self.buffer.clear();
        self.field_count = 0;
        self.only_field_empty = false;
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
