//! Delimited text tokenizer
//!
//! Turns a character stream into raw field strings, one record at a time.
//! Quoted fields may contain delimiters, doubled quotes and line breaks.

pub mod input;
pub mod source;

pub use input::CsvSource;
pub use source::CharReader;

use crate::config::{CsvConfiguration, NewLine};
use crate::error::{CsvError, CsvResult};
use std::io::{self, Read};

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    StartOfField,
    Unquoted,
    InQuotes,
    /// A quote was seen inside a quoted field: either an escape or the close
    QuoteInQuotes,
    /// Whitespace after a closing quote, only reachable when trimming
    AfterQuoted,
}

enum Parsed {
    Fields(Vec<String>),
    Blank,
    Comment,
}

/// Record tokenizer
pub struct CsvParser<R> {
    source: CharReader<R>,
    delimiter: char,
    quote: char,
    new_line: NewLine,
    ignore_blank_lines: bool,
    comment: Option<char>,
    trim: bool,
    lenient: bool,
    row: usize,
    raw_row: usize,
    raw_record: String,
}

impl<R: Read> CsvParser<R> {
    /// Create a tokenizer over `reader` using the dialect in `config`
    pub fn new(reader: R, config: &CsvConfiguration) -> Self {
        Self {
            source: CharReader::new(reader, config.buffer_size),
            delimiter: config.delimiter,
            quote: config.quote,
            new_line: config.new_line.clone(),
            ignore_blank_lines: config.ignore_blank_lines,
            comment: config.comment,
            trim: config.trim_fields,
            lenient: config.lenient_quotes,
            row: 0,
            raw_row: 0,
            raw_record: String::new(),
        }
    }

    /// Logical records returned so far
    pub fn row(&self) -> usize {
        self.row
    }

    /// Physical line the tokenizer last consumed
    pub fn raw_row(&self) -> usize {
        self.raw_row
    }

    /// Unparsed text of the last record, terminator included
    pub fn raw_record(&self) -> &str {
        &self.raw_record
    }

    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    /// Read the next record, or `None` at end of input
    pub fn next_record(&mut self) -> CsvResult<Option<Vec<String>>> {
        loop {
            match self.parse_record()? {
                None => return Ok(None),
                Some(Parsed::Comment) => continue,
                Some(Parsed::Blank) if self.ignore_blank_lines => {
                    log::trace!("skipping blank line {}", self.raw_row);
                    continue;
                }
                Some(Parsed::Blank) => {
                    self.row += 1;
                    return Ok(Some(vec![String::new()]));
                }
                Some(Parsed::Fields(fields)) => {
                    self.row += 1;
                    return Ok(Some(fields));
                }
            }
        }
    }

    fn parse_record(&mut self) -> CsvResult<Option<Parsed>> {
        self.raw_record.clear();
        let first = match self.source.peek().map_err(|e| self.io_error(e))? {
            None => return Ok(None),
            Some(c) => c,
        };
        self.raw_row += 1;

        if Some(first) == self.comment {
            self.skip_line()?;
            return Ok(Some(Parsed::Comment));
        }

        let mut fields = Vec::new();
        let mut field = String::new();
        let mut state = State::StartOfField;

        loop {
            let c = self.next_char()?;
            match state {
                State::StartOfField => match c {
                    None => {
                        if fields.is_empty() {
                            return Ok(Some(Parsed::Blank));
                        }
                        fields.push(field);
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if ch == self.quote => state = State::InQuotes,
                    Some(ch) if ch == self.delimiter => fields.push(std::mem::take(&mut field)),
                    Some(ch) if self.at_terminator(ch)? => {
                        if fields.is_empty() {
                            return Ok(Some(Parsed::Blank));
                        }
                        fields.push(field);
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if self.trim && is_blank(ch) => {}
                    Some(ch) => {
                        self.count_line_break(ch)?;
                        field.push(ch);
                        state = State::Unquoted;
                    }
                },
                State::Unquoted => match c {
                    None => {
                        fields.push(self.finish_unquoted(field));
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if ch == self.delimiter => {
                        fields.push(self.finish_unquoted(std::mem::take(&mut field)));
                        state = State::StartOfField;
                    }
                    Some(ch) if self.at_terminator(ch)? => {
                        fields.push(self.finish_unquoted(field));
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if ch == self.quote && !self.lenient => {
                        return Err(self.malformed(format!(
                            "unexpected quote character in unquoted field {}",
                            fields.len()
                        )));
                    }
                    Some(ch) => {
                        self.count_line_break(ch)?;
                        field.push(ch);
                    }
                },
                State::InQuotes => match c {
                    None => {
                        return Err(self.malformed(format!(
                            "unterminated quoted field {}",
                            fields.len()
                        )));
                    }
                    Some(ch) if ch == self.quote => state = State::QuoteInQuotes,
                    Some(ch) => {
                        self.count_line_break(ch)?;
                        field.push(ch);
                    }
                },
                State::QuoteInQuotes => match c {
                    Some(ch) if ch == self.quote => {
                        field.push(ch);
                        state = State::InQuotes;
                    }
                    None => {
                        fields.push(field);
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if ch == self.delimiter => {
                        fields.push(std::mem::take(&mut field));
                        state = State::StartOfField;
                    }
                    Some(ch) if self.at_terminator(ch)? => {
                        fields.push(field);
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if self.trim && is_blank(ch) => state = State::AfterQuoted,
                    Some(ch) => {
                        if !self.lenient {
                            return Err(self.malformed(format!(
                                "unexpected character {:?} after closing quote in field {}",
                                ch,
                                fields.len()
                            )));
                        }
                        self.count_line_break(ch)?;
                        field.push(ch);
                        state = State::Unquoted;
                    }
                },
                State::AfterQuoted => match c {
                    None => {
                        fields.push(field);
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if ch == self.delimiter => {
                        fields.push(std::mem::take(&mut field));
                        state = State::StartOfField;
                    }
                    Some(ch) if self.at_terminator(ch)? => {
                        fields.push(field);
                        return Ok(Some(Parsed::Fields(fields)));
                    }
                    Some(ch) if is_blank(ch) => {}
                    Some(ch) => {
                        if !self.lenient {
                            return Err(self.malformed(format!(
                                "unexpected character {:?} after closing quote in field {}",
                                ch,
                                fields.len()
                            )));
                        }
                        field.push(ch);
                        state = State::Unquoted;
                    }
                },
            }
        }
    }

    fn next_char(&mut self) -> CsvResult<Option<char>> {
        let c = self.source.next_char().map_err(|e| self.io_error(e))?;
        if let Some(ch) = c {
            self.raw_record.push(ch);
        }
        Ok(c)
    }

    /// Consumes the rest of the terminator if `ch` starts one
    fn at_terminator(&mut self, ch: char) -> CsvResult<bool> {
        let custom = match &self.new_line {
            NewLine::Custom(terminator) if terminator.starts_with(ch) => Some(terminator.clone()),
            NewLine::Custom(_) => return Ok(false),
            _ => None,
        };
        match custom {
            Some(terminator) => {
                let mut expected = terminator.chars();
                if expected.next() != Some(ch) {
                    return Ok(false);
                }
                let rest: Vec<char> = expected.collect();
                for (i, want) in rest.iter().enumerate() {
                    let got = self.source.peek_nth(i).map_err(|e| self.io_error(e))?;
                    if got != Some(*want) {
                        return Ok(false);
                    }
                }
                for _ in 0..rest.len() {
                    self.next_char()?;
                }
                Ok(true)
            }
            None => match ch {
                '\n' => Ok(true),
                '\r' => {
                    if self.source.peek().map_err(|e| self.io_error(e))? == Some('\n') {
                        self.next_char()?;
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    /// Keeps `raw_row` in step with line breaks that are field data
    fn count_line_break(&mut self, ch: char) -> CsvResult<()> {
        match ch {
            '\n' => self.raw_row += 1,
            '\r' => {
                if self.source.peek().map_err(|e| self.io_error(e))? != Some('\n') {
                    self.raw_row += 1;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn skip_line(&mut self) -> CsvResult<()> {
        while let Some(ch) = self.next_char()? {
            if self.at_terminator(ch)? {
                break;
            }
        }
        Ok(())
    }

    fn finish_unquoted(&self, field: String) -> String {
        if self.trim {
            field.trim_end_matches(is_blank).to_string()
        } else {
            field
        }
    }

    fn malformed(&self, message: String) -> CsvError {
        CsvError::malformed(self.row + 1, self.raw_row, message)
    }

    fn io_error(&self, error: io::Error) -> CsvError {
        if error.kind() == io::ErrorKind::InvalidData {
            self.malformed(error.to_string())
        } else {
            CsvError::Io(error)
        }
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}
