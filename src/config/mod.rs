//! Configuration options for reading and writing delimited text

pub mod culture;

pub use culture::Culture;

use serde::{Deserialize, Serialize};

/// Record terminator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NewLine {
    /// Windows-style `\r\n` (default)
    #[default]
    CrLf,
    /// Unix-style `\n`
    Lf,
    /// Classic Mac `\r`
    Cr,
    /// Any other terminator, matched exactly on read
    Custom(String),
}

impl NewLine {
    /// Text written at the end of every record
    pub fn as_str(&self) -> &str {
        match self {
            NewLine::CrLf => "\r\n",
            NewLine::Lf => "\n",
            NewLine::Cr => "\r",
            NewLine::Custom(s) => s,
        }
    }

    /// Standard terminators accept any of `\r\n`, `\n` and `\r` on read
    pub fn is_standard(&self) -> bool {
        !matches!(self, NewLine::Custom(_))
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "crlf" | "\r\n" => Ok(NewLine::CrLf),
            "lf" | "\n" => Ok(NewLine::Lf),
            "cr" | "\r" => Ok(NewLine::Cr),
            "" => Err("Line terminator must not be empty".to_string()),
            _ => Ok(NewLine::Custom(s.to_string())),
        }
    }
}

/// Field quoting strategy on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuoteStrategy {
    /// Quote only when the field would otherwise be ambiguous
    #[default]
    Smart,
    /// Always quote all fields
    Always,
    /// Never quote fields
    Never,
}

/// Reader/writer session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfiguration {
    /// Field delimiter
    pub delimiter: char,
    /// Quote character
    pub quote: char,
    /// Record terminator
    pub new_line: NewLine,
    /// First record holds column names
    pub has_header_record: bool,
    /// Default culture for type conversion
    pub culture: Culture,
    /// Write absent references from a freshly constructed instance
    pub use_new_object_for_null_references: bool,
    /// Skip empty physical lines on read
    pub ignore_blank_lines: bool,
    /// Accept records whose width differs from the header
    pub allow_ragged_rows: bool,
    /// Quoting on write
    pub quote_strategy: QuoteStrategy,
    /// Match header names case-insensitively
    pub ignore_header_case: bool,
    /// Trim whitespace outside quotes
    pub trim_fields: bool,
    /// Records starting with this character are skipped
    pub comment: Option<char>,
    /// Keep stray quote characters instead of failing
    pub lenient_quotes: bool,
    /// Read chunk size in bytes
    pub buffer_size: usize,
}

impl Default for CsvConfiguration {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            new_line: NewLine::CrLf,
            has_header_record: true,
            culture: Culture::invariant(),
            use_new_object_for_null_references: true,
            ignore_blank_lines: true,
            allow_ragged_rows: false,
            quote_strategy: QuoteStrategy::Smart,
            ignore_header_case: false,
            trim_fields: false,
            comment: None,
            lenient_quotes: false,
            buffer_size: 8 * 1024,
        }
    }
}

impl CsvConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab separated values
    pub fn tab_separated() -> Self {
        Self {
            delimiter: '\t',
            ..Default::default()
        }
    }

    /// Semicolon delimiter with a comma decimal separator, as produced by
    /// spreadsheet exports in most of continental Europe
    pub fn semicolon_european() -> Self {
        Self {
            delimiter: ';',
            culture: Culture::de_de(),
            ..Default::default()
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_new_line(mut self, new_line: NewLine) -> Self {
        self.new_line = new_line;
        self
    }

    pub fn with_header_record(mut self, enabled: bool) -> Self {
        self.has_header_record = enabled;
        self
    }

    pub fn with_culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    pub fn with_new_object_for_null_references(mut self, enabled: bool) -> Self {
        self.use_new_object_for_null_references = enabled;
        self
    }

    pub fn with_ignore_blank_lines(mut self, enabled: bool) -> Self {
        self.ignore_blank_lines = enabled;
        self
    }

    pub fn with_ragged_rows(mut self, allowed: bool) -> Self {
        self.allow_ragged_rows = allowed;
        self
    }

    pub fn with_quote_strategy(mut self, strategy: QuoteStrategy) -> Self {
        self.quote_strategy = strategy;
        self
    }

    pub fn with_ignore_header_case(mut self, enabled: bool) -> Self {
        self.ignore_header_case = enabled;
        self
    }

    pub fn with_trim_fields(mut self, enabled: bool) -> Self {
        self.trim_fields = enabled;
        self
    }

    pub fn with_comment(mut self, comment: Option<char>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_lenient_quotes(mut self, enabled: bool) -> Self {
        self.lenient_quotes = enabled;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.delimiter == self.quote {
            return Err(format!(
                "Delimiter and quote must differ (both are {:?})",
                self.delimiter
            ));
        }

        for (label, c) in [("Delimiter", self.delimiter), ("Quote", self.quote)] {
            if c == '\r' || c == '\n' {
                return Err(format!("{} cannot be a line break character", label));
            }
        }

        if let NewLine::Custom(s) = &self.new_line {
            if s.is_empty() {
                return Err("Line terminator must not be empty".to_string());
            }
            if s.contains(self.delimiter) || s.contains(self.quote) {
                return Err("Line terminator cannot contain the delimiter or quote".to_string());
            }
        }

        if let Some(comment) = self.comment {
            if comment == self.delimiter || comment == self.quote {
                return Err("Comment character must differ from delimiter and quote".to_string());
            }
        }

        if self.buffer_size == 0 {
            return Err("Buffer size must be greater than 0".to_string());
        }

        Ok(())
    }
}
