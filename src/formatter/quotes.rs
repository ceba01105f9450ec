//! Field quoting for delimited output
//!
//! Fields are quoted only when a reader could otherwise misread them,
//! unless the configured strategy says always or never.

use crate::config::{CsvConfiguration, NewLine, QuoteStrategy};

/// Quoting engine for a single output dialect
#[derive(Debug, Clone)]
pub struct QuoteEngine {
    delimiter: char,
    quote: char,
    comment: Option<char>,
    new_line: NewLine,
    strategy: QuoteStrategy,
}

impl QuoteEngine {
    pub fn new(config: &CsvConfiguration) -> Self {
        Self {
            delimiter: config.delimiter,
            quote: config.quote,
            comment: config.comment,
            new_line: config.new_line.clone(),
            strategy: config.quote_strategy,
        }
    }

    /// Determine if a field needs quoting under the smart rules
    ///
    /// A field is quoted when it:
    /// 1. contains the delimiter, the quote character, `\r` or `\n`
    /// 2. contains a custom record terminator
    /// 3. begins or ends with a space or tab
    /// 4. begins with the comment character
    pub fn needs_quoting(&self, value: &str) -> bool {
        if value
            .chars()
            .any(|c| c == self.delimiter || c == self.quote || c == '\r' || c == '\n')
        {
            return true;
        }

        if let NewLine::Custom(terminator) = &self.new_line {
            if value.contains(terminator.as_str()) {
                return true;
            }
        }

        let padded = |c: Option<char>| matches!(c, Some(' ') | Some('\t'));
        if padded(value.chars().next()) || padded(value.chars().last()) {
            return true;
        }

        matches!(
            (self.comment, value.chars().next()),
            (Some(comment), Some(first)) if comment == first
        )
    }

    /// Wrap a field in quotes, doubling embedded quote characters
    pub fn quote(&self, value: &str) -> String {
        let mut result = String::with_capacity(value.len() + 2);
        result.push(self.quote);
        for ch in value.chars() {
            if ch == self.quote {
                result.push(ch);
            }
            result.push(ch);
        }
        result.push(self.quote);
        result
    }

    /// Format a field according to the configured strategy
    pub fn format(&self, value: &str) -> String {
        match self.strategy {
            QuoteStrategy::Always => self.quote(value),
            QuoteStrategy::Never => value.to_string(),
            QuoteStrategy::Smart if self.needs_quoting(value) => self.quote(value),
            QuoteStrategy::Smart => value.to_string(),
        }
    }
}

/// Convenience function to check if quoting is needed with default settings
pub fn needs_quoting(value: &str, delimiter: char) -> bool {
    QuoteEngine::new(&CsvConfiguration::default().with_delimiter(delimiter)).needs_quoting(value)
}

/// Convenience function to format a field with smart quoting
pub fn smart_quote(value: &str, delimiter: char) -> String {
    QuoteEngine::new(&CsvConfiguration::default().with_delimiter(delimiter)).format(value)
}
