//! Locale data used by the number and date converters

use serde::{Deserialize, Serialize};

/// Formatting conventions of a locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    /// Culture name, e.g. `en-US`; empty for the invariant culture
    pub name: String,
    pub decimal_separator: char,
    pub group_separator: char,
    pub currency_symbol: String,
    /// Short date pattern in chrono `strftime` syntax
    pub short_date_pattern: String,
    /// Long time pattern in chrono `strftime` syntax
    pub long_time_pattern: String,
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

impl Culture {
    /// Culture-independent conventions
    pub fn invariant() -> Self {
        Self {
            name: String::new(),
            decimal_separator: '.',
            group_separator: ',',
            currency_symbol: "¤".to_string(),
            short_date_pattern: "%m/%d/%Y".to_string(),
            long_time_pattern: "%H:%M:%S".to_string(),
        }
    }

    pub fn en_us() -> Self {
        Self {
            name: "en-US".to_string(),
            currency_symbol: "$".to_string(),
            long_time_pattern: "%I:%M:%S %p".to_string(),
            ..Self::invariant()
        }
    }

    pub fn en_gb() -> Self {
        Self {
            name: "en-GB".to_string(),
            currency_symbol: "£".to_string(),
            short_date_pattern: "%d/%m/%Y".to_string(),
            ..Self::invariant()
        }
    }

    pub fn de_de() -> Self {
        Self {
            name: "de-DE".to_string(),
            decimal_separator: ',',
            group_separator: '.',
            currency_symbol: "€".to_string(),
            short_date_pattern: "%d.%m.%Y".to_string(),
            long_time_pattern: "%H:%M:%S".to_string(),
        }
    }

    pub fn fr_fr() -> Self {
        Self {
            name: "fr-FR".to_string(),
            decimal_separator: ',',
            group_separator: '\u{202F}',
            currency_symbol: "€".to_string(),
            short_date_pattern: "%d/%m/%Y".to_string(),
            long_time_pattern: "%H:%M:%S".to_string(),
        }
    }

    /// Look up one of the built-in cultures by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "" | "invariant" => Some(Self::invariant()),
            "en-us" | "en" => Some(Self::en_us()),
            "en-gb" => Some(Self::en_gb()),
            "de-de" | "de" => Some(Self::de_de()),
            "fr-fr" | "fr" => Some(Self::fr_fr()),
            _ => None,
        }
    }

    pub fn is_invariant(&self) -> bool {
        self.name.is_empty()
    }

    /// True if `c` acts as a group separator in this culture.
    ///
    /// Cultures that group with a narrow or regular no-break space also accept
    /// a plain space on input.
    pub fn is_group_separator(&self, c: char) -> bool {
        c == self.group_separator
            || (matches!(self.group_separator, '\u{202F}' | '\u{00A0}') && c == ' ')
    }
}
