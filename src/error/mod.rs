//! Error types and handling infrastructure for reading and writing records

use std::fmt;

/// Location of a field inside the record stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPosition {
    /// Logical record counter (1-based, header included)
    pub row: usize,
    /// Physical line counter
    pub raw_row: usize,
    /// Column index, when known
    pub index: Option<usize>,
    /// Column name, when the field was looked up by name
    pub name: Option<String>,
}

impl FieldPosition {
    pub fn new(row: usize, raw_row: usize) -> Self {
        Self {
            row,
            raw_row,
            index: None,
            name: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for FieldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.row)?;
        if let Some(index) = self.index {
            write!(f, ", field index {}", index)?;
        }
        if let Some(name) = &self.name {
            write!(f, ", field '{}'", name)?;
        }
        Ok(())
    }
}

/// Main error type for record operations
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("Missing field at {position}")]
    MissingField { position: FieldPosition },

    #[error("Cannot convert '{text}' to {type_name} at {position}: {reason}")]
    Conversion {
        text: String,
        type_name: String,
        position: FieldPosition,
        reason: String,
    },

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Malformed input at row {row} (line {raw_row}): {message}")]
    MalformedInput {
        row: usize,
        raw_row: usize,
        message: String,
    },

    #[error("Field validation failed at {position} for '{text}'")]
    FieldValidation { text: String, position: FieldPosition },

    #[error("Cannot {operation} while the session is {state}")]
    InvalidState { operation: String, state: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CsvError {
    pub fn missing_field(position: FieldPosition) -> Self {
        Self::MissingField { position }
    }

    pub fn conversion(
        text: impl Into<String>,
        type_name: impl Into<String>,
        position: FieldPosition,
        reason: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            text: text.into(),
            type_name: type_name.into(),
            position,
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn malformed(row: usize, raw_row: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            row,
            raw_row,
            message: message.into(),
        }
    }

    pub fn invalid_state(operation: impl Into<String>, state: impl fmt::Display) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Field position carried by the error, if any
    pub fn position(&self) -> Option<&FieldPosition> {
        match self {
            Self::MissingField { position }
            | Self::Conversion { position, .. }
            | Self::FieldValidation { position, .. } => Some(position),
            _ => None,
        }
    }

    /// Create a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingField { position } => match (&position.name, position.index) {
                (Some(name), _) => format!(
                    "Column '{}' is missing on row {}",
                    name, position.row
                ),
                (None, Some(index)) => format!(
                    "Row {} has no field at index {}",
                    position.row, index
                ),
                (None, None) => format!("Missing field on row {}", position.row),
            },
            Self::Conversion {
                text,
                type_name,
                position,
                ..
            } => format!(
                "Value '{}' on row {} is not a valid {}",
                text, position.row, type_name
            ),
            Self::MalformedInput {
                raw_row, message, ..
            } => format!("Malformed input near line {}: {}", raw_row, message),
            Self::Io(err) => format!("Could not read or write data: {}", err),
            Self::Other(err) => format!("Unexpected error: {}", err),
            _ => self.to_string(),
        }
    }
}

/// Result type for record operations
pub type CsvResult<T> = Result<T, CsvError>;
