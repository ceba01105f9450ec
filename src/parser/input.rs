//! Input sources for the command line reader

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

/// Where delimited text is read from
#[derive(Debug, Clone, PartialEq)]
pub enum CsvSource {
    /// In-memory text
    String(String),
    /// Single file path
    File(PathBuf),
    /// Standard input stream
    Stdin,
}

impl CsvSource {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Get a human-readable description of the source
    pub fn description(&self) -> String {
        match self {
            CsvSource::String(_) => "string input".to_string(),
            CsvSource::File(path) => format!("file: {}", path.display()),
            CsvSource::Stdin => "standard input".to_string(),
        }
    }

    /// Check if the source exists and is accessible
    pub fn exists(&self) -> bool {
        match self {
            CsvSource::File(path) => path.is_file(),
            CsvSource::String(_) | CsvSource::Stdin => true,
        }
    }

    /// Size of the source in bytes, if known before reading
    pub fn estimated_size(&self) -> Option<u64> {
        match self {
            CsvSource::String(s) => Some(s.len() as u64),
            CsvSource::File(path) => std::fs::metadata(path).ok().map(|m| m.len()),
            CsvSource::Stdin => None,
        }
    }

    /// Open the source as a byte stream
    pub fn open(&self) -> io::Result<Box<dyn Read>> {
        match self {
            CsvSource::String(content) => {
                Ok(Box::new(io::Cursor::new(content.clone().into_bytes())))
            }
            CsvSource::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            CsvSource::Stdin => Ok(Box::new(io::stdin())),
        }
    }
}
