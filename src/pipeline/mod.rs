//! Record pipeline: sessions that read and write mapped records
//!
//! A session owns a [`CsvContext`] with its configuration, class maps,
//! converters and options. The reader drives the tokenizer and converts each
//! record into an instance of the requested type; the writer mirrors it.

pub mod context;
pub mod reader;
pub mod writer;

mod header;

pub use context::CsvContext;
pub use reader::{CsvReader, Records};
pub use writer::CsvWriter;

use std::fmt;

/// Lifecycle of a reader or writer session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing read or written yet
    Unstarted,
    /// Header record expected before any data record
    HeaderPending,
    /// Header handled, no data record yet
    Ready,
    /// A data record is current
    Reading,
    /// At least one data record was written
    Writing,
    /// End of input reached
    Exhausted,
    Closed,
}

impl SessionState {
    /// No further records can be read or written
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Exhausted | SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unstarted => "unstarted",
            SessionState::HeaderPending => "waiting for the header",
            SessionState::Ready => "ready",
            SessionState::Reading => "reading",
            SessionState::Writing => "writing",
            SessionState::Exhausted => "exhausted",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
