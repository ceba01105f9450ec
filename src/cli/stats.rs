//! Statistics for a command-line pass over delimited text

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters collected while re-emitting records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassStatistics {
    /// Data records read, header excluded
    pub records: usize,
    /// Fields across all data records
    pub fields: usize,
    /// Widest record seen
    pub max_columns: usize,
    /// Physical lines consumed
    pub lines: usize,
    /// Input size in bytes, when known up front
    pub input_size_bytes: Option<u64>,
    pub processing_time_ms: u64,
    /// Records per second
    pub throughput: f64,
    pub collected_at: chrono::DateTime<chrono::Utc>,
}

impl Default for PassStatistics {
    fn default() -> Self {
        Self {
            records: 0,
            fields: 0,
            max_columns: 0,
            lines: 0,
            input_size_bytes: None,
            processing_time_ms: 0,
            throughput: 0.0,
            collected_at: chrono::Utc::now(),
        }
    }
}

impl PassStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one data record
    pub fn record(&mut self, fields: &[String]) {
        self.records += 1;
        self.fields += fields.len();
        self.max_columns = self.max_columns.max(fields.len());
    }

    /// Stamp elapsed time and derived rates
    pub fn finish(&mut self, lines: usize, elapsed: Duration) {
        self.lines = lines;
        self.processing_time_ms = elapsed.as_millis() as u64;
        let seconds = elapsed.as_secs_f64();
        self.throughput = if seconds > 0.0 {
            self.records as f64 / seconds
        } else {
            0.0
        };
        self.collected_at = chrono::Utc::now();
    }

    /// Average fields per record
    pub fn average_width(&self) -> f64 {
        if self.records == 0 {
            0.0
        } else {
            self.fields as f64 / self.records as f64
        }
    }

    /// One-line summary
    pub fn summary(&self) -> String {
        format!(
            "{} records, {} fields, {} lines in {}ms",
            self.records, self.fields, self.lines, self.processing_time_ms
        )
    }
}
