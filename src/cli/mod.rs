//! Command-line interface module

use clap::Parser;
use serde_json::{Map, Value as JsonValue};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::{CsvConfiguration, QuoteStrategy};
use crate::error::{CsvError, CsvResult};
use crate::parser::CsvSource;
use crate::pipeline::{CsvReader, CsvWriter};

pub mod stats;

pub use stats::PassStatistics;

/// Main CLI arguments
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "csvmap")]
#[command(about = "Re-emit delimited text in another dialect or as JSON")]
#[command(version)]
#[command(long_about = None)]
pub struct Args {
    /// Input file
    #[arg()]
    pub input: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Read from standard input
    #[arg(long)]
    pub stdin: bool,

    /// Input delimiter: comma, tab, pipe, semicolon or a single character
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Quote character
    #[arg(long)]
    pub quote: Option<char>,

    /// Output delimiter (default: same as input)
    #[arg(long)]
    pub output_delimiter: Option<String>,

    /// Quote every output field
    #[arg(long)]
    pub always_quote: bool,

    /// Input has no header record
    #[arg(long)]
    pub no_header: bool,

    /// Keep empty lines as records with one empty field
    #[arg(long)]
    pub keep_blank_lines: bool,

    /// Accept records whose width differs from the header
    #[arg(long)]
    pub allow_ragged: bool,

    /// JSON file with reader configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit records as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Only check that the input parses
    #[arg(long)]
    pub validate_only: bool,

    /// Print statistics to stderr
    #[arg(long)]
    pub stats: bool,

    /// Enable verbose logging
    #[arg(long)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(long)]
    pub quiet: bool,
}

/// Parse a delimiter name or literal character
pub fn parse_delimiter(value: &str) -> CsvResult<char> {
    match value {
        "comma" => Ok(','),
        "tab" | "\\t" => Ok('\t'),
        "pipe" => Ok('|'),
        "semicolon" => Ok(';'),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(CsvError::configuration(format!(
                    "Invalid delimiter '{}'. Use comma, tab, pipe, semicolon or a single character",
                    other
                ))),
            }
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub args: Args,
    pub input_config: CsvConfiguration,
    pub output_config: CsvConfiguration,
}

impl CliConfig {
    /// Create CLI configuration from arguments
    pub fn from_args(args: Args) -> CsvResult<Self> {
        let mut input_config = match &args.config {
            Some(path) => {
                let file = File::open(path)?;
                serde_json::from_reader(io::BufReader::new(file)).map_err(|e| {
                    CsvError::configuration(format!("{}: {}", path.display(), e))
                })?
            }
            None => CsvConfiguration::default(),
        };

        if let Some(delimiter) = &args.delimiter {
            input_config.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(quote) = args.quote {
            input_config.quote = quote;
        }
        if args.no_header {
            input_config.has_header_record = false;
        }
        if args.keep_blank_lines {
            input_config.ignore_blank_lines = false;
        }
        if args.allow_ragged {
            input_config.allow_ragged_rows = true;
        }
        input_config.validate().map_err(CsvError::configuration)?;

        let mut output_config = input_config.clone();
        if let Some(delimiter) = &args.output_delimiter {
            output_config.delimiter = parse_delimiter(delimiter)?;
        }
        if args.always_quote {
            output_config.quote_strategy = QuoteStrategy::Always;
        }
        output_config.validate().map_err(CsvError::configuration)?;

        Ok(Self {
            args,
            input_config,
            output_config,
        })
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.args.quiet
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.args.verbose
    }

    /// Check if stats output is requested
    pub fn want_stats(&self) -> bool {
        self.args.stats
    }

    /// Check if only validation is requested
    pub fn is_validate_only(&self) -> bool {
        self.args.validate_only
    }

    /// Where records are read from
    pub fn source(&self) -> CsvResult<CsvSource> {
        if self.args.stdin {
            return Ok(CsvSource::Stdin);
        }
        match &self.args.input {
            Some(path) => {
                let source = CsvSource::from_file(path);
                if !source.exists() {
                    return Err(CsvError::configuration(format!(
                        "Input path does not exist: {}",
                        path.display()
                    )));
                }
                Ok(source)
            }
            None => Err(CsvError::configuration(
                "No input provided. Use --stdin or provide an input path",
            )),
        }
    }

    /// Get output destination description
    pub fn output_description(&self) -> String {
        if let Some(output) = &self.args.output {
            format!("'{}'", output.display())
        } else {
            "standard output".to_string()
        }
    }

    fn open_sink(&self) -> CsvResult<Box<dyn Write>> {
        match &self.args.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Ok(Box::new(BufWriter::new(File::create(path)?)))
            }
            None => Ok(Box::new(BufWriter::new(io::stdout()))),
        }
    }
}

/// Read the input once and re-emit it as configured
pub fn run(config: &CliConfig) -> CsvResult<PassStatistics> {
    let started = Instant::now();
    let source = config.source()?;
    log::info!("reading {}", source.description());

    let mut stats = PassStatistics::new();
    stats.input_size_bytes = source.estimated_size();
    let mut reader = CsvReader::new(source.open()?, config.input_config.clone())?;

    if config.is_validate_only() {
        while let Some(record) = reader.read_raw_record()? {
            stats.record(&record);
        }
    } else if config.args.json {
        let mut sink = config.open_sink()?;
        let rows = json_rows(&mut reader, &mut stats)?;
        serde_json::to_writer_pretty(&mut sink, &JsonValue::Array(rows))
            .map_err(|e| CsvError::Other(e.into()))?;
        writeln!(sink)?;
        sink.flush()?;
    } else {
        let sink = config.open_sink()?;
        let mut writer = CsvWriter::new(sink, config.output_config.clone())?;
        let mut header_pending = config.input_config.has_header_record;
        while let Some(record) = reader.read_raw_record()? {
            if header_pending {
                write_row(&mut writer, reader.header().unwrap_or_default())?;
                header_pending = false;
            }
            write_row(&mut writer, &record)?;
            stats.record(&record);
        }
        // header-only input
        if header_pending {
            if let Some(header) = reader.header() {
                write_row(&mut writer, header)?;
            }
        }
        writer.close()?;
        log::info!("wrote {} records to {}", stats.records, config.output_description());
    }

    stats.finish(reader.raw_row(), started.elapsed());
    Ok(stats)
}

fn write_row<W: Write>(writer: &mut CsvWriter<W>, fields: &[String]) -> CsvResult<()> {
    for field in fields {
        writer.write_field(field)?;
    }
    writer.next_record()
}

fn json_rows<R: io::Read>(
    reader: &mut CsvReader<R>,
    stats: &mut PassStatistics,
) -> CsvResult<Vec<JsonValue>> {
    let mut rows = Vec::new();
    while let Some(record) = reader.read_raw_record()? {
        stats.record(&record);
        let row = match reader.header() {
            Some(header) => {
                let mut object = Map::new();
                for (index, value) in record.iter().enumerate() {
                    let key = header
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| format!("column{}", index + 1));
                    insert_cell(&mut object, key, JsonValue::String(value.clone()));
                }
                JsonValue::Object(object)
            }
            None => JsonValue::Array(record.into_iter().map(JsonValue::String).collect()),
        };
        rows.push(row);
    }
    Ok(rows)
}

/// Insert a cell; a repeated column name collects its cells into an array
fn insert_cell(object: &mut Map<String, JsonValue>, key: String, cell: JsonValue) {
    match object.get_mut(&key) {
        Some(JsonValue::Array(cells)) => cells.push(cell),
        Some(existing) => {
            let first = existing.take();
            *existing = JsonValue::Array(vec![first, cell]);
        }
        None => {
            object.insert(key, cell);
        }
    }
}

/// CLI utilities and helpers
pub struct CliUtils;

impl CliUtils {
    /// Format a file size in human-readable format
    pub fn format_file_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.1} {}", size, UNITS[unit_index])
        }
    }

    /// Format a duration in human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_millis = duration.as_millis();

        if total_millis < 1000 {
            format!("{}ms", total_millis)
        } else if total_millis < 60_000 {
            format!("{:.1}s", total_millis as f64 / 1000.0)
        } else {
            let minutes = total_millis / 60_000;
            let seconds = (total_millis % 60_000) / 1000;
            format!("{}m {}s", minutes, seconds)
        }
    }

    /// Show an error message
    pub fn show_error(message: &str) {
        eprintln!("✗ {}", message);
    }
}

/// Print statistics to stderr, keeping stdout for records
pub fn output_statistics(stats: &PassStatistics) {
    eprintln!("\nStatistics:");
    if let Some(size) = stats.input_size_bytes {
        eprintln!("Input size: {}", CliUtils::format_file_size(size));
    }
    eprintln!("Records: {}", stats.records);
    eprintln!("Fields: {} ({:.1} per record)", stats.fields, stats.average_width());
    eprintln!("Widest record: {} columns", stats.max_columns);
    eprintln!("Lines: {}", stats.lines);
    eprintln!(
        "Processing time: {}",
        CliUtils::format_duration(Duration::from_millis(stats.processing_time_ms))
    );
}

/// Handle CLI errors with user-friendly messages
pub fn handle_error(error: &CsvError) {
    CliUtils::show_error(&error.user_message());

    match error {
        CsvError::MalformedInput { message, .. } if message.contains("fields but found") => {
            eprintln!("\nTip: Use --allow-ragged to accept records of differing width");
        }
        CsvError::MalformedInput { .. } => {
            eprintln!("\nTip: Check --delimiter and --quote match the input");
        }
        CsvError::Configuration { .. } => {
            eprintln!("\nTip: Use --validate-only to check the input without writing");
        }
        _ => {}
    }

    eprintln!("\nTry 'csvmap --help' for usage information.");
}
