//! Type converters between raw field text and values

use super::number;
use super::options::{DateTimeStyles, NumberStyles, TypeConverterOptions};
use super::value::{EnumInfo, FloatKind, Value, ValueKind};
use crate::error::{CsvError, CsvResult, FieldPosition};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use std::any::TypeId;
use std::fmt::Write as _;

/// Everything a converter knows about the field it is converting
#[derive(Debug, Clone)]
pub struct FieldContext<'a> {
    /// Kind of the member being converted
    pub kind: &'a ValueKind,
    /// Declared type of the member
    pub type_id: TypeId,
    /// Wrapped type when the member is `Option<T>`
    pub inner_type_id: Option<TypeId>,
    /// Options after merging global, per-type and member levels
    pub options: &'a TypeConverterOptions,
    pub position: FieldPosition,
}

impl<'a> FieldContext<'a> {
    pub fn new(
        kind: &'a ValueKind,
        type_id: TypeId,
        options: &'a TypeConverterOptions,
        position: FieldPosition,
    ) -> Self {
        Self {
            kind,
            type_id,
            inner_type_id: None,
            options,
            position,
        }
    }

    pub fn with_inner_type(mut self, inner: Option<TypeId>) -> Self {
        self.inner_type_id = inner;
        self
    }

    /// Conversion failure for `text` at this field
    pub fn conversion_error(&self, text: &str, reason: impl Into<String>) -> CsvError {
        CsvError::conversion(text, self.kind.type_name(), self.position.clone(), reason)
    }
}

/// Converts between field text and a `Value`
pub trait TypeConverter: Send + Sync {
    fn convert_from_string(&self, text: &str, field: &FieldContext<'_>) -> CsvResult<Value>;

    fn convert_to_string(&self, value: &Value, field: &FieldContext<'_>) -> CsvResult<String>;
}

/// Converter assembled from a pair of closures
pub struct FnConverter<R, W> {
    read: R,
    write: W,
}

/// Build a converter from read and write closures that report failures as
/// plain messages
pub fn converter_fn<R, W>(read: R, write: W) -> FnConverter<R, W>
where
    R: Fn(&str) -> Result<Value, String> + Send + Sync,
    W: Fn(&Value) -> Result<String, String> + Send + Sync,
{
    FnConverter { read, write }
}

impl<R, W> TypeConverter for FnConverter<R, W>
where
    R: Fn(&str) -> Result<Value, String> + Send + Sync,
    W: Fn(&Value) -> Result<String, String> + Send + Sync,
{
    fn convert_from_string(&self, text: &str, field: &FieldContext<'_>) -> CsvResult<Value> {
        (self.read)(text).map_err(|reason| field.conversion_error(text, reason))
    }

    fn convert_to_string(&self, value: &Value, field: &FieldContext<'_>) -> CsvResult<String> {
        (self.write)(value)
            .map_err(|reason| field.conversion_error(&format!("{:?}", value), reason))
    }
}

/// Converter for every built-in `ValueKind`
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl TypeConverter for BuiltinConverter {
    fn convert_from_string(&self, text: &str, field: &FieldContext<'_>) -> CsvResult<Value> {
        from_kind(text, field.kind, field)
    }

    fn convert_to_string(&self, value: &Value, field: &FieldContext<'_>) -> CsvResult<String> {
        to_kind(value, field.kind, field)
    }
}

fn from_kind(text: &str, kind: &ValueKind, field: &FieldContext<'_>) -> CsvResult<Value> {
    let options = field.options;
    let culture = options.culture();
    let result = match kind {
        ValueKind::Text => Ok(Value::Text(text.to_string())),
        ValueKind::Boolean => parse_bool(text, options),
        ValueKind::Integer(int_kind) => number::parse_integer(
            text,
            *int_kind,
            options.number_style.unwrap_or(NumberStyles::INTEGER),
            &culture,
        ),
        ValueKind::Float(float_kind) => number::parse_float(
            text,
            *float_kind,
            options
                .number_style
                .unwrap_or(NumberStyles::FLOAT | NumberStyles::ALLOW_THOUSANDS),
            &culture,
        ),
        ValueKind::Char => parse_char(text),
        ValueKind::Date => parse_date(text, options).map(Value::Date),
        ValueKind::Time => parse_time(text, options).map(Value::Time),
        ValueKind::DateTime => parse_date_time(text, options).map(Value::DateTime),
        ValueKind::DateTimeOffset => {
            parse_date_time_offset(text, options).map(Value::DateTimeOffset)
        }
        ValueKind::Duration => parse_duration(text).map(Value::Duration),
        ValueKind::Enum(info) => parse_enum(text, info, options.enum_ignore_case.unwrap_or(false)),
        ValueKind::Nullable(inner) => {
            if text.trim().is_empty() {
                Ok(Value::Null)
            } else {
                return from_kind(text, inner, field);
            }
        }
        ValueKind::Collection(_) => Err("collections are read one column per element".to_string()),
        ValueKind::Custom { type_name, .. } => {
            Err(format!("no type converter is registered for {}", type_name))
        }
    };
    result.map_err(|reason| field.conversion_error(text, reason))
}

fn to_kind(value: &Value, kind: &ValueKind, field: &FieldContext<'_>) -> CsvResult<String> {
    let options = field.options;
    let culture = options.culture();
    let fail = |reason: String| field.conversion_error(&format!("{:?}", value), reason);

    match (value, kind.underlying()) {
        (Value::Null, _) => Ok(String::new()),
        (Value::Bool(b), _) => Ok(format_bool(*b, options)),
        (Value::Int(_) | Value::UInt(_), ValueKind::Enum(info)) => {
            let ordinal = match value {
                Value::Int(v) => usize::try_from(*v).ok(),
                Value::UInt(v) => usize::try_from(*v).ok(),
                _ => None,
            };
            ordinal
                .and_then(|i| info.variants.get(i))
                .map(|name| name.to_string())
                .ok_or_else(|| fail(format!("{} has no variant {:?}", info.name, value)))
        }
        (Value::Int(_) | Value::UInt(_) | Value::Float(_), underlying) => {
            let single = matches!(underlying, ValueKind::Float(FloatKind::F32));
            number::format_number(value, options.first_format(), single, &culture).map_err(fail)
        }
        (Value::Char(c), _) => Ok(c.to_string()),
        (Value::Text(s), _) => Ok(s.clone()),
        (Value::Date(d), _) => format_chrono(options.first_format(), "%Y-%m-%d", |f| d.format(f))
            .map_err(fail),
        (Value::Time(t), _) => {
            format_chrono(options.first_format(), "%H:%M:%S%.f", |f| t.format(f)).map_err(fail)
        }
        (Value::DateTime(dt), _) => {
            format_chrono(options.first_format(), "%Y-%m-%dT%H:%M:%S%.f", |f| dt.format(f))
                .map_err(fail)
        }
        (Value::DateTimeOffset(dt), _) => match options.first_format() {
            Some(_) => format_chrono(options.first_format(), "", |f| dt.format(f)).map_err(fail),
            None => Ok(dt.to_rfc3339()),
        },
        (Value::Duration(d), _) => Ok(format_duration(*d)),
        (Value::List(_), _) => Err(fail(
            "collections are written one column per element".to_string(),
        )),
        (Value::Custom(_), _) => Err(fail(format!(
            "no type converter is registered for {}",
            kind.type_name()
        ))),
    }
}

fn format_chrono<'a, F, D>(
    format: Option<&'a str>,
    default: &'a str,
    render: F,
) -> Result<String, String>
where
    F: Fn(&'a str) -> D,
    D: std::fmt::Display,
{
    let pattern = format.unwrap_or(default);
    let mut out = String::new();
    write!(out, "{}", render(pattern)).map_err(|_| format!("invalid format string '{}'", pattern))?;
    Ok(out)
}

fn parse_bool(text: &str, options: &TypeConverterOptions) -> Result<Value, String> {
    let trimmed = text.trim();
    let matches = |tokens: &[String]| tokens.iter().any(|t| t.eq_ignore_ascii_case(trimmed));
    if matches(&options.boolean_true_values) {
        return Ok(Value::Bool(true));
    }
    if matches(&options.boolean_false_values) {
        return Ok(Value::Bool(false));
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        Ok(Value::Bool(true))
    } else if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        Ok(Value::Bool(false))
    } else {
        Err("not a boolean".to_string())
    }
}

fn format_bool(value: bool, options: &TypeConverterOptions) -> String {
    let tokens = if value {
        &options.boolean_true_values
    } else {
        &options.boolean_false_values
    };
    tokens
        .first()
        .cloned()
        .unwrap_or_else(|| value.to_string())
}

fn parse_char(text: &str) -> Result<Value, String> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => {
            let mut trimmed = text.trim().chars();
            match (trimmed.next(), trimmed.next()) {
                (Some(c), None) => Ok(Value::Char(c)),
                _ => Err("expected exactly one character".to_string()),
            }
        }
    }
}

fn parse_enum(text: &str, info: &EnumInfo, ignore_case: bool) -> Result<Value, String> {
    let trimmed = text.trim();
    let found = info.variants.iter().find(|variant| {
        if ignore_case {
            variant.eq_ignore_ascii_case(trimmed)
        } else {
            **variant == trimmed
        }
    });
    if let Some(variant) = found {
        return Ok(Value::Text(variant.to_string()));
    }
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(|ordinal| info.variants.get(ordinal))
        .map(|variant| Value::Text(variant.to_string()))
        .ok_or_else(|| format!("'{}' is not a variant of {}", trimmed, info.name))
}

fn date_text<'a>(text: &'a str, options: &TypeConverterOptions) -> Result<&'a str, String> {
    let styles = options
        .date_time_style
        .unwrap_or(DateTimeStyles::ALLOW_WHITE_SPACES);
    let mut s = text;
    if styles.contains(DateTimeStyles::ALLOW_LEADING_WHITE) {
        s = s.trim_start();
    }
    if styles.contains(DateTimeStyles::ALLOW_TRAILING_WHITE) {
        s = s.trim_end();
    }
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        return Err("whitespace is not allowed".to_string());
    }
    Ok(s)
}

fn parse_date(text: &str, options: &TypeConverterOptions) -> Result<NaiveDate, String> {
    let s = date_text(text, options)?;
    for format in options.formats() {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Ok(date);
    }
    NaiveDate::parse_from_str(s, &options.culture().short_date_pattern)
        .map_err(|e| format!("not a date: {}", e))
}

fn parse_time(text: &str, options: &TypeConverterOptions) -> Result<NaiveTime, String> {
    let s = date_text(text, options)?;
    for format in options.formats() {
        if let Ok(time) = NaiveTime::parse_from_str(s, format) {
            return Ok(time);
        }
    }
    if let Ok(time) = s.parse::<NaiveTime>() {
        return Ok(time);
    }
    NaiveTime::parse_from_str(s, &options.culture().long_time_pattern)
        .map_err(|e| format!("not a time: {}", e))
}

fn parse_date_time(text: &str, options: &TypeConverterOptions) -> Result<NaiveDateTime, String> {
    let s = date_text(text, options)?;
    let styles = options.date_time_style.unwrap_or_default();
    for format in options.formats() {
        if let Ok(value) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(value);
        }
    }
    if let Ok(value) = s.parse::<NaiveDateTime>() {
        return Ok(value);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(value);
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(s) {
        return Ok(if styles.contains(DateTimeStyles::ADJUST_TO_UNIVERSAL) {
            value.naive_utc()
        } else {
            value.naive_local()
        });
    }
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    let culture = options.culture();
    let pattern = format!("{} {}", culture.short_date_pattern, culture.long_time_pattern);
    if let Ok(value) = NaiveDateTime::parse_from_str(s, &pattern) {
        return Ok(value);
    }
    NaiveDate::parse_from_str(s, &culture.short_date_pattern)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|e| format!("not a date and time: {}", e))
}

fn parse_date_time_offset(
    text: &str,
    options: &TypeConverterOptions,
) -> Result<DateTime<FixedOffset>, String> {
    let s = date_text(text, options)?;
    let styles = options.date_time_style.unwrap_or_default();
    let adjust = |value: DateTime<FixedOffset>| {
        if styles.contains(DateTimeStyles::ADJUST_TO_UNIVERSAL) {
            value.with_timezone(&Utc.fix())
        } else {
            value
        }
    };

    for format in options.formats() {
        if let Ok(value) = DateTime::parse_from_str(s, format) {
            return Ok(adjust(value));
        }
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(s) {
        return Ok(adjust(value));
    }
    if let Ok(value) = s.parse::<DateTime<FixedOffset>>() {
        return Ok(adjust(value));
    }

    // text without an offset is taken as UTC
    let naive_options = TypeConverterOptions {
        date_time_style: Some(styles | DateTimeStyles::ALLOW_WHITE_SPACES),
        ..options.clone()
    };
    let naive = parse_date_time(s, &naive_options)?;
    Ok(Utc.fix().from_utc_datetime(&naive))
}

/// Parse `[-][d.]hh:mm[:ss[.fffffff]]`, or a whole number of days
fn parse_duration(text: &str) -> Result<TimeDelta, String> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let invalid = || format!("'{}' is not a duration", trimmed);

    let parse_part = |part: &str| -> Result<i64, String> {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        part.parse::<i64>().map_err(|_| invalid())
    };

    let total = if !body.contains(':') {
        TimeDelta::try_days(parse_part(body)?).ok_or_else(invalid)?
    } else {
        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid());
        }

        let (days, hours) = match parts[0].split_once('.') {
            Some((d, h)) => (parse_part(d)?, parse_part(h)?),
            None => (0, parse_part(parts[0])?),
        };
        let minutes = parse_part(parts[1])?;
        let (seconds, nanos) = match parts.get(2) {
            None => (0, 0),
            Some(sec) => match sec.split_once('.') {
                None => (parse_part(sec)?, 0),
                Some((whole, fraction)) => {
                    if fraction.len() > 9 {
                        return Err(invalid());
                    }
                    let scaled = parse_part(fraction)? * 10i64.pow(9 - fraction.len() as u32);
                    (parse_part(whole)?, scaled)
                }
            },
        };
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(invalid());
        }

        TimeDelta::try_days(days)
            .and_then(|d| d.checked_add(&TimeDelta::try_hours(hours)?))
            .and_then(|d| d.checked_add(&TimeDelta::try_minutes(minutes)?))
            .and_then(|d| d.checked_add(&TimeDelta::try_seconds(seconds)?))
            .and_then(|d| d.checked_add(&TimeDelta::nanoseconds(nanos)))
            .ok_or_else(invalid)?
    };

    Ok(if negative { -total } else { total })
}

fn format_duration(value: TimeDelta) -> String {
    let negative = value < TimeDelta::zero();
    let abs = value.abs();
    let total_seconds = abs.num_seconds();
    let nanos = abs.subsec_nanos();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    if days > 0 {
        let _ = write!(out, "{}.", days);
    }
    let _ = write!(out, "{:02}:{:02}:{:02}", hours, minutes, seconds);
    if nanos > 0 {
        let _ = write!(out, ".{:07}", nanos / 100);
    }
    out
}
