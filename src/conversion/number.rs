//! Culture-aware number parsing and formatting

use super::options::NumberStyles;
use super::value::{FloatKind, IntKind, Value};
use crate::config::Culture;

/// Canonical form of a parsed number
#[derive(Debug, Clone, PartialEq)]
enum NumberText {
    /// Optional `-`, digits, optional `.digits`, optional `e[+-]digits`
    Decimal(String),
    Hex(String),
}

fn strip_whitespace<'a>(text: &'a str, styles: NumberStyles) -> Result<&'a str, String> {
    let mut s = text;
    if styles.contains(NumberStyles::ALLOW_LEADING_WHITE) {
        s = s.trim_start();
    }
    if styles.contains(NumberStyles::ALLOW_TRAILING_WHITE) {
        s = s.trim_end();
    }
    if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
        return Err("whitespace is not allowed".to_string());
    }
    Ok(s)
}

/// Rewrite `text` into a form Rust's parsers accept, honoring `styles` and
/// the culture's separators
fn normalize(text: &str, styles: NumberStyles, culture: &Culture) -> Result<NumberText, String> {
    let mut s = strip_whitespace(text, styles)?;
    if s.is_empty() {
        return Err("no digits".to_string());
    }

    if styles.contains(NumberStyles::ALLOW_HEX_SPECIFIER) {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("invalid hexadecimal digits".to_string());
        }
        return Ok(NumberText::Hex(digits.to_string()));
    }

    let mut negative = false;
    if styles.contains(NumberStyles::ALLOW_PARENTHESES) && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].trim();
    }

    let currency = culture.currency_symbol.as_str();
    let allow_currency =
        styles.contains(NumberStyles::ALLOW_CURRENCY_SYMBOL) && !currency.is_empty();
    if allow_currency {
        if let Some(rest) = s.strip_prefix(currency) {
            s = rest.trim_start();
        }
    }

    if styles.contains(NumberStyles::ALLOW_LEADING_SIGN) {
        if let Some(rest) = s.strip_prefix('-') {
            negative = !negative;
            s = rest;
        } else if let Some(rest) = s.strip_prefix('+') {
            s = rest;
        }
    }

    if allow_currency {
        if let Some(rest) = s.strip_prefix(currency) {
            s = rest.trim_start();
        }
        if let Some(rest) = s.strip_suffix(currency) {
            s = rest.trim_end();
        }
    }

    if styles.contains(NumberStyles::ALLOW_TRAILING_SIGN) {
        if let Some(rest) = s.strip_suffix('-') {
            negative = !negative;
            s = rest;
        } else if let Some(rest) = s.strip_suffix('+') {
            s = rest;
        }
    }

    let mut out = String::with_capacity(s.len() + 1);
    if negative {
        out.push('-');
    }

    let mut digits = 0;
    let mut seen_point = false;
    let mut in_exponent = false;
    let mut exponent_digits = 0;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            out.push(c);
            if in_exponent {
                exponent_digits += 1;
            } else {
                digits += 1;
            }
        } else if !in_exponent
            && !seen_point
            && c == culture.decimal_separator
            && styles.contains(NumberStyles::ALLOW_DECIMAL_POINT)
        {
            seen_point = true;
            out.push('.');
        } else if !in_exponent
            && !seen_point
            && digits > 0
            && culture.is_group_separator(c)
            && styles.contains(NumberStyles::ALLOW_THOUSANDS)
        {
            continue;
        } else if !in_exponent
            && digits > 0
            && (c == 'e' || c == 'E')
            && styles.contains(NumberStyles::ALLOW_EXPONENT)
        {
            in_exponent = true;
            out.push('e');
            if let Some(&sign) = chars.peek() {
                if sign == '+' || sign == '-' {
                    out.push(sign);
                    chars.next();
                }
            }
        } else {
            return Err(format!("unexpected character '{}'", c));
        }
    }

    if digits == 0 {
        return Err("no digits".to_string());
    }
    if in_exponent && exponent_digits == 0 {
        return Err("exponent has no digits".to_string());
    }
    Ok(NumberText::Decimal(out))
}

/// Parse an integer of the given width
pub fn parse_integer(
    text: &str,
    kind: IntKind,
    styles: NumberStyles,
    culture: &Culture,
) -> Result<Value, String> {
    let parsed: i128 = match normalize(text, styles, culture)? {
        NumberText::Hex(digits) => {
            let raw = u64::from_str_radix(&digits, 16).map_err(|e| e.to_string())?;
            raw as i128
        }
        NumberText::Decimal(canonical) if canonical.contains(['.', 'e']) => {
            let float: f64 = canonical.parse().map_err(|_| "invalid number".to_string())?;
            if float.fract() != 0.0 {
                return Err("value has a fractional part".to_string());
            }
            if !float.is_finite() || float.abs() > i128::MAX as f64 {
                return Err("value is out of range".to_string());
            }
            float as i128
        }
        NumberText::Decimal(canonical) => canonical
            .parse::<i128>()
            .map_err(|_| "value is out of range".to_string())?,
    };

    let (min, max) = kind.bounds();
    if parsed < min || parsed > max {
        return Err(format!("value is out of range for {}", kind.name()));
    }
    if kind.is_signed() {
        Ok(Value::Int(parsed as i64))
    } else {
        Ok(Value::UInt(parsed as u64))
    }
}

/// Parse a floating point number
pub fn parse_float(
    text: &str,
    kind: FloatKind,
    styles: NumberStyles,
    culture: &Culture,
) -> Result<Value, String> {
    let trimmed = text.trim();
    let special = match trimmed {
        "NaN" => Some(f64::NAN),
        "Infinity" | "∞" => Some(f64::INFINITY),
        "-Infinity" | "-∞" => Some(f64::NEG_INFINITY),
        _ => None,
    };

    let parsed = match special {
        Some(value) => value,
        None => match normalize(text, styles, culture)? {
            NumberText::Decimal(canonical) => canonical
                .parse::<f64>()
                .map_err(|_| "invalid number".to_string())?,
            NumberText::Hex(_) => {
                return Err("hexadecimal is not allowed for floating point".to_string())
            }
        },
    };

    match kind {
        FloatKind::F64 => Ok(Value::Float(parsed)),
        FloatKind::F32 => {
            if parsed.is_finite() && parsed.abs() > f32::MAX as f64 {
                return Err("value is out of range for f32".to_string());
            }
            Ok(Value::Float(parsed as f32 as f64))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

/// Format a numeric value with an optional format string.
///
/// Supported formats: `N[n]` grouped fixed point, `F[n]` fixed point,
/// `D[n]` zero padded integer, `X[n]`/`x[n]` hexadecimal, `E[n]`
/// scientific, `G` general, and `#,##0.00` style patterns with an optional
/// literal prefix/suffix (a `%` suffix scales by 100).
pub fn format_number(
    value: &Value,
    format: Option<&str>,
    single_precision: bool,
    culture: &Culture,
) -> Result<String, String> {
    let number = match value {
        Value::Int(v) => Number::Int(*v as i128),
        Value::UInt(v) => Number::Int(*v as i128),
        Value::Float(v) => Number::Float(*v),
        other => return Err(format!("cannot format {:?} as a number", other)),
    };

    let format = match format {
        Some(f) if !f.is_empty() => f,
        _ => return Ok(general(number, single_precision, culture)),
    };

    let mut chars = format.chars();
    let specifier = chars.next().unwrap_or('G');
    let precision_text = chars.as_str();
    let is_standard = precision_text.chars().all(|c| c.is_ascii_digit())
        && specifier.is_ascii_alphabetic();

    if !is_standard {
        return format_pattern(number, format, culture);
    }

    let precision = if precision_text.is_empty() {
        None
    } else {
        Some(
            precision_text
                .parse::<usize>()
                .map_err(|_| format!("invalid precision in '{}'", format))?,
        )
    };

    match specifier {
        'G' | 'g' => Ok(general(number, single_precision, culture)),
        'F' | 'f' => Ok(fixed(number.as_f64(), precision.unwrap_or(2), None, culture)),
        'N' | 'n' => Ok(fixed(
            number.as_f64(),
            precision.unwrap_or(2),
            Some(culture.group_separator),
            culture,
        )),
        'D' | 'd' => match number {
            Number::Int(v) => {
                let width = precision.unwrap_or(1);
                let digits = format!("{:0width$}", v.unsigned_abs(), width = width);
                Ok(if v < 0 { format!("-{}", digits) } else { digits })
            }
            Number::Float(_) => Err("format 'D' requires an integer".to_string()),
        },
        'X' | 'x' => match number {
            Number::Int(v) => {
                let width = precision.unwrap_or(1);
                let raw = if v < 0 { (v as i64) as u64 } else { v as u64 };
                Ok(if specifier == 'X' {
                    format!("{:0width$X}", raw, width = width)
                } else {
                    format!("{:0width$x}", raw, width = width)
                })
            }
            Number::Float(_) => Err("format 'X' requires an integer".to_string()),
        },
        'E' | 'e' => {
            let text = format!("{:.*e}", precision.unwrap_or(6), number.as_f64());
            let text = if specifier == 'E' { text.to_uppercase() } else { text };
            Ok(localize_point(&text, culture))
        }
        _ => Err(format!("unsupported number format '{}'", format)),
    }
}

fn general(number: Number, single_precision: bool, culture: &Culture) -> String {
    match number {
        Number::Int(v) => v.to_string(),
        Number::Float(v) if v.is_nan() => "NaN".to_string(),
        Number::Float(v) if v.is_infinite() => {
            if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        }
        Number::Float(v) => {
            let text = if single_precision {
                (v as f32).to_string()
            } else {
                v.to_string()
            };
            localize_point(&text, culture)
        }
    }
}

fn localize_point(text: &str, culture: &Culture) -> String {
    if culture.decimal_separator == '.' {
        text.to_string()
    } else {
        text.replace('.', &culture.decimal_separator.to_string())
    }
}

fn fixed(value: f64, decimals: usize, group: Option<char>, culture: &Culture) -> String {
    let text = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (text, None),
    };
    let int_part = match group {
        Some(separator) => group_digits(&int_part, separator),
        None => int_part,
    };

    let mut out = String::new();
    let is_zero = int_part.chars().all(|c| !c.is_ascii_digit() || c == '0')
        && frac_part.as_deref().map_or(true, |f| f.chars().all(|c| c == '0'));
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    out.push_str(&int_part);
    if let Some(frac) = frac_part {
        out.push(culture.decimal_separator);
        out.push_str(&frac);
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// `#,##0.00` style pattern
fn format_pattern(number: Number, pattern: &str, culture: &Culture) -> Result<String, String> {
    let is_placeholder = |c: char| matches!(c, '#' | '0' | ',' | '.');
    let start = pattern
        .find(|c: char| c == '#' || c == '0')
        .ok_or_else(|| format!("unsupported number format '{}'", pattern))?;
    let end = pattern
        .rfind(|c: char| c == '#' || c == '0')
        .map(|i| i + 1)
        .unwrap_or(start);
    let prefix = &pattern[..start];
    let body = &pattern[start..end];
    let suffix = &pattern[end..];
    if !body.chars().all(is_placeholder) {
        return Err(format!("unsupported number format '{}'", pattern));
    }

    let (int_pattern, frac_pattern) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    let grouped = int_pattern.contains(',');
    let min_int_digits = int_pattern.chars().filter(|c| *c == '0').count();
    let min_decimals = frac_pattern.chars().filter(|c| *c == '0').count();
    let max_decimals = frac_pattern.chars().filter(|c| *c == '0' || *c == '#').count();

    let mut value = number.as_f64();
    if suffix.contains('%') {
        value *= 100.0;
    }

    let text = format!("{:.*}", max_decimals, value.abs());
    let (int_digits, frac_digits) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (text, String::new()),
    };

    let mut frac_digits = frac_digits;
    while frac_digits.len() > min_decimals && frac_digits.ends_with('0') {
        frac_digits.pop();
    }

    let mut int_digits = int_digits.trim_start_matches('0').to_string();
    while int_digits.len() < min_int_digits {
        int_digits.insert(0, '0');
    }
    if grouped {
        int_digits = group_digits(&int_digits, culture.group_separator);
    }

    let mut out = String::from(prefix);
    let is_zero = int_digits.chars().all(|c| !c.is_ascii_digit() || c == '0')
        && frac_digits.chars().all(|c| c == '0');
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    out.push_str(&int_digits);
    if !frac_digits.is_empty() {
        out.push(culture.decimal_separator);
        out.push_str(&frac_digits);
    }
    out.push_str(suffix);
    Ok(out)
}
