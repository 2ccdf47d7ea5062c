use super::coerce_to_string;
use crate::ast::number_to_json;
use crate::dialect::Builtin;
use crate::error::EvaluationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt::Write;

/// Applies an eagerly evaluated builtin. `name` is the spelling used in the
/// expression, for error messages.
pub(super) fn call(builtin: Builtin, name: &str, args: &[Value]) -> Result<Value, EvaluationError> {
    match builtin {
        Builtin::Upper => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(text(name, &args[0])?.to_uppercase()))
        }
        Builtin::Lower => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(text(name, &args[0])?.to_lowercase()))
        }
        Builtin::Capitalize => {
            arity(name, args, 1, 1)?;
            let s = text(name, &args[0])?;
            let mut chars = s.chars();
            let capitalized = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
            Ok(Value::String(capitalized))
        }
        Builtin::Trim => {
            arity(name, args, 1, 1)?;
            Ok(Value::String(text(name, &args[0])?.trim().to_string()))
        }
        Builtin::Length => {
            arity(name, args, 1, 1)?;
            match &args[0] {
                Value::String(s) => Ok(Value::from(s.chars().count())),
                Value::Array(items) => Ok(Value::from(items.len())),
                Value::Object(map) => Ok(Value::from(map.len())),
                other => Err(mismatch(name, "String or Array", other)),
            }
        }
        Builtin::Replace => {
            arity(name, args, 3, 3)?;
            let s = text(name, &args[0])?;
            let from = text(name, &args[1])?;
            let to = text(name, &args[2])?;
            if from.is_empty() {
                return Ok(Value::String(s));
            }
            Ok(Value::String(s.replace(&from, &to)))
        }
        Builtin::FormatDate => {
            arity(name, args, 2, 2)?;
            let date = parse_date(&args[0])?;
            let pattern = text(name, &args[1])?;
            format_date(&date, &pattern).map(Value::String)
        }
        Builtin::ParseDate => {
            arity(name, args, 1, 1)?;
            let date = parse_date(&args[0])?;
            Ok(Value::String(
                date.to_rfc3339_opts(SecondsFormat::Millis, true),
            ))
        }
        Builtin::Join => {
            arity(name, args, 1, 2)?;
            let items = array(name, &args[0])?;
            let separator = match args.get(1) {
                Some(sep) => text(name, sep)?,
                None => ",".to_string(),
            };
            let joined = items
                .iter()
                .map(coerce_to_string)
                .collect::<Vec<_>>()
                .join(&separator);
            Ok(Value::String(joined))
        }
        Builtin::First | Builtin::Last => {
            arity(name, args, 1, 1)?;
            let first = builtin == Builtin::First;
            match &args[0] {
                Value::Array(items) => {
                    let item = if first { items.first() } else { items.last() };
                    Ok(item.cloned().unwrap_or(Value::Null))
                }
                Value::String(s) => {
                    let c = if first { s.chars().next() } else { s.chars().last() };
                    Ok(c.map(|c| Value::String(c.to_string())).unwrap_or(Value::Null))
                }
                other => Err(mismatch(name, "Array", other)),
            }
        }
        Builtin::Contains => {
            arity(name, args, 2, 2)?;
            let found = match (&args[0], &args[1]) {
                (Value::Array(items), needle) => items.contains(needle),
                (Value::String(s), needle) => s.contains(&coerce_to_string(needle)),
                (Value::Object(map), Value::String(key)) => map.contains_key(key),
                (other, _) => return Err(mismatch(name, "Array or String", other)),
            };
            Ok(Value::Bool(found))
        }
        Builtin::Round => {
            arity(name, args, 1, 2)?;
            let n = number(name, &args[0])?;
            let digits = match args.get(1) {
                Some(d) => number(name, d)?.clamp(0.0, 15.0) as i32,
                None => 0,
            };
            let factor = 10f64.powi(digits);
            Ok(number_to_json((n * factor).round() / factor))
        }
        // Conditionals are evaluated lazily by the engine.
        Builtin::If => Err(EvaluationError::UnknownFunction(name.to_string())),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvaluationError> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{} to {}", min, max)
    };
    Err(EvaluationError::ArityMismatch {
        function: name.to_string(),
        expected,
        found: args.len(),
    })
}

fn mismatch(name: &str, expected: &str, found: &Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operation: name.to_string(),
        expected: expected.to_string(),
        found: found.clone(),
    }
}

/// Strings, numbers and booleans all read as text; containers do not.
fn text(name: &str, value: &Value) -> Result<String, EvaluationError> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(coerce_to_string(value)),
        other => Err(mismatch(name, "String", other)),
    }
}

fn number(name: &str, value: &Value) -> Result<f64, EvaluationError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| mismatch(name, "Number", value)),
        Value::String(s) => s.trim().parse().map_err(|_| mismatch(name, "Number", value)),
        other => Err(mismatch(name, "Number", other)),
    }
}

fn array<'v>(name: &str, value: &'v Value) -> Result<&'v Vec<Value>, EvaluationError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(mismatch(name, "Array", other)),
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD` dates, naive date-times and
/// epoch milliseconds.
pub(super) fn parse_date(value: &Value) -> Result<DateTime<Utc>, EvaluationError> {
    let invalid = || EvaluationError::InvalidDate(coerce_to_string(value));
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Ok(naive.and_utc());
                }
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|d| d.and_utc()).ok_or_else(invalid);
            }
            s.parse::<i64>()
                .ok()
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Moment/Luxon tokens and their strftime equivalents, longest first.
const DATE_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("yyyy", "%Y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("SSS", "%3f"),
    ("YY", "%y"),
    ("yy", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("A", "%p"),
];

/// Formats a date with a Moment/Luxon style pattern. Text inside `[...]` is
/// copied literally.
pub(super) fn format_date(date: &DateTime<Utc>, pattern: &str) -> Result<String, EvaluationError> {
    let mut strftime = String::new();
    let mut rest = pattern;

    'scan: while !rest.is_empty() {
        if let Some(escaped) = rest.strip_prefix('[') {
            let end = escaped.find(']').unwrap_or(escaped.len());
            push_literal(&mut strftime, &escaped[..end]);
            rest = escaped.get(end + 1..).unwrap_or("");
            continue;
        }
        for (token, directive) in DATE_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                strftime.push_str(directive);
                rest = after;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            push_literal(&mut strftime, c.encode_utf8(&mut [0; 4]));
        }
        rest = chars.as_str();
    }

    let mut out = String::new();
    write!(out, "{}", date.format(&strftime))
        .map_err(|_| EvaluationError::InvalidDate(pattern.to_string()))?;
    Ok(out)
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

