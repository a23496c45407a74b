// src/core/datetime.rs

//! `$datetime()` formatting.
//!
//! A format is a predefined name (`date`, `time_full`, ...), a strftime pattern
//! when it contains `%` (`%H:%M`), or otherwise a letter pattern in the
//! `yyyy-MM-dd HH:mm` style. Text in single quotes is copied as is and `''` is
//! a quote.

use chrono::{
    DateTime, Local, Locale, TimeZone, Utc,
    format::{Item, StrftimeItems},
};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use std::{collections::HashMap, fmt, fmt::Write};
use thiserror::Error;

/// Format used when `$datetime()` is given no format.
const DEFAULT_FORMAT: &str = "datetime";

lazy_static! {
    /// Predefined format names and the strftime patterns they stand for.
    static ref NAMED_FORMATS: HashMap<&'static str, &'static str> = HashMap::from([
        ("date", "%Y-%m-%d"),
        ("time", "%H:%M:%S"),
        ("datetime", "%Y-%m-%d %H:%M:%S"),
        ("date_tz", "%Y-%m-%d %Z (%:z)"),
        ("time_tz", "%H:%M:%S %Z (%:z)"),
        ("datetime_tz", "%Y-%m-%d %H:%M:%S %Z (%:z)"),
        ("date_short", "%x"),
        ("date_medium", "%e %b %Y"),
        ("date_long", "%e %B %Y"),
        ("date_full", "%A, %e %B %Y"),
        ("time_short", "%H:%M"),
        ("time_medium", "%X"),
        ("time_long", "%X %Z"),
        ("time_full", "%X %Z (%:z)"),
        ("datetime_short", "%x %H:%M"),
        ("datetime_medium", "%e %b %Y %X"),
        ("datetime_long", "%e %B %Y %X %Z"),
        ("datetime_full", "%A, %e %B %Y %X %Z (%:z)"),
    ]);
}

/// Failures of `$datetime()`. The message is the function's output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    /// The pattern contains an invalid specifier.
    #[error("Invalid time format ({0})")]
    InvalidFormat(String),
    /// No zone matches the given name.
    #[error("Invalid timezone")]
    InvalidTimezone,
    /// The timestamp is not an integer of epoch milliseconds.
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    /// Formatting failed for any other reason.
    #[error("Time format error")]
    Format,
}

/// Formats a point in time. Empty arguments fall back to their defaults: the
/// `datetime` format, the local zone, the POSIX locale and the current time.
pub fn format_datetime(format: &str, zone: &str, locale: &str, timestamp: &str) -> String {
    try_format(format, zone, locale, timestamp).unwrap_or_else(|e| e.to_string())
}

fn try_format(
    format: &str,
    zone: &str,
    locale: &str,
    timestamp: &str,
) -> Result<String, DateTimeError> {
    let format = if format.is_empty() { DEFAULT_FORMAT } else { format };
    let pattern = match NAMED_FORMATS.get(format) {
        Some(named) => named.to_string(),
        None if format.contains('%') => format.to_string(),
        None => letter_pattern_to_strftime(format)
            .ok_or_else(|| DateTimeError::InvalidFormat(format.to_string()))?,
    };
    let pattern = pattern.as_str();
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(DateTimeError::InvalidFormat(format.to_string()));
    }

    let locale = if locale.is_empty() {
        Locale::POSIX
    } else {
        find_locale(locale)
    };

    let instant = if timestamp.is_empty() {
        Utc::now()
    } else {
        timestamp
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or(DateTimeError::InvalidTimestamp)?
    };

    if zone.is_empty() {
        render(&instant.with_timezone(&Local), pattern, locale)
    } else {
        let tz = find_zone(zone).ok_or(DateTimeError::InvalidTimezone)?;
        render(&instant.with_timezone(&tz), pattern, locale)
    }
}

fn render<Z: TimeZone>(
    time: &DateTime<Z>,
    pattern: &str,
    locale: Locale,
) -> Result<String, DateTimeError>
where
    Z::Offset: fmt::Display,
{
    let mut output = String::new();
    write!(output, "{}", time.format_localized(pattern, locale))
        .map_err(|_| DateTimeError::Format)?;
    Ok(output)
}

/// Translates a `yyyy-MM-dd HH:mm:ss` style pattern. `None` on an unknown letter.
fn letter_pattern_to_strftime(pattern: &str) -> Option<String> {
    let mut output = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                output.push('\'');
                continue;
            }
            while let Some(quoted) = chars.next() {
                if quoted == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        output.push('\'');
                        continue;
                    }
                    break;
                }
                push_literal(&mut output, quoted);
            }
            continue;
        }
        if !c.is_ascii_alphabetic() {
            push_literal(&mut output, c);
            continue;
        }
        let mut count = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            count += 1;
        }
        let spec = match (c, count) {
            ('y' | 'u', 2) => "%y",
            ('y' | 'u', _) => "%Y",
            ('M' | 'L', 1) => "%-m",
            ('M' | 'L', 2) => "%m",
            ('M' | 'L', 3) => "%b",
            ('M' | 'L', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('a', _) => "%p",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('z', _) => "%Z",
            ('Z', _) => "%z",
            ('X' | 'x', _) => "%:z",
            _ => return None,
        };
        output.push_str(spec);
    }
    Some(output)
}

fn push_literal(output: &mut String, c: char) {
    if c == '%' {
        output.push_str("%%");
    } else {
        output.push(c);
    }
}

/// Resolves a zone id strictly first, then by case-insensitive search over all
/// known ids (spaces count as underscores), preferring an exact match.
pub fn find_zone(zone: &str) -> Option<Tz> {
    if let Ok(tz) = zone.trim().parse::<Tz>() {
        return Some(tz);
    }
    let needle = zone.trim().replace(' ', "_").to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let mut partial = None;
    for tz in chrono_tz::TZ_VARIANTS.iter() {
        let name = tz.name().to_lowercase();
        if name == needle {
            return Some(*tz);
        }
        if partial.is_none() && name.contains(&needle) {
            partial = Some(*tz);
        }
    }
    partial
}

/// Maps an IETF language tag (`de-DE`, `de`, `pt_br`) to a formatting locale.
fn find_locale(tag: &str) -> Locale {
    let normalized = tag.trim().replace('-', "_");
    let mut parts = normalized.split('_');
    let language = parts.next().unwrap_or_default().to_lowercase();
    let region = parts.next().map(str::to_uppercase);

    let candidates = match region {
        Some(region) => vec![format!("{language}_{region}")],
        None => vec![language.clone(), format!("{language}_{}", language.to_uppercase())],
    };
    candidates
        .iter()
        .find_map(|candidate| Locale::try_from(candidate.as_str()).ok())
        .unwrap_or(Locale::POSIX)
}
