// src/core/json_path.rs

//! The path grammar used by `$j(path)` to navigate a parsed JSON document.
//!
//! ```text
//! data->items[0]->name          keys and indices
//! items[last] items[-2]         last element / counted from the end
//! items[size] tags[unique]      whole-structure functions
//! tags[join:, ]                 array to text
//! items[filter:kind=^video$]    keep elements whose sub-path matches
//! items[collect:name]           extract a sub-value from each element
//! items[combine:tags=^a]        flatten nested arrays, keeping matches
//! ```

use crate::core::{commons::regex_error_summary, parser::ParseError, reader::StringReader};
use regex::Regex;
use serde_json::Value;

/// A parsed path, applied to a document with [`JsonPath::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonPath {
    elements: Vec<Element>,
}

/// A compiled regex compared by its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectMode {
    Filter,
    Collect,
    Combine,
}

#[derive(Debug, Clone, PartialEq)]
enum Element {
    Key(String),
    Index(i64),
    Last,
    Size,
    Unique,
    Join(String),
    Select {
        mode: SelectMode,
        path: JsonPath,
        pattern: Option<Pattern>,
    },
}

impl JsonPath {
    /// Reads a path from `reader`, stopping before any char in `stops`.
    pub fn parse(reader: &mut StringReader, stops: &[char]) -> Result<Self, ParseError> {
        let mut elements = Vec::new();
        loop {
            match reader.peek() {
                None => break,
                Some(c) if stops.contains(&c) => break,
                Some('-') if reader.peek_second() == Some('>') => {
                    reader.next();
                    reader.next();
                }
                Some('[') => {
                    reader.next();
                    let start = reader.next_pos();
                    let inner = read_bracket(reader)?;
                    elements.push(Element::from_bracket(&inner, start)?);
                }
                Some(_) => elements.push(Element::Key(read_key(reader, stops))),
            }
        }
        Ok(Self { elements })
    }

    fn parse_nested(text: &str, offset: usize) -> Result<Self, ParseError> {
        Self::parse(&mut StringReader::new(text), &[])
            .map_err(|e| ParseError::new(e.message, e.offset + offset))
    }

    /// Applies the path to `root`. `None` if any step finds nothing.
    pub fn resolve(&self, root: &Value) -> Option<Value> {
        let mut current = root.clone();
        for element in &self.elements {
            current = element.apply(&current)?;
        }
        Some(current)
    }
}

/// Text form of a JSON value: strings raw, `null` as nothing, other scalars via
/// `Display`, arrays and objects as compact JSON.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

fn read_key(reader: &mut StringReader, stops: &[char]) -> String {
    let mut key = String::new();
    while let Some(c) = reader.peek() {
        if stops.contains(&c) || c == '[' || (c == '-' && reader.peek_second() == Some('>')) {
            break;
        }
        reader.next();
        if c == '\\' {
            if let Some(escaped) = reader.next() {
                key.push(escaped);
            }
        } else {
            key.push(c);
        }
    }
    key
}

/// Reads up to the matching `]`, keeping escapes so regexes survive intact.
fn read_bracket(reader: &mut StringReader) -> Result<String, ParseError> {
    let mut inner = String::new();
    let mut depth = 1;
    loop {
        let Some(c) = reader.next() else {
            return Err(ParseError::new("Expected ']'", reader.next_pos()));
        };
        match c {
            '\\' => {
                inner.push(c);
                if let Some(escaped) = reader.next() {
                    inner.push(escaped);
                }
            }
            '[' => {
                depth += 1;
                inner.push(c);
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(inner);
                }
                inner.push(c);
            }
            _ => inner.push(c),
        }
    }
}

/// Splits `subpath=regex` at the first `=` outside brackets.
fn split_condition(text: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => {
                return (text.get(..i).unwrap_or(text), text.get(i + 1..));
            }
            _ => {}
        }
    }
    (text, None)
}

impl Element {
    fn from_bracket(inner: &str, start: usize) -> Result<Self, ParseError> {
        if let Ok(index) = inner.trim().parse::<i64>() {
            return Ok(Element::Index(index));
        }
        match inner {
            "last" => return Ok(Element::Last),
            "size" => return Ok(Element::Size),
            "unique" => return Ok(Element::Unique),
            _ => {}
        }
        if let Some(delimiter) = inner.strip_prefix("join:") {
            return Ok(Element::Join(delimiter.to_string()));
        }

        let select = [
            ("filter:", SelectMode::Filter),
            ("collect:", SelectMode::Collect),
            ("combine:", SelectMode::Combine),
        ]
        .into_iter()
        .find_map(|(prefix, mode)| inner.strip_prefix(prefix).map(|rest| (prefix, mode, rest)));

        let Some((prefix, mode, rest)) = select else {
            return Ok(Element::Key(inner.to_string()));
        };

        let path_offset = start + prefix.chars().count();
        let (path_text, regex_text) = split_condition(rest);
        let path = JsonPath::parse_nested(path_text, path_offset)?;
        let pattern = match regex_text {
            Some(source) => {
                let regex_offset = path_offset + path_text.chars().count() + 1;
                let regex = Regex::new(source).map_err(|e| {
                    ParseError::new(format!("Invalid regex ({})", regex_error_summary(&e)), regex_offset)
                })?;
                Some(Pattern(regex))
            }
            None => None,
        };
        Ok(Element::Select {
            mode,
            path,
            pattern,
        })
    }

    fn apply(&self, value: &Value) -> Option<Value> {
        match self {
            Element::Key(key) => value.as_object()?.get(key).cloned(),
            Element::Index(index) => {
                let array = value.as_array()?;
                let index = if *index < 0 {
                    i64::try_from(array.len()).ok()? + index
                } else {
                    *index
                };
                array.get(usize::try_from(index).ok()?).cloned()
            }
            Element::Last => value.as_array()?.last().cloned(),
            Element::Size => match value {
                Value::Array(a) => Some(Value::from(a.len())),
                Value::Object(o) => Some(Value::from(o.len())),
                Value::String(s) => Some(Value::from(s.chars().count())),
                _ => None,
            },
            Element::Unique => {
                let mut unique: Vec<Value> = Vec::new();
                for item in value.as_array()? {
                    if !unique.contains(item) {
                        unique.push(item.clone());
                    }
                }
                Some(Value::Array(unique))
            }
            Element::Join(delimiter) => {
                let parts: Vec<String> = value.as_array()?.iter().filter_map(value_to_text).collect();
                Some(Value::String(parts.join(delimiter)))
            }
            Element::Select {
                mode,
                path,
                pattern,
            } => Some(Value::Array(select(value.as_array()?, *mode, path, pattern.as_ref()))),
        }
    }
}

fn matches(value: &Value, pattern: Option<&Pattern>) -> bool {
    let Some(text) = value_to_text(value) else {
        return false;
    };
    match pattern {
        Some(Pattern(regex)) => regex.is_match(&text),
        None => !text.is_empty(),
    }
}

fn select(array: &[Value], mode: SelectMode, path: &JsonPath, pattern: Option<&Pattern>) -> Vec<Value> {
    let mut selected = Vec::new();
    for element in array {
        let Some(sub) = path.resolve(element) else {
            continue;
        };
        match mode {
            SelectMode::Filter => {
                if matches(&sub, pattern) {
                    selected.push(element.clone());
                }
            }
            SelectMode::Collect => {
                if matches(&sub, pattern) {
                    selected.push(sub);
                }
            }
            SelectMode::Combine => match sub {
                Value::Array(inner) => {
                    selected.extend(inner.into_iter().filter(|v| matches(v, pattern)));
                }
                other => {
                    if matches(&other, pattern) {
                        selected.push(other);
                    }
                }
            },
        }
    }
    selected
}
