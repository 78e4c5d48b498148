//! One record per line, comma separated.
//!
//! Values are escaped before quoting: backslash, newline, carriage return and
//! the delimiter each become a two-character backslash sequence. A value that
//! still contains the delimiter, a quote or a newline afterwards is wrapped in
//! quotes with inner quotes doubled.

use std::collections::BTreeMap;

use crate::error::DecodeError;

pub const DELIMITER: char = ',';
pub const QUOTE: char = '"';

/// A flat field-name to value mapping. Absent fields read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Whether decoded fields keep surrounding whitespace.
///
/// `Trim` matches files written by the earlier JavaScript server, which
/// stripped every field and so lost leading and trailing whitespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldTrim {
    #[default]
    Preserve,
    Trim,
}

pub fn encode_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            DELIMITER => escaped.push_str("\\,"),
            other => escaped.push(other),
        }
    }

    if escaped.contains(|c: char| c == DELIMITER || c == QUOTE || c == '\n') {
        format!("{QUOTE}{}{QUOTE}", escaped.replace(QUOTE, "\"\""))
    } else {
        escaped
    }
}

pub fn encode_line(record: &Record, header: &[&str]) -> String {
    header
        .iter()
        .map(|field| encode_value(record.get(field)))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn encode_header(header: &[&str]) -> String {
    header.join(",")
}

/// Split a line on unquoted delimiters. Quoted spans are literal, `""` inside
/// one is a quote. Escape sequences are left in place.
pub fn split_fields(line: &str) -> Result<Vec<String>, DecodeError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quote_start = None;
    let mut chars = line.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            QUOTE if quote_start.is_some() => {
                if matches!(chars.peek(), Some((_, QUOTE))) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    quote_start = None;
                }
            }
            QUOTE => quote_start = Some(idx),
            DELIMITER if quote_start.is_none() => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }

    if let Some(column) = quote_start {
        return Err(DecodeError::UnterminatedQuote { column });
    }

    fields.push(current);
    Ok(fields)
}

/// Reverse the backslash escapes in one pass. Unknown sequences are kept.
pub fn unescape_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(DELIMITER) => out.push(DELIMITER),
            Some(QUOTE) => out.push(QUOTE),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub fn decode_line(line: &str, header: &[String], trim: FieldTrim) -> Result<Record, DecodeError> {
    let values = split_fields(line)?;
    let record = header
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let raw = values.get(i).map(String::as_str).unwrap_or("");
            let raw = match trim {
                FieldTrim::Preserve => raw,
                FieldTrim::Trim => raw.trim(),
            };
            (field.clone(), unescape_value(raw))
        })
        .collect();
    Ok(record)
}

pub fn decode_header(line: &str) -> Result<Vec<String>, DecodeError> {
    let line = line.strip_prefix('\u{feff}').unwrap_or(line);
    Ok(split_fields(line)?
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect())
}
