//! Detection and decoding of product payloads embedded in assistant text.
//!
//! The candidate is the span from the first `[` to the last `]`; when there is
//! no such span the first `{` to the last `}` is tried instead. Single quotes
//! are rewritten to double quotes before JSON decoding, which accepts the
//! loosely quoted lists produced by rule narratives.

use serde_json::{Map, Value};
use thiserror::Error;

pub const MISSING_NAME: &str = "Product Not Found";
pub const MISSING_DESCRIPTION: &str = "-";

const NAME_KEYS: [&str; 2] = ["name", "nama_produk"];
const DESCRIPTION_KEYS: [&str; 2] = ["description", "deskripsi"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductEntry {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedPayload<'a> {
    /// Trimmed text preceding the payload. May be empty.
    pub preamble: &'a str,
    pub entries: Vec<ProductEntry>,
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("no bracket-delimited payload found")]
    NoCandidate,
    #[error("payload is not valid JSON after quote repair: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("payload entry {index} is not a record")]
    NotARecord { index: usize },
    #[error("payload is neither a list nor a record")]
    InvalidShape,
}

/// Byte range of the candidate payload, end exclusive.
pub fn locate_candidate(text: &str) -> Option<(usize, usize)> {
    delimited_span(text, '[', ']').or_else(|| delimited_span(text, '{', '}'))
}

fn delimited_span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (start < end).then_some((start, end + close.len_utf8()))
}

pub fn extract(text: &str) -> Result<ExtractedPayload<'_>, PayloadError> {
    let (start, end) = locate_candidate(text).ok_or(PayloadError::NoCandidate)?;
    let repaired = text[start..end].replace('\'', "\"");
    let decoded: Value = serde_json::from_str(&repaired)?;

    let entries = match decoded {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(entry_from_record(&record)),
                _ => Err(PayloadError::NotARecord { index }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(record) => vec![entry_from_record(&record)],
        _ => return Err(PayloadError::InvalidShape),
    };

    Ok(ExtractedPayload { preamble: text[..start].trim(), entries })
}

fn entry_from_record(record: &Map<String, Value>) -> ProductEntry {
    ProductEntry {
        name: field_text(record, &NAME_KEYS).unwrap_or_else(|| MISSING_NAME.to_string()),
        description: field_text(record, &DESCRIPTION_KEYS)
            .unwrap_or_else(|| MISSING_DESCRIPTION.to_string()),
    }
}

fn field_text(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    })
}
