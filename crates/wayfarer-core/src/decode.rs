//! Decoding of JSON collections stored by older clients.
//!
//! A stored collection may be a JSON array, a string holding an encoded
//! array, `null`, or garbage. [`decode_collection`] reports what went wrong;
//! [`decode_or_empty`] is the fail-soft wrapper the read paths use.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("embedded JSON string does not parse: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("expected a JSON array, found {0}")]
    NotAnArray(&'static str),

    #[error("element {index} is malformed: {source}")]
    BadElement {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode a stored collection. `null` is an empty collection.
pub fn decode_collection<T: DeserializeOwned>(value: &Value) -> Result<Vec<T>, DecodeError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                T::deserialize(item).map_err(|source| DecodeError::BadElement { index, source })
            })
            .collect(),
        Value::String(encoded) => {
            let inner: Value = serde_json::from_str(encoded).map_err(DecodeError::InvalidJson)?;
            match inner {
                // A string inside a string is not a collection.
                Value::String(_) => Err(DecodeError::NotAnArray("a string")),
                other => decode_collection(&other),
            }
        }
        other => Err(DecodeError::NotAnArray(kind(other))),
    }
}

/// Decode a stored collection, substituting an empty one on failure.
///
/// `what` names the collection and `owner` the record holding it; both only
/// feed the warning.
pub fn decode_or_empty<T: DeserializeOwned>(
    value: &Value,
    what: &str,
    owner: impl Display,
) -> Vec<T> {
    match decode_collection(value) {
        Ok(items) => items,
        Err(e) => {
            warn!(%owner, collection = what, error = %e, "discarding malformed stored collection");
            Vec::new()
        }
    }
}
