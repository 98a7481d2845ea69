//! Path-addressed view of a JSON document.
//!
//! [`flatten`] walks a document with an explicit stack and yields every leaf
//! with its path, in document order. Empty arrays and objects are leaves, so
//! [`unflatten`] can rebuild the exact document.

use serde_json::{Map, Value as JsonValue};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

/// One leaf and the path leading to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry {
    pub path: Vec<PathSegment>,
    pub value: JsonValue,
}

impl FlatEntry {
    /// Dotted rendering of the path, e.g. `blocks.0.fields.cta`.
    pub fn dotted(&self) -> String {
        dotted(&self.path)
    }
}

pub fn dotted(path: &[PathSegment]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Flatten a document into its leaves, in document order.
pub fn flatten(document: &JsonValue) -> Vec<FlatEntry> {
    let mut entries = Vec::new();
    let mut stack: Vec<(Vec<PathSegment>, &JsonValue)> = vec![(Vec::new(), document)];

    while let Some((path, value)) = stack.pop() {
        match value {
            JsonValue::Object(map) if !map.is_empty() => {
                // Reverse so the first key is popped first.
                for (key, child) in map.iter().rev() {
                    let mut child_path = path.clone();
                    child_path.push(PathSegment::Key(key.clone()));
                    stack.push((child_path, child));
                }
            }
            JsonValue::Array(items) if !items.is_empty() => {
                for (index, child) in items.iter().enumerate().rev() {
                    let mut child_path = path.clone();
                    child_path.push(PathSegment::Index(index));
                    stack.push((child_path, child));
                }
            }
            leaf => entries.push(FlatEntry {
                path,
                value: leaf.clone(),
            }),
        }
    }

    entries
}

/// Rebuild a document from flattened entries.
pub fn unflatten(entries: &[FlatEntry]) -> JsonValue {
    let mut document = JsonValue::Null;
    for entry in entries {
        set_at(&mut document, &entry.path, entry.value.clone());
    }
    document
}

/// Replace the value at `path`, creating intermediate containers as needed.
///
/// A `Key` segment turns a non-object into an object; an `Index` segment
/// turns a non-array into an array and pads it with nulls.
pub fn set_at(document: &mut JsonValue, path: &[PathSegment], value: JsonValue) {
    let mut cursor = document;

    for segment in path {
        cursor = match segment {
            PathSegment::Key(key) => {
                if !cursor.is_object() {
                    *cursor = JsonValue::Object(Map::new());
                }
                match cursor {
                    JsonValue::Object(map) => map.entry(key.clone()).or_insert(JsonValue::Null),
                    _ => return,
                }
            }
            PathSegment::Index(index) => {
                if !cursor.is_array() {
                    *cursor = JsonValue::Array(Vec::new());
                }
                match cursor {
                    JsonValue::Array(items) => {
                        if items.len() <= *index {
                            items.resize(index + 1, JsonValue::Null);
                        }
                        &mut items[*index]
                    }
                    _ => return,
                }
            }
        };
    }

    *cursor = value;
}

/// Borrow the value at `path`, if present.
pub fn get_at<'a>(document: &'a JsonValue, path: &[PathSegment]) -> Option<&'a JsonValue> {
    path.iter().try_fold(document, |cursor, segment| match segment {
        PathSegment::Key(key) => cursor.get(key.as_str()),
        PathSegment::Index(index) => cursor.get(*index),
    })
}
