//! Caller-selected extra fields.
//!
//! Lists and items carry many more columns than the typed records expose.
//! [`ExtraFields`] lets a caller name additional source fields and the keys
//! they should appear under in the record's `extra` map.

use std::{collections::BTreeMap, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, SharePointError};

/// Metadata wrapper SharePoint attaches to nested entities.
const METADATA_KEY: &str = "__metadata";

/// Internal encoding of a space in a SharePoint field name.
const ENCODED_SPACE: &str = "_x0020_";

/// An ISO-8601 UTC timestamp anywhere in a string.
static UTC_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}Z").expect("timestamp pattern is valid")
});

/// An extracted extra-field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A string that held an ISO-8601 UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Any other JSON value, with `__metadata` stripped from objects.
    Json(Value),
}

impl FieldValue {
    /// Returns the timestamp, if this value was parsed as one.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(timestamp) => Some(*timestamp),
            Self::Json(_) => None,
        }
    }

    /// Returns the raw JSON value, if this value was not a timestamp.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Timestamp(_) => None,
        }
    }
}

/// Mapping from output key to source field name.
///
/// ```
/// use sharepoint_rest::ExtraFields;
///
/// let extra = ExtraFields::new()
///     .field("due", "Due Date")
///     .field("owner", "Owner");
/// assert_eq!(extra.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraFields {
    entries: Vec<(String, String)>,
}

impl ExtraFields {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. `source` is the display name; spaces are encoded the way
    /// SharePoint stores them.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, source: impl Into<String>) -> Self {
        self.entries.push((key.into(), source.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extracts every mapped field from `object`.
    ///
    /// # Errors
    ///
    /// Returns [`SharePointError::InvalidProperty`] naming the encoded field
    /// when any mapped field is absent. Nothing is returned for the fields
    /// that were found before it.
    pub fn extract(&self, object: &Map<String, Value>) -> Result<BTreeMap<String, FieldValue>> {
        let mut extracted = BTreeMap::new();
        for (key, source) in &self.entries {
            let name = encode_field_name(source);
            let value = object
                .get(&name)
                .ok_or_else(|| SharePointError::InvalidProperty(name.clone()))?;
            extracted.insert(key.clone(), convert(value));
        }
        Ok(extracted)
    }
}

impl<K, S> FromIterator<(K, S)> for ExtraFields
where
    K: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, source)| (key.into(), source.into()))
                .collect(),
        }
    }
}

fn encode_field_name(name: &str) -> String {
    name.replace(' ', ENCODED_SPACE)
}

fn convert(value: &Value) -> FieldValue {
    match value {
        Value::Object(object) if object.contains_key(METADATA_KEY) => {
            let mut object = object.clone();
            object.remove(METADATA_KEY);
            FieldValue::Json(Value::Object(object))
        }
        Value::String(text) if UTC_TIMESTAMP.is_match(text) => text
            .parse::<DateTime<Utc>>()
            .map_or_else(|_| FieldValue::Json(value.clone()), FieldValue::Timestamp),
        other => FieldValue::Json(other.clone()),
    }
}
