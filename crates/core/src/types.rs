use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Field name under which the identifier is serialized.
pub const ID_FIELD: &str = "id";
/// Field name under which the creation instant is serialized.
pub const TIME_STAMP_FIELD: &str = "timeStamp";

/// User-defined grouping record.
///
/// Only `id` and `time_stamp` carry meaning for the factory. Every other
/// attribute (name, color, ...) is kept in `fields` and passed through as-is.
/// Decoding never fails on the shape of `id` or `timeStamp`; see
/// [`Category::from_map`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Category {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "timeStamp", skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Category {
    /// Creates an empty record without identifier or timestamp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a record from raw attributes.
    ///
    /// A string `id` and an RFC 3339 `timeStamp` are lifted into the typed
    /// fields. Values of any other shape stay in `fields` under their original
    /// key, so they are forwarded verbatim.
    pub fn from_map(mut fields: Map<String, Value>) -> Self {
        let id = match fields.remove(ID_FIELD) {
            Some(Value::String(id)) => Some(id),
            Some(other) => {
                fields.insert(ID_FIELD.to_string(), other);
                None
            }
            None => None,
        };

        let time_stamp = match fields.remove(TIME_STAMP_FIELD) {
            Some(Value::String(raw)) => match DateTime::parse_from_rfc3339(&raw) {
                Ok(at) => Some(at.with_timezone(&Utc)),
                Err(_) => {
                    fields.insert(TIME_STAMP_FIELD.to_string(), Value::String(raw));
                    None
                }
            },
            Some(other) => {
                fields.insert(TIME_STAMP_FIELD.to_string(), other);
                None
            }
            None => None,
        };

        Self {
            id,
            time_stamp,
            fields,
        }
    }

    /// Sets the identifier, typically for records that already exist downstream.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds an opaque attribute.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the opaque attribute stored under `key`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the `name` attribute when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Map::deserialize(deserializer).map(Category::from_map)
    }
}

/// Closed set of transition kinds understood by category stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryActionKind {
    Create,
    Update,
    Delete,
    Reset,
}

impl CategoryActionKind {
    pub const ALL: [Self; 4] = [Self::Create, Self::Update, Self::Delete, Self::Reset];

    /// Returns the wire tag carried in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CATEGORY_CREATE",
            Self::Update => "CATEGORY_UPDATE",
            Self::Delete => "CATEGORY_DELETE",
            Self::Reset => "CATEGORY_RESET",
        }
    }
}

impl fmt::Display for CategoryActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a `type` tag is not one of the four category kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category action type: {0}")]
pub struct ParseActionKindError(pub String);

impl FromStr for CategoryActionKind {
    type Err = ParseActionKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "CATEGORY_CREATE" => Ok(Self::Create),
            "CATEGORY_UPDATE" => Ok(Self::Update),
            "CATEGORY_DELETE" => Ok(Self::Delete),
            "CATEGORY_RESET" => Ok(Self::Reset),
            other => Err(ParseActionKindError(other.to_string())),
        }
    }
}

/// Intended mutation of a category collection, consumed by an external store.
///
/// Serialized as `{"type": "CATEGORY_*", "payload": {...}}`. `Reset` carries no
/// payload and serializes to `{"type": "CATEGORY_RESET"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CategoryAction {
    #[serde(rename = "CATEGORY_CREATE")]
    Create(Category),
    #[serde(rename = "CATEGORY_UPDATE")]
    Update(Category),
    #[serde(rename = "CATEGORY_DELETE")]
    Delete(Category),
    #[serde(rename = "CATEGORY_RESET")]
    Reset,
}

impl CategoryAction {
    pub fn kind(&self) -> CategoryActionKind {
        match self {
            Self::Create(_) => CategoryActionKind::Create,
            Self::Update(_) => CategoryActionKind::Update,
            Self::Delete(_) => CategoryActionKind::Delete,
            Self::Reset => CategoryActionKind::Reset,
        }
    }

    /// Returns the wire tag, used as a log and metrics label.
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn payload(&self) -> Option<&Category> {
        match self {
            Self::Create(category) | Self::Update(category) | Self::Delete(category) => {
                Some(category)
            }
            Self::Reset => None,
        }
    }

    pub fn into_payload(self) -> Option<Category> {
        match self {
            Self::Create(category) | Self::Update(category) | Self::Delete(category) => {
                Some(category)
            }
            Self::Reset => None,
        }
    }
}
