use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

/// Opaque external identifier of a source record.
///
/// The engine never interprets the identifier beyond equality; it is whatever
/// the source system used as a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One source item to be migrated.
///
/// A record is read once from input and classified exactly once per run. The
/// engine only ever looks at [`Record::id`]; `fields` is opaque payload for
/// the chunk processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default, flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns a field as a trimmed string, treating JSON null as absent.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(Value::String(s)) => Some(s.trim()),
            _ => None,
        }
    }

    /// Builds a record from a JSON object, requiring an `id` (or `ID`) key.
    pub fn from_json_object(mut fields: Map<String, Value>) -> Result<Self> {
        let id_value = fields
            .remove("id")
            .or_else(|| fields.remove("ID"))
            .ok_or_else(|| CoreError::missing_field("id"))?;

        let id = match id_value {
            Value::String(s) if !s.trim().is_empty() => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(CoreError::invalid_record(format!(
                    "unusable id value: {other}"
                )));
            }
        };

        Ok(Self {
            id: RecordId::new(id),
            fields,
        })
    }
}
