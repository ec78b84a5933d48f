//! Disposition model

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Agent name/id recorded when the submitting agent is unknown.
pub const OFFLINE_ENTRY: &str = "Offline Entry";

/// Client-generated disposition identifier.
///
/// Fresh ids are UUID v7 strings (millisecond timestamp prefix followed by
/// random bits), so they sort by creation time. Ids received from the remote
/// system are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispositionId(String);

impl DispositionId {
    /// Create a new unique disposition ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DispositionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DispositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DispositionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "disposition id must not be empty".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// One answered question of a disposition form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEntry {
    pub field_name: String,
    pub field_value: String,
}

impl FieldEntry {
    pub fn new(field_name: impl Into<String>, field_value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            field_value: field_value.into(),
        }
    }
}

/// Form answers, in one of the two shapes clients produce.
///
/// The shape is decided once when a payload is ingested; readers go through
/// [`DispositionFields::get`] instead of probing the raw JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DispositionFields {
    /// Ordered list of `{fieldName, fieldValue}` pairs
    Fielded { fields: Vec<FieldEntry> },
    /// Flat name → value map
    Flat { values: BTreeMap<String, String> },
}

impl Default for DispositionFields {
    fn default() -> Self {
        Self::Fielded { fields: Vec::new() }
    }
}

impl DispositionFields {
    /// Build the fielded shape from `(name, value)` pairs, keeping their order.
    pub fn fielded<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fielded {
            fields: pairs
                .into_iter()
                .map(|(name, value)| FieldEntry::new(name, value))
                .collect(),
        }
    }

    /// Build the flat shape from `(name, value)` pairs. Later duplicates win.
    pub fn flat<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Flat {
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Classify an untyped payload.
    ///
    /// Arrays of `{fieldName, fieldValue}` objects become [`Self::Fielded`],
    /// plain objects become [`Self::Flat`]. Non-string values are stored in
    /// their JSON text form; `null` becomes an empty string.
    pub fn ingest(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let mut fields = Vec::with_capacity(items.len());
                for item in items {
                    let Value::Object(mut entry) = item else {
                        return Err(Error::InvalidInput(
                            "field list entries must be objects".into(),
                        ));
                    };
                    let name = entry
                        .remove("fieldName")
                        .and_then(|name| name.as_str().map(str::to_string))
                        .ok_or_else(|| {
                            Error::InvalidInput("field list entry is missing fieldName".into())
                        })?;
                    let value = entry.remove("fieldValue").unwrap_or(Value::Null);
                    fields.push(FieldEntry::new(name, json_to_text(value)));
                }
                Ok(Self::Fielded { fields })
            }
            Value::Object(map) => Ok(Self::Flat {
                values: map
                    .into_iter()
                    .map(|(name, value)| (name, json_to_text(value)))
                    .collect(),
            }),
            other => Err(Error::InvalidInput(format!(
                "unsupported disposition field payload: {other}"
            ))),
        }
    }

    /// Look up a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Self::Fielded { fields } => fields
                .iter()
                .find(|entry| entry.field_name == name)
                .map(|entry| entry.field_value.as_str()),
            Self::Flat { values } => values.get(name).map(String::as_str),
        }
    }

    /// Wire representation. Flat values are emitted in key order.
    #[must_use]
    pub fn to_entries(&self) -> Vec<FieldEntry> {
        match self {
            Self::Fielded { fields } => fields.clone(),
            Self::Flat { values } => values
                .iter()
                .map(|(name, value)| FieldEntry::new(name.clone(), value.clone()))
                .collect(),
        }
    }

    /// Names of `required` fields that are absent or blank.
    #[must_use]
    pub fn missing(&self, required: &[String]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !matches!(self.get(name), Some(value) if !value.trim().is_empty()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Fielded { fields } => fields.len(),
            Self::Flat { values } => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn json_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A single call-outcome submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionRecord {
    /// Unique identifier, immutable once created
    pub id: DispositionId,
    /// Subject customer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// Form answers
    pub fields: DispositionFields,
    pub agent_name: String,
    pub agent_id: String,
    /// Human-readable local timestamp captured at submission
    pub date_contacted: String,
    /// Confirmed delivered to the remote system
    pub synced: bool,
    /// Creation timestamp (Unix ms), the ordering key for history views
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_of_business_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Failed delivery attempts while pending
    #[serde(default)]
    pub sync_attempts: u32,
    /// Most recent delivery failure while pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_error: Option<String>,
}

impl DispositionRecord {
    /// Look up a form answer by field name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name)
    }

    /// Mark the record as delivered. Failure bookkeeping is cleared.
    #[must_use]
    pub fn into_synced(mut self) -> Self {
        self.synced = true;
        self.last_sync_error = None;
        self
    }

    /// Whether the agent identity was unavailable at submission.
    #[must_use]
    pub fn is_offline_entry(&self) -> bool {
        self.agent_id == OFFLINE_ENTRY
    }
}

/// Raw form values plus submission context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionDraft {
    pub fields: DispositionFields,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub line_of_business_id: Option<String>,
}

impl DispositionDraft {
    #[must_use]
    pub fn new(fields: DispositionFields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    #[must_use]
    pub fn with_customer_name(mut self, customer_name: impl Into<String>) -> Self {
        self.customer_name = Some(customer_name.into());
        self
    }

    #[must_use]
    pub fn with_agent(mut self, agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self.agent_name = Some(agent_name.into());
        self
    }

    #[must_use]
    pub fn with_line_of_business(mut self, line_of_business_id: impl Into<String>) -> Self {
        self.line_of_business_id = Some(line_of_business_id.into());
        self
    }

    /// Turn the draft into a record stamped with the current time.
    #[must_use]
    pub fn into_record(self) -> DispositionRecord {
        self.into_record_at(Utc::now())
    }

    /// Turn the draft into a record created at `created_at`.
    ///
    /// A fresh id is always assigned. A missing agent identity falls back to
    /// [`OFFLINE_ENTRY`].
    #[must_use]
    pub fn into_record_at(self, created_at: DateTime<Utc>) -> DispositionRecord {
        let local = created_at.with_timezone(&Local);
        DispositionRecord {
            id: DispositionId::new(),
            customer_id: normalize(self.customer_id),
            fields: self.fields,
            agent_name: normalize(self.agent_name).unwrap_or_else(|| OFFLINE_ENTRY.to_string()),
            agent_id: normalize(self.agent_id).unwrap_or_else(|| OFFLINE_ENTRY.to_string()),
            date_contacted: local.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
            synced: false,
            created_at: created_at.timestamp_millis(),
            line_of_business_id: normalize(self.line_of_business_id),
            customer_name: normalize(self.customer_name),
            sync_attempts: 0,
            last_sync_error: None,
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    crate::util::normalize_text_option(value)
}
