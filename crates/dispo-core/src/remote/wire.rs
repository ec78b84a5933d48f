//! Read-path payloads of the disposition endpoint.
//!
//! List responses come either wrapped (`{"data": [...]}`) or as a bare array,
//! and individual items vary in how they spell the timestamp, the agent, and
//! the field list. Everything is normalized into [`DispositionRecord`] here.

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::Value;

use super::{RemoteError, RemoteResult};
use crate::models::{DispositionFields, DispositionId, DispositionRecord, OFFLINE_ENTRY};

/// Which history to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Customer(String),
    LineOfBusiness(String),
    Agent(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionQuery {
    pub scope: QueryScope,
    /// Zero-based page index
    pub page: usize,
    pub limit: usize,
}

impl DispositionQuery {
    pub const fn new(scope: QueryScope) -> Self {
        Self {
            scope,
            page: 0,
            limit: 20,
        }
    }

    #[must_use]
    pub const fn page(mut self, page: usize, limit: usize) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let scope = match &self.scope {
            QueryScope::Customer(id) => ("customerId", id.clone()),
            QueryScope::LineOfBusiness(id) => ("lineOfBusinessId", id.clone()),
            QueryScope::Agent(id) => ("agentId", id.clone()),
        };
        vec![
            scope,
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteAgent {
    Name(String),
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, alias = "_id")]
        id: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteTimestamp {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteDisposition {
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    line_of_business_id: Option<String>,
    #[serde(default)]
    agent: Option<RemoteAgent>,
    #[serde(default)]
    agent_id: Option<String>,
    #[serde(default)]
    created_at: Option<RemoteTimestamp>,
    #[serde(default)]
    timestamp: Option<RemoteTimestamp>,
    #[serde(default)]
    fill_disposition: Option<Value>,
    #[serde(default)]
    fields: Option<Value>,
}

/// Parse a list response body into synced records.
///
/// Only the envelope is strict. An item that cannot be read is logged and
/// skipped so the rest of the page survives.
pub fn parse_fetch_response(body: &str) -> RemoteResult<Vec<DispositionRecord>> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|error| RemoteError::InvalidPayload(error.to_string()))?;
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(RemoteError::InvalidPayload(
                    "expected a list or an object with a `data` list".to_string(),
                ))
            }
        },
        _ => {
            return Err(RemoteError::InvalidPayload(
                "expected a list or an object with a `data` list".to_string(),
            ))
        }
    };

    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            match serde_json::from_value::<RemoteDisposition>(item) {
                Ok(item) => Some(item.into_record()),
                Err(error) => {
                    tracing::warn!("Skipping unreadable remote disposition #{}: {}", index, error);
                    None
                }
            }
        })
        .collect())
}

impl RemoteDisposition {
    fn into_record(self) -> DispositionRecord {
        let stamp = self.created_at.or(self.timestamp);
        let created_at = stamp.as_ref().map_or(0, timestamp_millis);
        let date_contacted = match (&stamp, DateTime::from_timestamp_millis(created_at)) {
            (Some(_), Some(date)) if created_at > 0 => date
                .with_timezone(&Local)
                .format("%-m/%-d/%Y, %-I:%M:%S %p")
                .to_string(),
            (Some(RemoteTimestamp::Text(text)), _) => text.clone(),
            _ => String::new(),
        };

        let (agent_name, agent_from_object) = match self.agent {
            Some(RemoteAgent::Name(name)) => (Some(name), None),
            Some(RemoteAgent::Object { name, id }) => (name, id),
            None => (None, None),
        };
        let agent_id = self.agent_id.or(agent_from_object);

        let fields = self
            .fill_disposition
            .or(self.fields)
            .map_or_else(|| Ok(DispositionFields::default()), DispositionFields::ingest)
            .unwrap_or_else(|error| {
                tracing::warn!("Dropping unreadable remote field list: {}", error);
                DispositionFields::default()
            });

        let id = self
            .id
            .and_then(|id| id.parse::<DispositionId>().ok())
            .unwrap_or_default();

        DispositionRecord {
            id,
            customer_id: self.customer_id,
            fields,
            agent_name: agent_name.unwrap_or_else(|| OFFLINE_ENTRY.to_string()),
            agent_id: agent_id.unwrap_or_else(|| OFFLINE_ENTRY.to_string()),
            date_contacted,
            synced: true,
            created_at,
            line_of_business_id: self.line_of_business_id,
            customer_name: self.customer_name,
            sync_attempts: 0,
            last_sync_error: None,
        }
    }
}

/// Numeric stamps are taken as Unix ms; text stamps must be RFC 3339 or an
/// integer. Anything else sorts as the epoch.
#[allow(clippy::cast_possible_truncation)]
fn timestamp_millis(stamp: &RemoteTimestamp) -> i64 {
    match stamp {
        RemoteTimestamp::Millis(millis) => *millis,
        RemoteTimestamp::Fractional(millis) => millis.round() as i64,
        RemoteTimestamp::Text(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|date| date.timestamp_millis())
            .or_else(|_| text.trim().parse::<i64>())
            .unwrap_or_else(|_| {
                tracing::debug!("Unparseable remote timestamp '{}'", text);
                0
            }),
    }
}
