//! In-memory disposition ledger.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldEntry {
    pub field_name: String,
    pub field_value: String,
}

/// A disposition as accepted by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDisposition {
    pub id: String,
    pub customer_id: Option<String>,
    pub agent_id: String,
    pub line_of_business_id: Option<String>,
    pub fill_disposition: Vec<FieldEntry>,
    /// Client capture time (Unix ms)
    pub timestamp: i64,
    /// Capture time as RFC 3339
    pub created_at: String,
    /// Server receive time (Unix ms)
    pub received_at: i64,
}

/// Validated submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDisposition {
    pub customer_id: Option<String>,
    pub agent_id: String,
    pub line_of_business_id: Option<String>,
    pub fill_disposition: Vec<FieldEntry>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub customer_id: Option<String>,
    pub line_of_business_id: Option<String>,
    pub agent_id: Option<String>,
}

impl ListFilter {
    fn matches(&self, item: &StoredDisposition) -> bool {
        let matches =
            |wanted: Option<&str>, actual: Option<&str>| wanted.is_none() || wanted == actual;
        matches(self.customer_id.as_deref(), item.customer_id.as_deref())
            && matches(
                self.line_of_business_id.as_deref(),
                item.line_of_business_id.as_deref(),
            )
            && matches(self.agent_id.as_deref(), Some(item.agent_id.as_str()))
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    items: Vec<StoredDisposition>,
    by_key: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct DispositionLedger {
    state: RwLock<LedgerState>,
}

pub enum Insert {
    Created(StoredDisposition),
    Replayed(StoredDisposition),
}

impl DispositionLedger {
    /// Store a submission. A repeated idempotency key returns the original
    /// item untouched.
    pub async fn insert(&self, submission: NewDisposition, idempotency_key: Option<&str>) -> Insert {
        let mut state = self.state.write().await;

        if let Some(existing) = idempotency_key
            .and_then(|key| state.by_key.get(key))
            .and_then(|index| state.items.get(*index))
        {
            return Insert::Replayed(existing.clone());
        }

        let received_at = Utc::now().timestamp_millis();
        let timestamp = submission.timestamp.unwrap_or(received_at);
        let created_at = DateTime::from_timestamp_millis(timestamp)
            .unwrap_or_default()
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let id = idempotency_key.map_or_else(|| uuid::Uuid::now_v7().to_string(), str::to_string);

        let item = StoredDisposition {
            id,
            customer_id: submission.customer_id,
            agent_id: submission.agent_id,
            line_of_business_id: submission.line_of_business_id,
            fill_disposition: submission.fill_disposition,
            timestamp,
            created_at,
            received_at,
        };

        let index = state.items.len();
        state.items.push(item.clone());
        if let Some(key) = idempotency_key {
            state.by_key.insert(key.to_string(), index);
        }
        Insert::Created(item)
    }

    /// Matching items newest first, sliced to one page, plus the match count.
    pub async fn list(
        &self,
        filter: &ListFilter,
        page: usize,
        limit: usize,
    ) -> (Vec<StoredDisposition>, usize) {
        let state = self.state.read().await;
        let mut matching = state
            .items
            .iter()
            .filter(|item| filter.matches(item))
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total = matching.len();
        let data = matching
            .into_iter()
            .skip(page.saturating_mul(limit))
            .take(limit)
            .cloned()
            .collect();
        (data, total)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn submission(agent: &str, customer: &str, timestamp: i64) -> NewDisposition {
        NewDisposition {
            customer_id: Some(customer.to_string()),
            agent_id: agent.to_string(),
            line_of_business_id: None,
            fill_disposition: vec![FieldEntry {
                field_name: "Call Status".to_string(),
                field_value: "Answered".to_string(),
            }],
            timestamp: Some(timestamp),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn repeated_key_is_stored_once() {
        let ledger = DispositionLedger::default();

        let Insert::Created(first) = ledger.insert(submission("a", "c", 1), Some("key-1")).await
        else {
            panic!("first insert should create");
        };
        let Insert::Replayed(second) = ledger.insert(submission("b", "d", 2), Some("key-1")).await
        else {
            panic!("second insert should replay");
        };

        assert_eq!(first, second);
        assert_eq!(first.id, "key-1");
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_filters_sorts_and_pages() {
        let ledger = DispositionLedger::default();
        for (index, customer) in ["c1", "c2", "c1", "c1"].into_iter().enumerate() {
            let timestamp = i64::try_from(index).unwrap() * 1_000;
            ledger
                .insert(submission("agent", customer, timestamp), None)
                .await;
        }

        let filter = ListFilter {
            customer_id: Some("c1".to_string()),
            ..ListFilter::default()
        };
        let (first_page, total) = ledger.list(&filter, 0, 2).await;
        assert_eq!(total, 3);
        assert_eq!(
            first_page.iter().map(|item| item.timestamp).collect::<Vec<_>>(),
            vec![3_000, 2_000]
        );

        let (second_page, _) = ledger.list(&filter, 1, 2).await;
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].timestamp, 0);
        assert_eq!(second_page[0].created_at, "1970-01-01T00:00:00.000Z");
    }
}
