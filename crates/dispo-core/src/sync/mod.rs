//! Disposition capture and offline sync.
//!
//! [`DispositionService::submit`](crate::services::DispositionService::submit)
//! places a new record in the synced or pending slot depending on
//! connectivity and delivery outcome;
//! [`DispositionService::reconcile`](crate::services::DispositionService::reconcile)
//! drains the pending slot; [`SyncWorker`] runs reconciliation on its
//! triggers.

mod reconcile;
mod submit;
mod worker;

use serde::Serialize;

use crate::models::DispositionRecord;

pub use worker::{SyncTrigger, SyncWorker, WorkerSummary, DEFAULT_SYNC_INTERVAL};

/// Why a record was queued instead of delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum QueueReason {
    /// The probe reported no connectivity; no delivery was attempted
    Offline,
    /// Delivery was attempted and failed
    RemoteFailed(String),
}

/// Where a submitted record ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Synced,
    Queued(QueueReason),
}

impl Placement {
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }
}

/// Result of a submission, returned on every path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub record: DispositionRecord,
    pub placement: Placement,
    /// `false` when the local write failed; the failure has been logged
    pub persisted: bool,
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub synced: usize,
    pub failed: usize,
}

impl ReconcileReport {
    /// Whether derived views need reloading.
    pub const fn has_changes(&self) -> bool {
        self.synced > 0
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::models::{DispositionId, DispositionRecord};
    use crate::remote::{DispositionRemote, RemoteError, RemoteResult};

    /// Remote whose outcomes are queued up front; falls back to `default`.
    pub struct ScriptedRemote {
        outcomes: Mutex<VecDeque<bool>>,
        default: bool,
        calls: AtomicUsize,
        delivered: Mutex<Vec<DispositionId>>,
    }

    impl ScriptedRemote {
        pub fn always(ok: bool) -> Self {
            Self::scripted([], ok)
        }

        pub fn scripted(outcomes: impl IntoIterator<Item = bool>, default: bool) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                default,
                calls: AtomicUsize::new(0),
                delivered: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn delivered(&self) -> Vec<DispositionId> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl DispositionRemote for ScriptedRemote {
        async fn submit(&self, record: &DispositionRecord) -> RemoteResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ok = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.default);
            if ok {
                self.delivered.lock().unwrap().push(record.id.clone());
                Ok(())
            } else {
                Err(RemoteError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            }
        }
    }
}
