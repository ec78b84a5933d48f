use crate::db::{DispositionStore, LibSqlDispositionStore, Slot};
use crate::models::{DispositionDraft, DispositionRecord, FormTemplate};
use crate::reachability::ReachabilityProbe;
use crate::remote::DispositionRemote;
use crate::services::DispositionService;
use crate::util::compact_text;
use crate::Result;

use super::{Placement, QueueReason, SubmitOutcome};

impl<R: DispositionRemote, P: ReachabilityProbe> DispositionService<R, P> {
    /// Capture a disposition and place it in the synced or pending slot.
    ///
    /// Only a validation fault is returned as an error. Remote faults queue the
    /// record; local write faults are logged and reported through
    /// [`SubmitOutcome::persisted`].
    pub async fn submit(
        &self,
        draft: DispositionDraft,
        template: Option<&FormTemplate>,
    ) -> Result<SubmitOutcome> {
        if let Some(template) = template {
            template.validate(&draft)?;
        }

        let record = draft.into_record();

        if !self.probe.is_connected().await {
            tracing::info!("Offline; queueing disposition {}", record.id);
            return Ok(self
                .place(record, Placement::Queued(QueueReason::Offline))
                .await);
        }

        match self.remote.submit(&record).await {
            Ok(()) => {
                tracing::info!("Delivered disposition {}", record.id);
                Ok(self.place(record.into_synced(), Placement::Synced).await)
            }
            Err(error) => {
                let message = compact_text(&error.to_string());
                tracing::warn!(
                    "Delivery of disposition {} failed, queueing: {}",
                    record.id,
                    message
                );
                let mut record = record;
                record.sync_attempts = 1;
                record.last_sync_error = Some(message.clone());
                Ok(self
                    .place(record, Placement::Queued(QueueReason::RemoteFailed(message)))
                    .await)
            }
        }
    }

    async fn place(&self, record: DispositionRecord, placement: Placement) -> SubmitOutcome {
        let slot = if placement.is_synced() {
            Slot::Synced
        } else {
            Slot::Pending
        };

        let db = self.db.lock().await;
        let store = LibSqlDispositionStore::new(db.connection());
        let persisted = match store.append(slot, &record).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::error!(
                    "Disposition {} already stored; write to {} skipped",
                    record.id,
                    slot.key()
                );
                false
            }
            Err(error) => {
                tracing::error!(
                    "Abandoned write of disposition {} to {}: {}",
                    record.id,
                    slot.key(),
                    error
                );
                false
            }
        };

        SubmitOutcome {
            record,
            placement,
            persisted,
        }
    }
}
