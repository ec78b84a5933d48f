use crate::db::{DispositionStore, LibSqlDispositionStore};
use crate::reachability::ReachabilityProbe;
use crate::remote::DispositionRemote;
use crate::services::DispositionService;
use crate::util::compact_text;

use super::ReconcileReport;

impl<R: DispositionRemote, P: ReachabilityProbe> DispositionService<R, P> {
    /// Try to deliver every pending disposition once.
    ///
    /// Passes are serialized; a pass that waited on another one reads the
    /// pending slot after it finished. Records that fail stay pending with
    /// their failure recorded.
    pub async fn reconcile(&self) -> ReconcileReport {
        if !self.probe.is_connected().await {
            return ReconcileReport::default();
        }

        let _pass = self.reconcile_lock.lock().await;
        let pending = self.get_pending_dispositions().await;
        if pending.is_empty() {
            return ReconcileReport::default();
        }

        tracing::debug!("Reconciling {} pending dispositions", pending.len());
        let mut report = ReconcileReport::default();

        for record in pending {
            match self.remote.submit(&record).await {
                Ok(()) => {
                    let db = self.db.lock().await;
                    let store = LibSqlDispositionStore::new(db.connection());
                    match store.promote(&record.id).await {
                        Ok(true) => report.synced += 1,
                        Ok(false) => {
                            tracing::debug!(
                                "Disposition {} left pending before promotion; not counted",
                                record.id
                            );
                        }
                        Err(error) => {
                            tracing::error!(
                                "Delivered disposition {} but could not promote it: {}",
                                record.id,
                                error
                            );
                            report.failed += 1;
                        }
                    }
                }
                Err(error) => {
                    let message = compact_text(&error.to_string());
                    tracing::warn!("Disposition {} still pending: {}", record.id, message);
                    let db = self.db.lock().await;
                    let store = LibSqlDispositionStore::new(db.connection());
                    if let Err(error) = store.record_failure(&record.id, &message).await {
                        tracing::error!(
                            "Could not record failure for disposition {}: {}",
                            record.id,
                            error
                        );
                    }
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Reconciled pending dispositions: {} synced, {} failed",
            report.synced,
            report.failed
        );
        report
    }
}
