//! Background reconciliation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use super::ReconcileReport;
use crate::reachability::ReachabilityProbe;
use crate::remote::DispositionRemote;
use crate::services::DispositionService;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Handle for requesting an out-of-schedule pass (screen focus, post-submit).
///
/// A request made while a pass is running is kept and served afterwards.
#[derive(Debug, Clone, Default)]
pub struct SyncTrigger {
    notify: Arc<Notify>,
}

impl SyncTrigger {
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

/// Totals across the lifetime of a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub passes: usize,
    pub synced: usize,
    pub failed: usize,
}

impl WorkerSummary {
    fn record(&mut self, report: ReconcileReport) {
        self.passes += 1;
        self.synced += report.synced;
        self.failed += report.failed;
    }
}

#[derive(Debug, Clone, Copy)]
enum Cause {
    Interval,
    Requested,
    Reconnected,
}

/// Runs reconciliation on a fixed interval, on request, and whenever the
/// probe reports connectivity coming back.
pub struct SyncWorker<R, P> {
    service: DispositionService<R, P>,
    interval: Duration,
    trigger: SyncTrigger,
}

impl<R: DispositionRemote, P: ReachabilityProbe> SyncWorker<R, P> {
    pub fn new(service: DispositionService<R, P>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(Duration::from_millis(1)),
            trigger: SyncTrigger::default(),
        }
    }

    pub fn trigger(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    /// Run until `shutdown` resolves. The first interval pass starts
    /// immediately.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> WorkerSummary {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut connectivity = self.service.probe().subscribe();
        let mut probe_open = true;
        let mut summary = WorkerSummary::default();

        tracing::info!("Sync worker started (interval {:?})", self.interval);

        loop {
            let cause = tokio::select! {
                biased;
                () = &mut shutdown => break,
                changed = connectivity.changed(), if probe_open => {
                    if changed.is_err() {
                        tracing::debug!("Reachability probe closed; relying on interval");
                        probe_open = false;
                        continue;
                    }
                    if !*connectivity.borrow_and_update() {
                        tracing::info!("Connectivity lost");
                        continue;
                    }
                    Cause::Reconnected
                }
                () = self.trigger.notified() => Cause::Requested,
                _ = ticker.tick() => Cause::Interval,
            };

            let report = self.service.reconcile().await;
            summary.record(report);
            if report.has_changes() || report.failed > 0 {
                tracing::info!(
                    "Sync pass ({:?}): {} synced, {} failed",
                    cause,
                    report.synced,
                    report.failed
                );
            } else {
                tracing::debug!("Sync pass ({:?}): nothing to do", cause);
            }
        }

        tracing::info!(
            "Sync worker stopped after {} passes ({} synced, {} failed)",
            summary.passes,
            summary.synced,
            summary.failed
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;
    use crate::models::{DispositionDraft, DispositionFields};
    use crate::reachability::ManualReachability;
    use crate::sync::testing::ScriptedRemote;

    type TestService = DispositionService<ScriptedRemote, ManualReachability>;

    async fn setup(remote: ScriptedRemote, connected: bool) -> TestService {
        DispositionService::open_in_memory(remote, ManualReachability::new(connected))
            .await
            .unwrap()
    }

    fn draft() -> DispositionDraft {
        DispositionDraft::new(DispositionFields::flat([("status", "Answered")]))
    }

    async fn wait_for_empty_queue(service: &TestService) {
        for _ in 0..500 {
            if service.get_pending_dispositions().await.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pending queue was never drained");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reconnect_drains_the_queue() {
        let service = setup(ScriptedRemote::always(true), false).await;
        service.submit(draft(), None).await.unwrap();
        let worker = SyncWorker::new(service.clone(), Duration::from_secs(3600));
        let (stop, stopped) = oneshot::channel::<()>();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            service.probe().set_connected(true);
            wait_for_empty_queue(&service).await;
            stop.send(()).ok();
        };
        let (summary, ()) = tokio::join!(
            worker.run(async {
                stopped.await.ok();
            }),
            driver
        );

        assert_eq!(summary.synced, 1);
        assert_eq!(service.get_synced_dispositions().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn explicit_trigger_runs_a_pass() {
        let service = setup(ScriptedRemote::scripted([false], true), true).await;
        let worker = SyncWorker::new(service.clone(), Duration::from_secs(3600));
        let trigger = worker.trigger();
        let (stop, stopped) = oneshot::channel::<()>();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let outcome = service.submit(draft(), None).await.unwrap();
            assert!(!outcome.placement.is_synced());
            trigger.notify();
            wait_for_empty_queue(&service).await;
            stop.send(()).ok();
        };
        let (summary, ()) = tokio::join!(
            worker.run(async {
                stopped.await.ok();
            }),
            driver
        );

        assert!(summary.passes >= 2);
        assert_eq!(summary.synced, 1);
        assert_eq!(service.remote().calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn interval_keeps_retrying() {
        let service = setup(ScriptedRemote::always(true), true).await;
        let worker = SyncWorker::new(service.clone(), Duration::from_millis(10));
        let (stop, stopped) = oneshot::channel::<()>();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            stop.send(()).ok();
        };
        let (summary, ()) = tokio::join!(
            worker.run(async {
                stopped.await.ok();
            }),
            driver
        );

        assert!(summary.passes >= 2);
        assert_eq!(summary.synced, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resolved_shutdown_stops_before_any_pass() {
        let service = setup(ScriptedRemote::always(true), true).await;
        let worker = SyncWorker::new(service, DEFAULT_SYNC_INTERVAL);

        let summary = worker.run(async {}).await;

        assert_eq!(summary, WorkerSummary::default());
    }
}
