use dispo_core::reachability::ReachabilityProbe;
use dispo_core::sync::ReconcileReport;

use crate::commands::common::{Connectivity, Context};
use crate::error::CliError;

pub async fn run_sync(ctx: &Context, offline: bool) -> Result<(), CliError> {
    let connectivity = if offline {
        Connectivity::ForcedOffline
    } else {
        Connectivity::Probe
    };
    let service = ctx.open_service(connectivity).await?;

    if !service.probe().is_connected().await {
        let pending = service.get_pending_dispositions().await.len();
        println!("Offline; {pending} dispositions remain queued");
        return Ok(());
    }

    let report = service.reconcile().await;
    println!("{}", describe_report(report));
    Ok(())
}

pub fn describe_report(report: ReconcileReport) -> String {
    match (report.synced, report.failed) {
        (0, 0) => "Nothing to sync".to_string(),
        (synced, 0) => format!("Sync completed: {synced} delivered"),
        (synced, failed) => {
            format!("Sync completed: {synced} delivered, {failed} still pending")
        }
    }
}
