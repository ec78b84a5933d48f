use std::time::Duration;

use dispo_core::sync::SyncWorker;

use crate::commands::common::{Connectivity, Context};
use crate::error::CliError;

pub async fn run_watch(ctx: &Context, interval_secs: Option<u64>) -> Result<(), CliError> {
    let interval = interval_secs.map_or(ctx.config.sync_interval, Duration::from_secs);
    let service = ctx.open_service(Connectivity::Probe).await?;
    let worker = SyncWorker::new(service, interval);

    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        ctx.db_path.display(),
        interval.as_secs()
    );
    let summary = worker
        .run(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", error);
                std::future::pending::<()>().await;
            }
        })
        .await;

    println!(
        "Stopped after {} passes: {} delivered, {} failed attempts",
        summary.passes, summary.synced, summary.failed
    );
    Ok(())
}
