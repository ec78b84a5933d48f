use crate::commands::common::{Connectivity, Context};
use crate::error::CliError;

pub async fn run_reset(ctx: &Context, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ResetNotConfirmed);
    }

    let service = ctx.open_service(Connectivity::ForcedOffline).await?;
    let pending = service.get_pending_dispositions().await.len();
    service.clear().await?;
    if pending > 0 {
        tracing::warn!("Discarded {} undelivered dispositions", pending);
    }
    println!("Cleared local dispositions ({pending} were still pending)");
    Ok(())
}
