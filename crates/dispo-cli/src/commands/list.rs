use crate::commands::common::{print_records, Connectivity, Context};
use crate::error::CliError;

pub async fn run_pending(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    let service = ctx.open_service(Connectivity::ForcedOffline).await?;
    let records = service.get_pending_dispositions().await;
    print_records(&records, as_json, "No pending dispositions.")
}

pub async fn run_synced(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    let service = ctx.open_service(Connectivity::ForcedOffline).await?;
    let records = service.get_synced_dispositions().await;
    print_records(&records, as_json, "No synced dispositions.")
}
