use dispo_core::models::{DispositionFields, FormTemplate};
use dispo_core::sync::{Placement, QueueReason, SubmitOutcome};
use dispo_core::DispositionDraft;

use crate::cli::SubmitArgs;
use crate::commands::common::{short_id, Connectivity, Context};
use crate::error::CliError;

pub async fn run_submit(ctx: &Context, args: SubmitArgs) -> Result<(), CliError> {
    let as_json = args.json;
    let outcome = submit_disposition(ctx, args).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let id = short_id(&outcome.record.id.to_string());
    match &outcome.placement {
        Placement::Synced => println!("Submitted {id}"),
        Placement::Queued(QueueReason::Offline) => {
            println!("Saved Offline {id} (no connection; it will sync automatically)");
        }
        Placement::Queued(QueueReason::RemoteFailed(_)) => {
            println!("Saved Offline {id} (the server could not be reached; it will retry)");
        }
    }
    Ok(())
}

pub async fn submit_disposition(ctx: &Context, args: SubmitArgs) -> Result<SubmitOutcome, CliError> {
    let draft = build_draft(&args)?;
    let template = (!args.required.is_empty()).then(|| FormTemplate::new(args.required.iter()));
    let connectivity = if args.offline {
        Connectivity::ForcedOffline
    } else {
        Connectivity::Probe
    };

    let service = ctx.open_service(connectivity).await?;
    Ok(service.submit(draft, template.as_ref()).await?)
}

pub fn build_draft(args: &SubmitArgs) -> Result<DispositionDraft, CliError> {
    if args.fields.is_empty() {
        return Err(CliError::EmptyFields);
    }

    let mut draft = DispositionDraft::new(DispositionFields::fielded(args.fields.iter().cloned()));
    draft.customer_id = args.customer.clone();
    draft.customer_name = args.customer_name.clone();
    draft.agent_id = args.agent_id.clone();
    draft.agent_name = args.agent_name.clone();
    draft.line_of_business_id = args.lob.clone();
    Ok(draft)
}
