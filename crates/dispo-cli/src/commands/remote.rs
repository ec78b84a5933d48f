use dispo_core::db::sort_newest_first;
use dispo_core::remote::{DispositionQuery, QueryScope};

use crate::cli::{RemoteArgs, RemoteScopeArgs};
use crate::commands::common::{print_records, Context};
use crate::error::CliError;

pub async fn run_remote(ctx: &Context, args: RemoteArgs) -> Result<(), CliError> {
    if ctx.config.is_simulated() {
        return Err(CliError::RemoteNotConfigured);
    }

    let query = build_query(&args);
    let backend = ctx.config.remote_backend()?;
    let mut records = backend.fetch(&query).await?;
    sort_newest_first(&mut records);
    print_records(&records, args.json, "No remote dispositions found.")
}

pub fn build_query(args: &RemoteArgs) -> DispositionQuery {
    let limit = usize::try_from(args.limit).unwrap_or(usize::MAX);
    DispositionQuery::new(scope_from_args(&args.scope)).page(args.page, limit)
}

fn scope_from_args(scope: &RemoteScopeArgs) -> QueryScope {
    if let Some(customer) = &scope.customer {
        QueryScope::Customer(customer.clone())
    } else if let Some(lob) = &scope.lob {
        QueryScope::LineOfBusiness(lob.clone())
    } else {
        QueryScope::Agent(scope.agent.clone().unwrap_or_default())
    }
}
