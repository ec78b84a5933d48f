use chrono::Utc;
use dispo_core::history::{
    filter_by_customer, filter_by_line_of_business, merge_history, paginate, HistoryEntry,
};

use crate::cli::HistoryArgs;
use crate::commands::common::{format_history_lines, load_seed_records, Connectivity, Context};
use crate::error::CliError;

pub async fn run_history(ctx: &Context, args: HistoryArgs) -> Result<(), CliError> {
    let entries = load_history(ctx, &args).await?;
    let page_size = usize::try_from(args.page_size).unwrap_or(usize::MAX);
    let page = paginate(&entries, args.page, page_size);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("No dispositions on page {} ({} total).", page.page, page.total);
        return Ok(());
    }

    for line in format_history_lines(page.items, Utc::now().timestamp_millis()) {
        println!("{line}");
    }
    println!(
        "Page {} of {} ({} total)",
        page.page + 1,
        page.total_pages.max(1),
        page.total
    );
    Ok(())
}

pub async fn load_history(ctx: &Context, args: &HistoryArgs) -> Result<Vec<HistoryEntry>, CliError> {
    let seeds = match args.seed.as_deref() {
        Some(path) => load_seed_records(path)?,
        None => Vec::new(),
    };

    let service = ctx.open_service(Connectivity::ForcedOffline).await?;
    let synced = service.get_synced_dispositions().await;
    let pending = service.get_pending_dispositions().await;

    let mut entries = merge_history(&synced, &pending, &seeds);
    if let Some(customer_id) = args.customer.as_deref() {
        entries = filter_by_customer(entries, customer_id);
    }
    if let Some(line_of_business_id) = args.lob.as_deref() {
        entries = filter_by_line_of_business(entries, line_of_business_id);
    }
    Ok(entries)
}
