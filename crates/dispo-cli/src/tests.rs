use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use dispo_core::config::ClientConfig;
use dispo_core::history::SyncBadge;
use dispo_core::models::DispositionFields;
use dispo_core::sync::{Placement, QueueReason};
use dispo_core::{DispositionDraft, DispositionRecord, Error};
use pretty_assertions::assert_eq;

use crate::cli::{parse_field_pair, Cli, Commands, CompletionShell, HistoryArgs, SubmitArgs};
use crate::commands::common::{
    format_record_lines, format_relative_time, load_seed_records, resolve_db_path,
    summarize_fields, Connectivity, Context,
};
use crate::commands::completions::render_completions;
use crate::commands::history::load_history;
use crate::commands::remote::build_query;
use crate::commands::reset::run_reset;
use crate::commands::submit::{build_draft, submit_disposition};
use crate::commands::sync::describe_report;
use crate::error::CliError;

fn context_in(dir: &tempfile::TempDir) -> Context {
    let config = ClientConfig {
        simulated_delay: std::time::Duration::ZERO,
        simulated_success_rate: 1.0,
        ..ClientConfig::default()
    };
    Context::new(Some(dir.path().join("dispo.db")), config)
}

fn submit_args(fields: &[(&str, &str)]) -> SubmitArgs {
    SubmitArgs {
        customer: Some("cust-1".to_string()),
        agent_id: Some("agent-1".to_string()),
        agent_name: Some("Ana".to_string()),
        fields: fields
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect(),
        ..SubmitArgs::default()
    }
}

fn history_args() -> HistoryArgs {
    HistoryArgs {
        page: 0,
        page_size: 10,
        customer: None,
        lob: None,
        seed: None,
        json: false,
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parse_field_pair_splits_on_first_equals() {
    assert_eq!(
        parse_field_pair(" Call Status =Answered").unwrap(),
        ("Call Status".to_string(), "Answered".to_string())
    );
    assert_eq!(
        parse_field_pair("Remarks=a=b").unwrap(),
        ("Remarks".to_string(), "a=b".to_string())
    );
    assert!(parse_field_pair("no-separator").is_err());
    assert!(parse_field_pair(" =value").is_err());
}

#[test]
fn submit_command_collects_repeated_fields() {
    let cli = Cli::try_parse_from([
        "dispo",
        "submit",
        "--customer",
        "cust-1",
        "--field",
        "Call Status=Answered",
        "--field",
        "Remarks=Call back",
        "--require",
        "Call Status",
        "--offline",
    ])
    .unwrap();

    let Commands::Submit(args) = cli.command else {
        panic!("expected submit command");
    };
    assert_eq!(args.fields.len(), 2);
    assert_eq!(args.required, vec!["Call Status".to_string()]);
    assert!(args.offline);
}

#[test]
fn remote_command_requires_exactly_one_scope() {
    assert!(Cli::try_parse_from(["dispo", "remote"]).is_err());
    assert!(Cli::try_parse_from(["dispo", "remote", "--customer", "c", "--agent", "a"]).is_err());

    let cli = Cli::try_parse_from(["dispo", "remote", "--lob", "lob-1", "--page", "2"]).unwrap();
    let Commands::Remote(args) = cli.command else {
        panic!("expected remote command");
    };
    let query = build_query(&args);
    assert_eq!(query.page, 2);
    assert_eq!(query.limit, 20);
    assert_eq!(
        query.scope,
        dispo_core::remote::QueryScope::LineOfBusiness("lob-1".to_string())
    );
}

#[test]
fn resolve_db_path_prefers_flag_then_environment() {
    let flag = PathBuf::from("/tmp/flag.db");
    let env = PathBuf::from("/tmp/env.db");
    assert_eq!(resolve_db_path(Some(flag.clone()), Some(env.clone())), flag);
    assert_eq!(resolve_db_path(None, Some(env.clone())), env);
    assert!(resolve_db_path(None, None).ends_with("dispo/dispo.db"));
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn summarize_fields_truncates_with_ellipsis() {
    let record = DispositionDraft::new(DispositionFields::fielded([
        ("Call Status", "Answered"),
        ("Remarks", "Customer asked for a call back next week"),
    ]))
    .into_record();

    assert_eq!(summarize_fields(&record, 20), "Call Status=Answe...");
    assert!(summarize_fields(&record, 200).ends_with("next week"));
}

#[test]
fn pending_lines_show_failure_bookkeeping() {
    let mut record = DispositionDraft::new(DispositionFields::flat([("status", "PTP")]))
        .with_customer("cust-1")
        .into_record();
    record.sync_attempts = 3;
    record.last_sync_error = Some("HTTP 503".to_string());

    let lines = format_record_lines(&[record.clone()], record.created_at);
    assert!(lines[0].contains("cust-1"));
    assert!(lines[0].contains("status=PTP"));
    assert!(lines[0].contains("attempts=3"));
    assert!(lines[0].contains("HTTP 503"));

    let synced = format_record_lines(&[record.into_synced()], 0);
    assert!(!synced[0].contains("attempts="));
}

#[test]
fn build_draft_requires_fields() {
    assert!(matches!(
        build_draft(&SubmitArgs::default()),
        Err(CliError::EmptyFields)
    ));

    let draft = build_draft(&submit_args(&[("Call Status", "Answered")])).unwrap();
    assert_eq!(draft.fields.get("Call Status"), Some("Answered"));
    assert_eq!(draft.customer_id.as_deref(), Some("cust-1"));
}

#[test]
fn describe_report_wording() {
    use dispo_core::sync::ReconcileReport;

    assert_eq!(describe_report(ReconcileReport::default()), "Nothing to sync");
    assert_eq!(
        describe_report(ReconcileReport { synced: 2, failed: 1 }),
        "Sync completed: 2 delivered, 1 still pending"
    );
}

#[test]
fn completions_name_the_binary() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("dispo"));
}

#[test]
fn load_seed_records_rejects_non_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.json");
    std::fs::write(&path, r#"{"not": "a list"}"#).unwrap();

    assert!(matches!(
        load_seed_records(&path),
        Err(CliError::InvalidSeed { .. })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn offline_submit_is_saved_to_pending() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_in(&dir);
    let mut args = submit_args(&[("Call Status", "Answered")]);
    args.offline = true;

    let outcome = submit_disposition(&ctx, args).await.unwrap();

    assert_eq!(outcome.placement, Placement::Queued(QueueReason::Offline));
    let service = ctx.open_service(Connectivity::ForcedOffline).await.unwrap();
    let pending = service.get_pending_dispositions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, outcome.record.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn online_submit_with_simulated_backend_is_synced() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_in(&dir);

    let outcome = submit_disposition(&ctx, submit_args(&[("Call Status", "Answered")]))
        .await
        .unwrap();

    assert!(outcome.placement.is_synced());
    let service = ctx.open_service(Connectivity::ForcedOffline).await.unwrap();
    assert_eq!(service.get_synced_dispositions().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_required_field_is_reported_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_in(&dir);
    let mut args = submit_args(&[("Call Status", "Answered")]);
    args.required = vec!["Call Status".to_string(), "Remarks".to_string()];

    let error = submit_disposition(&ctx, args).await.unwrap_err();

    assert!(matches!(
        &error,
        CliError::Core(Error::Validation { missing }) if missing == &vec!["Remarks".to_string()]
    ));
    assert_eq!(error.to_string(), "Missing required fields: Remarks");
}

#[tokio::test(flavor = "multi_thread")]
async fn history_merges_seeds_and_filters_by_customer() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_in(&dir);
    let mut args = submit_args(&[("Call Status", "Answered")]);
    args.offline = true;
    let queued = submit_disposition(&ctx, args).await.unwrap();

    let seed: DispositionRecord = DispositionDraft::new(DispositionFields::flat([("status", "PTP")]))
        .with_customer("cust-2")
        .into_record_at(chrono::DateTime::from_timestamp_millis(1_000).unwrap())
        .into_synced();
    let seed_path = dir.path().join("seed.json");
    std::fs::write(&seed_path, serde_json::to_string(&vec![seed.clone()]).unwrap()).unwrap();

    let mut args = history_args();
    args.seed = Some(seed_path);
    let all = load_history(&ctx, &args).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].record.id, queued.record.id);
    assert_eq!(all[0].badge, SyncBadge::Pending);
    assert_eq!(all[1].record.id, seed.id);
    assert_eq!(all[1].badge, SyncBadge::Synced);

    args.customer = Some("cust-2".to_string());
    let filtered = load_history(&ctx, &args).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].record.id, seed.id);
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context_in(&dir);
    let mut args = submit_args(&[("Call Status", "Answered")]);
    args.offline = true;
    submit_disposition(&ctx, args).await.unwrap();

    assert!(matches!(
        run_reset(&ctx, false).await,
        Err(CliError::ResetNotConfirmed)
    ));
    run_reset(&ctx, true).await.unwrap();

    let service = ctx.open_service(Connectivity::ForcedOffline).await.unwrap();
    assert!(service.get_all_dispositions().await.is_empty());
}
