use std::path::{Path, PathBuf};

use chrono::Utc;
use dispo_core::config::ClientConfig;
use dispo_core::history::{HistoryEntry, SyncBadge};
use dispo_core::models::FieldEntry;
use dispo_core::reachability::{ManualReachability, Reachability};
use dispo_core::remote::RemoteBackend;
use dispo_core::services::DispositionService;
use dispo_core::DispositionRecord;
use serde::Serialize;

use crate::error::CliError;

pub type ClientService = DispositionService<RemoteBackend, Reachability>;

/// Resolved settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: ClientConfig,
    pub db_path: PathBuf,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Connectivity {
    /// Use the configured probe
    Probe,
    /// Report offline no matter what
    ForcedOffline,
}

impl Context {
    pub fn new(cli_db_path: Option<PathBuf>, config: ClientConfig) -> Self {
        let db_path = resolve_db_path(cli_db_path, config.db_path.clone());
        Self { config, db_path }
    }

    pub async fn open_service(&self, connectivity: Connectivity) -> Result<ClientService, CliError> {
        let remote = self.config.remote_backend()?;
        let probe = match connectivity {
            Connectivity::Probe => self.config.reachability()?,
            Connectivity::ForcedOffline => Reachability::Manual(ManualReachability::offline()),
        };
        tracing::debug!(
            "Opening {} with {} backend",
            self.db_path.display(),
            remote.label()
        );
        Ok(DispositionService::open_path(self.db_path.clone(), remote, probe).await?)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, env_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or(env_db_path)
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dispo")
        .join("dispo.db")
}

#[derive(Debug, Serialize)]
pub struct DispositionListItem {
    pub id: String,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub agent_id: String,
    pub agent_name: String,
    pub line_of_business_id: Option<String>,
    pub date_contacted: String,
    pub created_at: i64,
    pub relative_time: String,
    pub synced: bool,
    pub sync_attempts: u32,
    pub last_sync_error: Option<String>,
    pub fields: Vec<FieldEntry>,
}

pub fn record_to_list_item(record: &DispositionRecord, now_ms: i64) -> DispositionListItem {
    DispositionListItem {
        id: record.id.to_string(),
        customer_id: record.customer_id.clone(),
        customer_name: record.customer_name.clone(),
        agent_id: record.agent_id.clone(),
        agent_name: record.agent_name.clone(),
        line_of_business_id: record.line_of_business_id.clone(),
        date_contacted: record.date_contacted.clone(),
        created_at: record.created_at,
        relative_time: format_relative_time(record.created_at, now_ms),
        synced: record.synced,
        sync_attempts: record.sync_attempts,
        last_sync_error: record.last_sync_error.clone(),
        fields: record.fields.to_entries(),
    }
}

pub fn print_records(records: &[DispositionRecord], as_json: bool, empty_message: &str) -> Result<(), CliError> {
    let now_ms = Utc::now().timestamp_millis();
    if as_json {
        let items = records
            .iter()
            .map(|record| record_to_list_item(record, now_ms))
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{empty_message}");
        return Ok(());
    }
    for line in format_record_lines(records, now_ms) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_record_lines(records: &[DispositionRecord], now_ms: i64) -> Vec<String> {
    records
        .iter()
        .map(|record| format_record_line(record, now_ms))
        .collect()
}

fn format_record_line(record: &DispositionRecord, now_ms: i64) -> String {
    let short_id = short_id(&record.id.to_string());
    let customer = customer_label(record);
    let summary = summarize_fields(record, 40);
    let relative_time = format_relative_time(record.created_at, now_ms);
    let line = format!("{short_id:<13}  {customer:<16}  {summary:<40}  {relative_time}");

    if record.synced || record.sync_attempts == 0 {
        line
    } else {
        let error = record.last_sync_error.as_deref().unwrap_or("unknown error");
        format!(
            "{line:<80}  attempts={} last_error={error}",
            record.sync_attempts
        )
    }
}

pub fn format_history_lines(entries: &[HistoryEntry], now_ms: i64) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let badge = match entry.badge {
                SyncBadge::Synced => "synced",
                SyncBadge::Pending => "pending",
            };
            format!("[{badge:<7}] {}", format_record_line(&entry.record, now_ms))
        })
        .collect()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

fn customer_label(record: &DispositionRecord) -> String {
    record
        .customer_name
        .as_deref()
        .or(record.customer_id.as_deref())
        .unwrap_or("-")
        .chars()
        .take(16)
        .collect()
}

/// `name=value` pairs joined by `, `, cut to `max_chars` with an ellipsis.
pub fn summarize_fields(record: &DispositionRecord, max_chars: usize) -> String {
    let joined = record
        .fields
        .to_entries()
        .iter()
        .map(|entry| format!("{}={}", entry.field_name, entry.field_value))
        .collect::<Vec<_>>()
        .join(", ");

    if joined.chars().count() <= max_chars {
        return joined;
    }
    let kept = max_chars.saturating_sub(3);
    let mut truncated = joined.chars().take(kept).collect::<String>();
    truncated.push_str("...");
    truncated
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Read extra history rows from a JSON array of stored dispositions.
pub fn load_seed_records(path: &Path) -> Result<Vec<DispositionRecord>, CliError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|error| CliError::InvalidSeed {
        path: path.display().to_string(),
        reason: error.to_string(),
    })
}
