use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "dispo")]
#[command(about = "Record call dispositions, offline first")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a disposition for a call
    Submit(SubmitArgs),
    /// List dispositions waiting to be delivered
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List delivered dispositions
    Synced {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the merged history of delivered and pending dispositions
    History(HistoryArgs),
    /// Deliver pending dispositions once
    Sync {
        /// Treat the network as unavailable
        #[arg(long)]
        offline: bool,
    },
    /// Keep delivering pending dispositions until interrupted
    Watch {
        /// Seconds between passes (defaults to DISPO_SYNC_INTERVAL_SECS)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
        interval: Option<u64>,
    },
    /// Fetch dispositions stored on the remote endpoint
    Remote(RemoteArgs),
    /// Delete every locally stored disposition
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Customer the call was about
    #[arg(long, value_name = "ID")]
    pub customer: Option<String>,
    /// Customer display name
    #[arg(long, value_name = "NAME")]
    pub customer_name: Option<String>,
    /// Agent identifier
    #[arg(long, value_name = "ID")]
    pub agent_id: Option<String>,
    /// Agent display name
    #[arg(long, value_name = "NAME")]
    pub agent_name: Option<String>,
    /// Line of business
    #[arg(long, value_name = "ID")]
    pub lob: Option<String>,
    /// Form answer, repeatable
    #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field_pair)]
    pub fields: Vec<(String, String)>,
    /// Field that must be answered, repeatable
    #[arg(long = "require", value_name = "NAME")]
    pub required: Vec<String>,
    /// Queue the disposition without contacting the remote endpoint
    #[arg(long)]
    pub offline: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: usize,
    /// Rows per page
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=500))]
    pub page_size: u64,
    /// Only show this customer
    #[arg(long, value_name = "ID")]
    pub customer: Option<String>,
    /// Only show this line of business
    #[arg(long, value_name = "ID")]
    pub lob: Option<String>,
    /// JSON file of extra records to merge in
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    #[command(flatten)]
    pub scope: RemoteScopeArgs,
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: usize,
    /// Items per page
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..=100))]
    pub limit: u64,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct RemoteScopeArgs {
    /// Dispositions for a customer
    #[arg(long, value_name = "ID")]
    pub customer: Option<String>,
    /// Dispositions for a line of business
    #[arg(long, value_name = "ID")]
    pub lob: Option<String>,
    /// Dispositions recorded by an agent
    #[arg(long, value_name = "ID")]
    pub agent: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

/// Parse `name=value`. The name is trimmed and must not be empty; the value
/// is kept as typed.
pub fn parse_field_pair(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(format!("expected NAME=VALUE, got '{raw}'"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err("field name must not be empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}
