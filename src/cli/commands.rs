use clap::{Args, Parser, Subcommand, ValueEnum};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "reconlens", version, long_version = LONG_VERSION, about = "Domain reconnaissance and risk scoring")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a domain now, without going through the queue
    Scan(ScanArgs),
    /// Queue a scan for a worker to pick up
    Enqueue(EnqueueArgs),
    /// Process queued scans
    Worker(WorkerArgs),
    /// Show a stored scan and its latest risk assessment
    Query(QueryArgs),
    /// Add an email address to a tenant's breach watch list
    WatchEmail(WatchEmailArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Where configuration and state come from.
#[derive(Args, Clone, Default)]
pub struct StoreArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQLite database path (overrides database.path)
    #[arg(long)]
    pub db: Option<String>,
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Domain or URL to scan
    pub domain: String,

    /// Comma-separated stages: port-scan, ssl-check, subdomain-enum,
    /// directory-scan, breach-check, risk-calc (default: all)
    #[arg(short, long, default_value = "")]
    pub types: String,

    /// Tenant owning the scan
    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone)]
pub struct EnqueueArgs {
    /// Domain or URL to scan
    pub domain: String,

    /// Comma-separated stages (default: all)
    #[arg(short, long, default_value = "")]
    pub types: String,

    /// Tenant owning the scan
    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Higher values are dequeued first
    #[arg(long, default_value = "0")]
    pub priority: i32,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone)]
pub struct WorkerArgs {
    /// Concurrent scans (overrides worker.concurrency)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Exit once the queue is empty
    #[arg(long)]
    pub drain: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone)]
pub struct QueryArgs {
    /// Scan ID to show
    #[arg(required_unless_present = "jobs")]
    pub scan_id: Option<String>,

    /// List recent queue jobs instead
    #[arg(long)]
    pub jobs: bool,

    /// Number of jobs to list
    #[arg(long, default_value = "20")]
    pub limit: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone)]
pub struct WatchEmailArgs {
    pub tenant: String,

    pub email: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
