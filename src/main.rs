use clap::Parser;
use tracing_subscriber::EnvFilter;

use reconlens::cli::{self, Commands, LogFormat};
use reconlens::errors::ReconError;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.with_ansi(!cli.no_color).init(),
    }
    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let result = match cli.command {
        Commands::Scan(args) => cli::scan::handle_scan(args).await,
        Commands::Enqueue(args) => cli::enqueue::handle_enqueue(args).await,
        Commands::Worker(args) => cli::worker::handle_worker(args).await,
        Commands::Query(args) => cli::query::handle_query(args).await,
        Commands::WatchEmail(args) => cli::enqueue::handle_watch_email(args).await,
        Commands::Validate(args) => cli::handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let exit_code = match &e {
            ReconError::Config(_) => 2,
            ReconError::InvalidTarget(_) => 5,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
