use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};
use event_scraper::{scrape_events, ErrorPolicy, RunOptions, CHAMBER_ORGANIZER_URL_PREFIX};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Target {
    /// ChamberOrganizer calendar event pages
    #[value(name = "chamberorganizer")]
    ChamberOrganizer,
}

#[derive(Parser)]
#[command(name = "event_scraper", about = "Scrape labelled event pages over an id range into CSV")]
struct Cli {
    /// List all targets available
    #[arg(long)]
    list: bool,

    /// The target to scrape
    #[arg(long, value_enum, default_value_t = Target::ChamberOrganizer)]
    target: Target,

    /// The lower id (inclusive)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    lower_id: i64,

    /// The upper id (exclusive)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    upper_id: i64,

    /// The output file to write to
    #[arg(long, default_value = "output.csv")]
    output: PathBuf,

    /// Layout schema file (.json/.toml) or inline JSON
    #[arg(long)]
    schema: Option<String>,

    #[arg(long, default_value = CHAMBER_ORGANIZER_URL_PREFIX)]
    url_prefix: String,

    /// fail-fast or continue
    #[arg(long, default_value_t = ErrorPolicy::FailFast)]
    on_error: ErrorPolicy,

    /// Per-request timeout in seconds (none by default)
    #[arg(long)]
    timeout: Option<u64>,

    /// Pages fetched at once
    #[cfg(feature = "multi_thread")]
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

fn list_targets() {
    println!("targets available:");
    for target in Target::value_variants() {
        if let Some(value) = target.to_possible_value() {
            println!("{}", value.get_name());
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    if cli.list {
        list_targets();
        return Ok(());
    }

    match cli.target {
        Target::ChamberOrganizer => {
            let options = RunOptions {
                lower_id: cli.lower_id,
                upper_id: cli.upper_id,
                output: cli.output,
                url_prefix: cli.url_prefix,
                schema: cli.schema,
                policy: cli.on_error,
                timeout: cli.timeout.map(Duration::from_secs),
                #[cfg(feature = "multi_thread")]
                concurrency: cli.concurrency,
            };
            let batch = scrape_events(&options)?;
            info!(
                "{} of {} pages held an event ({} skipped, {} failed)",
                batch.record_count(),
                batch.len(),
                batch.skipped_count(),
                batch.failed_count()
            );
        }
    }
    Ok(())
}
