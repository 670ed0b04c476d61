//! CLI entry point for the GTFS-RT slicer.
//!
//! Fetches a GTFS-Realtime payload (BODS by default) and writes either one
//! JSON file per matching stop or a single filtered feed.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gtfs_rt_slicer::config::{
    CredentialPlacement, DEFAULT_PREFIX, DEFAULT_SOURCE, OutputFormat, OutputTarget, RunConfig,
};
use gtfs_rt_slicer::pipeline::{self, RunReport};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gtfs_rt_slicer")]
#[command(about = "Slice GTFS-RT feeds down to the stops matching a prefix", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one JSON file per matching stop
    PerStop {
        /// Directory to write <stopId>.json files into
        #[arg(short, long, value_name = "DIR")]
        out_dir: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write a single feed pruned to the matching entities
    Filter {
        /// File to write the filtered feed to
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,

        /// Output format: json or binary
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Stop identifier prefix to keep
    #[arg(short, long, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Feed URL or path to a captured payload
    #[arg(short, long, value_name = "FILE_OR_URL", default_value = DEFAULT_SOURCE)]
    source: String,

    /// API key (falls back to BODS_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Where the key goes: header:<name> or query:<name>
    #[arg(long, default_value = "query:api_key")]
    credential: CredentialPlacement,
}

impl SourceArgs {
    fn into_config(self, target: OutputTarget) -> RunConfig {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("BODS_API_KEY").ok());
        RunConfig::new(self.prefix, self.source, target)
            .with_api_key(api_key)
            .with_credential(self.credential)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_slicer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_slicer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = match cli.command {
        Commands::PerStop { out_dir, source } => {
            source.into_config(OutputTarget::per_stop(out_dir, OutputFormat::Json)?)
        }
        Commands::Filter {
            out,
            format,
            source,
        } => source.into_config(OutputTarget::single_feed(out, format)),
    };

    if config.api_key.is_none() {
        info!("No API key supplied, requesting the source as is");
    }

    let report = pipeline::run(&config)
        .await
        .context("GTFS-RT slicing run failed")?;

    match report {
        RunReport::PerStop {
            files,
            fragments,
            matched,
        } => {
            info!(files = files.len(), fragments, matched, "Per-stop output written");
        }
        RunReport::SingleFeed {
            path,
            summary,
            matched,
        } => {
            info!(
                path = %path.display(),
                matched,
                kept_entities = summary.totals.kept_entities,
                total_entities = summary.totals.total_entities,
                kept_pct = format!("{:.1}", summary.totals.kept_entities_pct()),
                "Filtered feed written"
            );
        }
    }

    Ok(())
}
