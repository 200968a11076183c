//! rgdi-replay: entry point.
//!
//! ```text
//! rgdi-replay --input <file>            Replay a recording
//! rgdi-replay --input <file> --json     Print the summary as JSON
//! rgdi-replay --config <path>           Use custom config TOML
//! rgdi-replay --gen-config [path]       Write default config (stdout if no path) and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rgdi_replay::config::ReplayConfig;
use rgdi_replay::present::{AckSummary, spawn_ack_collector};
use rgdi_replay::stream::{read_stream, records};
use rgdi_replay::{ReplayStats, Replayer};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rgdi-replay", about = "Replay recorded remote desktop updates")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rgdi-replay.toml")]
    config: PathBuf,

    /// Recording to replay (plain or zstd-compressed).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Write the primary surface to this PNG (overrides config).
    #[arg(short, long)]
    dump: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,

    /// Write the default configuration to PATH (stdout when omitted) and exit.
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "-")]
    gen_config: Option<PathBuf>,
}

#[derive(Serialize)]
struct Summary<'a> {
    stats: &'a ReplayStats,
    acks: AckSummary,
    dirty_rects: usize,
    dirty_area: u64,
    fingerprint: Option<String>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(path) = cli.gen_config {
        if path.as_os_str() == "-" {
            println!("{}", ReplayConfig::default().to_toml()?);
        } else {
            ReplayConfig::write_default(&path)?;
        }
        return Ok(());
    }

    let config = ReplayConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rgdi-replay v{}", env!("CARGO_PKG_VERSION"));

    let Some(input) = cli.input else {
        error!("no input recording given (use --input)");
        return Err("missing --input".into());
    };

    let data = read_stream(&input).await?;
    info!(path = %input.display(), bytes = data.len(), "recording loaded");

    let mut replayer = Replayer::new(&config)?;
    let (mut acks, collector) = spawn_ack_collector();
    let stats = replayer.run(records(data.as_slice()), &mut acks).await?.clone();
    drop(acks);
    let acks = collector.await?;

    let dump = cli.dump.or_else(|| {
        (!config.output.dump_png.is_empty()).then(|| PathBuf::from(&config.output.dump_png))
    });
    if let Some(path) = dump {
        replayer.dump_png(&path)?;
        info!(path = %path.display(), "primary surface dumped");
    }

    let summary = Summary {
        stats: &stats,
        acks,
        dirty_rects: replayer.dirty().len(),
        dirty_area: replayer.dirty().area(),
        fingerprint: config.output.print_fingerprint.then(|| replayer.fingerprint()),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "records: {}  orders: {}  surface updates: {}  failures: {}",
            stats.records, stats.orders, stats.surface_updates, stats.failures
        );
        println!(
            "acks: {}  last frame: {:?}  dirty rects: {}",
            summary.acks.count, summary.acks.last, summary.dirty_rects
        );
        if let Some(fp) = &summary.fingerprint {
            println!("primary: {fp}");
        }
    }

    Ok(())
}
