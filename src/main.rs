use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use feedwatch::{build_monitor, format_duration, parse_duration, FeedSettings, Settings};
use feedwatch_core::LivenessState;
use feedwatch_types::SchemaVersion;

#[derive(Parser, Debug)]
#[command(name = "feedwatch")]
#[command(about = "Watch pub/sub feeds: latest values, throughput, liveness and recordings")]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Feed to watch, as address:port[/topic][=type]. Repeatable.
    #[arg(short, long = "feed", value_name = "FEED")]
    feeds: Vec<FeedSettings>,

    /// Aggregation interval (e.g., "1s", "500ms")
    #[arg(short, long)]
    interval: Option<String>,

    /// Silence after which a feed counts as disconnected (e.g., "5s")
    #[arg(long)]
    staleness: Option<String>,

    /// Directory for recording files
    #[arg(long)]
    record_dir: Option<PathBuf>,

    /// Recording frame layout: plain or timestamped
    #[arg(long)]
    frame_format: Option<String>,

    /// Record every feed given with --feed
    #[arg(long)]
    record: bool,

    /// Write a JSON snapshot to this file every interval
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Send a JSON snapshot line to this TCP address every interval
    #[arg(long)]
    output_tcp: Option<String>,

    /// Run for this long, print a final snapshot as JSON and exit
    #[arg(long)]
    run_for: Option<String>,

    /// Log filter (e.g., "info", "feedwatch_core=debug"); RUST_LOG wins if set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = &self.interval {
            settings.monitor.interval = interval.clone();
        }
        if let Some(staleness) = &self.staleness {
            settings.monitor.staleness = staleness.clone();
        }
        if let Some(dir) = &self.record_dir {
            settings.recording.directory = dir.clone();
        }
        if let Some(format) = &self.frame_format {
            settings.recording.format = format.clone();
        }
        if let Some(path) = &self.output_file {
            settings.outputs.file = Some(path.clone());
        }
        if let Some(addr) = &self.output_tcp {
            settings.outputs.tcp = Some(addr.clone());
        }
        for feed in &self.feeds {
            let mut feed = feed.clone();
            feed.record = self.record;
            settings.feeds.push(feed);
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    if settings.feeds.is_empty() {
        warn!("No feeds configured; use --feed or a settings file");
    }

    let run_for = args
        .run_for
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("--run-for")?;

    let monitor = build_monitor(&settings)?;
    monitor.start()?;
    info!(
        interval = %format_duration(monitor.config().aggregation_interval),
        staleness = %format_duration(monitor.config().health.staleness_threshold),
        schema = %SchemaVersion::current(),
        "Watching {} feeds",
        monitor.list().len()
    );

    let mut summary = tokio::time::interval(Duration::from_secs(10));
    summary.tick().await;
    let deadline = async {
        match run_for {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = summary.tick() => {
                let snapshot = monitor.snapshot();
                info!(
                    connected = snapshot.count(LivenessState::Connected),
                    disconnected = snapshot.count(LivenessState::Disconnected),
                    unknown = snapshot.count(LivenessState::Unknown),
                    msgs_per_sec = snapshot.total_message_rate(),
                    "Feed summary"
                );
            }
            _ = &mut deadline => break,
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl+C");
                }
                info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    monitor.shutdown().await;

    if run_for.is_some() {
        let snapshot = monitor.snapshot();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}
