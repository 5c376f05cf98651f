//! # feedwatch
//!
//! Daemon around [`feedwatch_core`]: loads [`Settings`], registers the
//! configured feeds, runs the monitor and writes snapshots to the configured
//! outputs until interrupted.
//!
//! ```text
//!  settings file ─┐
//!  FEEDWATCH_* ───┼─▶ Settings ─▶ FeedMonitor ─┬─▶ listeners (one per feed)
//!  --flags ───────┘                            ├─▶ aggregator ─▶ outputs
//!                                              └─▶ recordings (<dir>/<id>.rec)
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Ad-hoc feeds
//! feedwatch --feed 127.0.0.1:5555/sensor1=string --feed 127.0.0.1:5556
//!
//! # From a settings file, snapshots to a JSON file
//! feedwatch --config feedwatch.toml --output-file feeds.json
//! ```
//!
//! ### As a library
//!
//! ```
//! use feedwatch::{build_monitor, Settings};
//!
//! let mut settings = Settings::default();
//! settings.feeds.push("127.0.0.1:5555/sensor1=string".parse().unwrap());
//!
//! let monitor = build_monitor(&settings).unwrap();
//! assert_eq!(monitor.list().len(), 1);
//!
//! # tokio_test::block_on(async {
//! monitor.start().unwrap();
//! // ... feeds are listened to until shutdown ...
//! monitor.shutdown().await;
//! # });
//! ```

pub mod duration;
pub mod settings;

use anyhow::Result;
use feedwatch_core::FeedMonitor;
use tracing::info;

pub use duration::{format_duration, parse_duration};
pub use settings::{FeedSettings, Settings};

/// Build a monitor from settings and register every configured feed.
///
/// Feeds marked `record` start recording immediately. The monitor is not
/// started.
pub fn build_monitor(settings: &Settings) -> Result<FeedMonitor> {
    let config = settings.monitor_config()?;
    let mut builder = FeedMonitor::builder().config(config);
    for output in settings.outputs() {
        builder = builder.output(output);
    }
    let monitor = builder.build();

    for feed in &settings.feeds {
        let id = monitor.register(feed.endpoint(), feed.data_type());
        if feed.record {
            monitor.start_recording(&id);
        }
    }
    info!(feeds = monitor.list().len(), "Feeds configured");
    Ok(monitor)
}
