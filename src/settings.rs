//! Daemon settings.
//!
//! Loaded from an optional file (TOML, YAML or JSON, picked by extension)
//! layered with `FEEDWATCH_*` environment variables. Nested keys use a
//! double underscore, e.g. `FEEDWATCH_MONITOR__INTERVAL=500ms`.
//!
//! ```toml
//! [monitor]
//! interval = "1s"
//! staleness = "5s"
//!
//! [recording]
//! directory = "recordings"
//! format = "timestamped"
//!
//! [outputs]
//! file = "feeds.json"
//!
//! [[feeds]]
//! address = "127.0.0.1"
//! port = 5555
//! topic = "sensor1"
//! data_type = "string"
//! record = true
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File};
use feedwatch_core::{
    DataType, Endpoint, FrameFormat, ListenerConfig, MonitorConfig, Output, RecordingConfig,
};
use serde::Deserialize;

use crate::duration::parse_duration;

pub const ENV_PREFIX: &str = "FEEDWATCH";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorSettings,
    pub recording: RecordingSettings,
    pub outputs: OutputSettings,
    pub feeds: Vec<FeedSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub interval: String,
    pub staleness: String,
    pub history: usize,
    pub backoff_initial: String,
    pub backoff_max: String,
    /// Empty disables idle reconnects.
    pub idle_reconnect: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: "1s".into(),
            staleness: "5s".into(),
            history: feedwatch_types::DEFAULT_HISTORY_CAPACITY,
            backoff_initial: "250ms".into(),
            backoff_max: "10s".into(),
            idle_reconnect: "30s".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub directory: PathBuf,
    pub format: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            format: "plain".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub file: Option<PathBuf>,
    pub tcp: Option<String>,
}

/// One feed to register at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedSettings {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub record: bool,
}

impl FeedSettings {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            address: self.address.clone(),
            port: self.port,
            topic: self.topic.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
            .as_deref()
            .map(|s| s.parse().unwrap_or_default())
            .unwrap_or_default()
    }
}

/// Parses the command-line form `address:port[/topic][=type]`.
impl FromStr for FeedSettings {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (endpoint, data_type) = match s.rsplit_once('=') {
            Some((endpoint, data_type)) => (endpoint, Some(data_type.to_string())),
            None => (s, None),
        };
        let endpoint: Endpoint = endpoint.parse()?;
        Ok(Self {
            address: endpoint.address,
            port: endpoint.port,
            topic: endpoint.topic,
            data_type,
            record: false,
        })
    }
}

impl Settings {
    /// Load from `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env_source())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(env)
            .build()
            .context("Failed to read settings")?;
        config
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let m = &self.monitor;
        let idle_reconnect = match m.idle_reconnect.trim() {
            "" => None,
            s => Some(parse_duration(s).context("monitor.idle_reconnect")?),
        };
        let format: FrameFormat = self
            .recording
            .format
            .parse()
            .map_err(|e: String| anyhow!(e))
            .context("recording.format")?;
        let backoff_initial = positive(parse_duration(&m.backoff_initial).context("monitor.backoff_initial")?)
            .context("monitor.backoff_initial")?;
        let backoff_max = positive(parse_duration(&m.backoff_max).context("monitor.backoff_max")?)
            .context("monitor.backoff_max")?;
        if backoff_initial > backoff_max {
            return Err(anyhow!(
                "monitor.backoff_initial ({}) exceeds monitor.backoff_max ({})",
                m.backoff_initial,
                m.backoff_max
            ));
        }

        Ok(MonitorConfig {
            aggregation_interval: positive(parse_duration(&m.interval).context("monitor.interval")?)
                .context("monitor.interval")?,
            history_capacity: m.history.max(1),
            health: feedwatch_core::HealthPolicy::new(
                parse_duration(&m.staleness).context("monitor.staleness")?,
            ),
            listener: ListenerConfig {
                backoff_initial,
                backoff_max,
                idle_reconnect,
            },
            recording: RecordingConfig {
                directory: self.recording.directory.clone(),
                format,
            },
        })
    }

    pub fn outputs(&self) -> Vec<Output> {
        let mut outputs = Vec::new();
        if let Some(path) = &self.outputs.file {
            outputs.push(Output::file(path.clone()));
        }
        if let Some(addr) = &self.outputs.tcp {
            outputs.push(Output::tcp(addr.clone()));
        }
        outputs
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn positive(d: std::time::Duration) -> Result<std::time::Duration> {
    if d.is_zero() {
        Err(anyhow!("must be greater than zero"))
    } else {
        Ok(d)
    }
}
