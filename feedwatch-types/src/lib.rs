//! # feedwatch-types
//!
//! Core types for pub/sub feed monitoring. This crate defines the vocabulary
//! shared by the monitoring core, the daemon, and anything that consumes
//! feedwatch snapshots (dashboards, routing tables, recorders).
//!
//! ## Design Goals
//!
//! - **No required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON and friends
//! - **Stable addressing**: An [`Endpoint`] always maps to the same [`Identifier`],
//!   so identifiers can be used as file names, route keys and map keys
//! - **Versioned snapshots**: [`FeedSnapshot`] carries a [`SchemaVersion`]
//!
//! ## Features
//!
//! - `serde`: serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use feedwatch_types::{identify, Endpoint};
//!
//! let endpoint = Endpoint::with_topic("127.0.0.1", 5555, "sensor1");
//! assert_eq!(identify(&endpoint).as_str(), "127.0.0.1-5555-sensor1");
//!
//! let all = Endpoint::new("127.0.0.1", 5556);
//! assert_eq!(identify(&all).as_str(), "127.0.0.1-5556-None");
//! ```

mod data_type;
mod endpoint;
mod liveness;
mod metrics;
mod snapshot;
mod version;

pub use data_type::*;
pub use endpoint::*;
pub use liveness::*;
pub use metrics::*;
pub use snapshot::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const SCHEMA_VERSION: u32 = 1;
