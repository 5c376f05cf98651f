//! Snapshot schema version.

use std::fmt;

use crate::SCHEMA_VERSION;

/// `major.minor` version stamped on every [`FeedSnapshot`](crate::FeedSnapshot).
///
/// Readers accept any snapshot with their own major version; a new minor
/// only adds fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
}

impl SchemaVersion {
    pub const fn current() -> Self {
        Self {
            major: SCHEMA_VERSION,
            minor: 0,
        }
    }

    /// Whether a reader built against this crate can decode `self`.
    pub fn is_compatible(&self) -> bool {
        self.major == SCHEMA_VERSION
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_decides_compatibility() {
        assert!(SchemaVersion::current().is_compatible());
        assert!(SchemaVersion { major: SCHEMA_VERSION, minor: 7 }.is_compatible());
        assert!(!SchemaVersion { major: SCHEMA_VERSION + 1, minor: 0 }.is_compatible());
    }

    #[test]
    fn displays_dotted() {
        assert_eq!(SchemaVersion { major: 1, minor: 2 }.to_string(), "1.2");
    }
}
