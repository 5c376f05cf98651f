//! Declared payload types.

use std::fmt;
use std::str::FromStr;

/// The payload type a feed was declared with.
///
/// Consumers use this to decide how to present the latest payload
/// (as text, as an image, or as an opaque blob).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    String,
    Image,
    #[default]
    Unknown,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Image => "Image",
            DataType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing is lenient: matching is case-insensitive and anything
/// unrecognised becomes [`DataType::Unknown`].
impl FromStr for DataType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => DataType::String,
            "image" | "img" => DataType::Image,
            _ => DataType::Unknown,
        };
        Ok(parsed)
    }
}
