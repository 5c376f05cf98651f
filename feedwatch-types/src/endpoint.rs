//! Endpoints and their canonical identifiers.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Rendering of an absent topic inside an [`Identifier`].
pub const NO_TOPIC_SENTINEL: &str = "None";

/// A remote publisher plus an optional topic filter.
///
/// `topic: None` subscribes to every message the publisher sends; `Some(t)`
/// only receives messages whose topic frame starts with `t`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub topic: Option<String>,
}

impl Endpoint {
    /// An endpoint that receives every message from `address:port`.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            topic: None,
        }
    }

    /// An endpoint filtered to messages whose topic starts with `topic`.
    pub fn with_topic(address: impl Into<String>, port: u16, topic: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port,
            topic: Some(topic.into()),
        }
    }

    /// The subscription prefix: empty when every message is wanted.
    pub fn subscription(&self) -> &str {
        self.topic.as_deref().unwrap_or("")
    }

    /// The `tcp://address:port` URL a subscriber connects to.
    pub fn connect_url(&self) -> String {
        format!("tcp://{}:{}", self.address, self.port)
    }

    /// Shorthand for [`identify`].
    pub fn identifier(&self) -> Identifier {
        identify(self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.topic {
            Some(topic) => write!(f, "{}:{}/{}", self.address, self.port, topic),
            None => write!(f, "{}:{}", self.address, self.port),
        }
    }
}

/// Error returned when parsing an `address:port[/topic]` string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEndpointError(String);

impl fmt::Display for ParseEndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid endpoint: {}", self.0)
    }
}

impl std::error::Error for ParseEndpointError {}

/// Parses `address:port` or `address:port/topic`.
///
/// Everything after the first `/` is the topic, so topics may contain `/`.
impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host_port, topic) = match s.split_once('/') {
            Some((hp, topic)) => (hp, Some(topic.to_string())),
            None => (s, None),
        };
        let (address, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| ParseEndpointError(format!("missing port in {:?}", s)))?;
        if address.is_empty() {
            return Err(ParseEndpointError(format!("missing address in {:?}", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| ParseEndpointError(format!("bad port in {:?}: {}", s, e)))?;
        Ok(Self {
            address: address.to_string(),
            port,
            topic,
        })
    }
}

/// Canonical key for a feed, derived from its [`Endpoint`].
///
/// Identifiers are stable across process restarts, so they are safe to use
/// as recording file names and route keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Identifier(s)
    }
}

/// Map an endpoint to its canonical identifier.
///
/// The form is `address-port-topic`, with [`NO_TOPIC_SENTINEL`] standing in
/// for an absent topic. Characters that would make the split ambiguous are
/// percent-escaped: `%` and `-` in the address, `%` in the topic, and a topic
/// literally named `None` becomes `%4Eone`. Ordinary endpoints are unaffected.
pub fn identify(endpoint: &Endpoint) -> Identifier {
    let address = escape(&endpoint.address, &['%', '-']);
    let topic = match &endpoint.topic {
        None => NO_TOPIC_SENTINEL.to_string(),
        Some(topic) => {
            let escaped = escape(topic, &['%']);
            if escaped == NO_TOPIC_SENTINEL {
                "%4Eone".to_string()
            } else {
                escaped
            }
        }
    };
    Identifier(format!("{}-{}-{}", address, endpoint.port, topic))
}

fn escape(s: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if reserved.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_endpoint_uses_dash_form() {
        let e = Endpoint::with_topic("127.0.0.1", 5555, "sensor1");
        assert_eq!(identify(&e).as_str(), "127.0.0.1-5555-sensor1");
    }

    #[test]
    fn absent_topic_uses_sentinel() {
        let e = Endpoint::new("localhost", 6000);
        assert_eq!(identify(&e).as_str(), "localhost-6000-None");
    }

    #[test]
    fn identify_is_deterministic() {
        let a = Endpoint::with_topic("10.0.0.2", 7000, "cam/front");
        let b = a.clone();
        assert_eq!(identify(&a), identify(&b));
        assert_eq!(a.identifier(), identify(&b));
    }

    #[test]
    fn differing_fields_give_differing_identifiers() {
        let endpoints = [
            Endpoint::with_topic("a-1", 2, "x"),
            Endpoint::with_topic("a", 1, "2-x"),
            Endpoint::new("host", 1),
            Endpoint::with_topic("host", 1, "None"),
            Endpoint::with_topic("host", 1, "%4Eone"),
            Endpoint::with_topic("host", 1, ""),
            Endpoint::with_topic("host", 2, ""),
            Endpoint::with_topic("host%2D", 1, "t"),
            Endpoint::with_topic("host-", 1, "t"),
            Endpoint::with_topic("my-host", 5555, "t"),
        ];
        for (i, a) in endpoints.iter().enumerate() {
            for (j, b) in endpoints.iter().enumerate() {
                assert_eq!(
                    identify(a) == identify(b),
                    i == j,
                    "{:?} vs {:?} -> {} / {}",
                    a,
                    b,
                    identify(a),
                    identify(b)
                );
            }
        }
    }

    #[test]
    fn hyphenated_host_is_escaped() {
        let e = Endpoint::with_topic("my-host", 5555, "t");
        assert_eq!(identify(&e).as_str(), "my%2Dhost-5555-t");
    }

    #[test]
    fn parse_endpoint_forms() {
        let e: Endpoint = "127.0.0.1:5555".parse().unwrap();
        assert_eq!(e, Endpoint::new("127.0.0.1", 5555));

        let e: Endpoint = "broker:7000/cams/front".parse().unwrap();
        assert_eq!(e, Endpoint::with_topic("broker", 7000, "cams/front"));

        assert!("nohost".parse::<Endpoint>().is_err());
        assert!(":5555".parse::<Endpoint>().is_err());
        assert!("host:99999".parse::<Endpoint>().is_err());
    }

    #[test]
    fn subscription_prefix_and_url() {
        let e = Endpoint::with_topic("127.0.0.1", 5555, "topic0");
        assert_eq!(e.subscription(), "topic0");
        assert_eq!(e.connect_url(), "tcp://127.0.0.1:5555");
        assert_eq!(Endpoint::new("h", 1).subscription(), "");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn identifier_serializes_as_plain_string() {
        let id = identify(&Endpoint::with_topic("h", 1, "t"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"h-1-t\"");
    }
}
