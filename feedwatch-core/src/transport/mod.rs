//! Transport seam between feed listeners and the bus.
//!
//! A [`Connector`] opens one subscription per feed; the resulting
//! [`FeedTransport`] yields messages until it fails or is dropped. The
//! listener owns reconnects, so transports never retry on their own.

mod channel;
#[cfg(feature = "zmq")]
mod zmq;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use feedwatch_types::Endpoint;

use crate::error::TransportError;

pub use channel::ChannelConnector;
#[cfg(feature = "zmq")]
pub use self::zmq::ZmqConnector;

/// One message as received from the bus, split into its frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub frames: Vec<Bytes>,
}

impl FeedMessage {
    /// A single-frame message. The topic, if any, is a prefix of the frame.
    pub fn single(frame: impl Into<Bytes>) -> Self {
        Self {
            frames: vec![frame.into()],
        }
    }

    pub fn multipart(frames: Vec<Bytes>) -> Self {
        Self { frames }
    }

    /// Whether the message belongs to a subscription.
    ///
    /// The first frame must start with the subscription string; an empty
    /// subscription matches everything.
    pub fn matches(&self, subscription: &str) -> bool {
        if subscription.is_empty() {
            return true;
        }
        self.frames
            .first()
            .map(|f| f.starts_with(subscription.as_bytes()))
            .unwrap_or(false)
    }

    /// The bytes stored as the feed's latest value.
    ///
    /// A single frame is kept whole. For multipart messages the first frame is
    /// the topic and the remaining frames are joined.
    pub fn payload(&self) -> Bytes {
        match self.frames.as_slice() {
            [] => Bytes::new(),
            [only] => only.clone(),
            [_, only] => only.clone(),
            [_, rest @ ..] => {
                let mut joined = BytesMut::with_capacity(rest.iter().map(Bytes::len).sum());
                for frame in rest {
                    joined.extend_from_slice(frame);
                }
                joined.freeze()
            }
        }
    }
}

/// A live subscription to one feed.
#[async_trait]
pub trait FeedTransport: Send {
    /// Wait for the next message.
    async fn recv(&mut self) -> Result<FeedMessage, TransportError>;
}

/// Opens subscriptions.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connect to `endpoint` and subscribe to its topic.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn FeedTransport>, TransportError>;
}

/// The connector used when none is configured.
pub fn default_connector() -> Arc<dyn Connector> {
    #[cfg(feature = "zmq")]
    {
        Arc::new(ZmqConnector::new())
    }
    #[cfg(not(feature = "zmq"))]
    {
        Arc::new(ChannelConnector::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_frame_payload_is_whole_frame() {
        let msg = FeedMessage::single("sensor1 hello1");
        assert_eq!(msg.payload(), Bytes::from_static(b"sensor1 hello1"));
    }

    #[test]
    fn multipart_payload_skips_topic_frame() {
        let msg = FeedMessage::multipart(vec![
            Bytes::from_static(b"cam"),
            Bytes::from_static(b"ab"),
            Bytes::from_static(b"cd"),
        ]);
        assert_eq!(msg.payload(), Bytes::from_static(b"abcd"));

        let two = FeedMessage::multipart(vec![Bytes::from_static(b"cam"), Bytes::from_static(b"x")]);
        assert_eq!(two.payload(), Bytes::from_static(b"x"));
    }

    #[test]
    fn empty_message_has_empty_payload() {
        assert!(FeedMessage::multipart(vec![]).payload().is_empty());
    }

    #[test]
    fn topic_prefix_matching() {
        let msg = FeedMessage::single("sensor1 data");
        assert!(msg.matches(""));
        assert!(msg.matches("sensor"));
        assert!(msg.matches("sensor1"));
        assert!(!msg.matches("sensor2"));
        assert!(!FeedMessage::multipart(vec![]).matches("x"));
    }
}
