//! ZeroMQ SUB connector.

use std::time::Duration;

use async_trait::async_trait;
use feedwatch_types::Endpoint;
use tracing::debug;
use zeromq::{Socket, SocketRecv, SubSocket};

use super::{Connector, FeedMessage, FeedTransport};
use crate::error::TransportError;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects a ZeroMQ SUB socket per feed over TCP.
///
/// The socket keeps retrying a refused connection on its own, so a connect
/// that has not completed within `connect_timeout` is reported as
/// [`TransportError::Connect`] and left to the listener's backoff.
#[derive(Debug, Clone, Copy)]
pub struct ZmqConnector {
    connect_timeout: Duration,
}

impl ZmqConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for ZmqConnector {
    fn default() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for ZmqConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn FeedTransport>, TransportError> {
        let url = endpoint.connect_url();
        let connect_err = |e: zeromq::ZmqError| TransportError::Connect {
            endpoint: url.clone(),
            reason: e.to_string(),
        };

        let mut socket = SubSocket::new();
        match tokio::time::timeout(self.connect_timeout, socket.connect(&url)).await {
            Ok(connected) => connected.map_err(connect_err)?,
            Err(_) => {
                return Err(TransportError::Connect {
                    endpoint: url.clone(),
                    reason: format!("no connection within {:?}", self.connect_timeout),
                })
            }
        }
        socket
            .subscribe(endpoint.subscription())
            .await
            .map_err(connect_err)?;
        debug!(url = %url, topic = endpoint.subscription(), "SUB socket connected");

        Ok(Box::new(ZmqTransport { socket }))
    }
}

struct ZmqTransport {
    socket: SubSocket,
}

#[async_trait]
impl FeedTransport for ZmqTransport {
    async fn recv(&mut self) -> Result<FeedMessage, TransportError> {
        let message = self
            .socket
            .recv()
            .await
            .map_err(|e| TransportError::Receive(e.to_string()))?;
        Ok(FeedMessage::multipart(message.into_vec()))
    }
}
