//! Destinations for the per-cycle feed snapshot.

use std::path::PathBuf;

use feedwatch_types::FeedSnapshot;
use tokio::sync::mpsc;
use tracing::debug;

/// Where the monitor sends a [`FeedSnapshot`] after every aggregation cycle.
#[derive(Debug)]
pub enum Output {
    /// Pretty-printed JSON, overwritten each cycle.
    File(PathBuf),

    /// One line of JSON per cycle to a TCP listener. Best effort: a missing
    /// listener just skips the cycle.
    Tcp(String),

    /// In-process delivery. Full channels drop the snapshot.
    Channel(mpsc::Sender<FeedSnapshot>),
}

impl Output {
    /// ```rust
    /// use feedwatch_core::Output;
    ///
    /// let output = Output::file("feeds.json");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// A channel output together with its receiving end.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<FeedSnapshot>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    pub(crate) async fn emit(&self, snapshot: &FeedSnapshot) -> std::io::Result<()> {
        match self {
            Output::File(path) => {
                let json = serde_json::to_string_pretty(snapshot)?;
                tokio::fs::write(path, json).await?;
            }
            Output::Tcp(addr) => {
                use tokio::io::AsyncWriteExt;
                use tokio::net::TcpStream;

                match TcpStream::connect(addr).await {
                    Ok(mut stream) => {
                        let mut line = serde_json::to_vec(snapshot)?;
                        line.push(b'\n');
                        stream.write_all(&line).await?;
                    }
                    Err(e) => debug!(addr = %addr, error = %e, "Snapshot receiver unavailable"),
                }
            }
            Output::Channel(tx) => {
                if tx.try_send(snapshot.clone()).is_err() {
                    debug!("Snapshot channel full or closed, snapshot dropped");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedwatch_types::{DataType, Endpoint, FeedStatus, Identifier};

    fn snapshot() -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::new();
        snapshot.insert(FeedStatus::new(
            Endpoint::with_topic("127.0.0.1", 5555, "sensor1"),
            DataType::String,
        ));
        snapshot
    }

    #[tokio::test]
    async fn file_output_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        Output::file(&path).emit(&snapshot()).await.unwrap();

        let written: FeedSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written.get(&Identifier::from("127.0.0.1-5555-sensor1")).is_some());
    }

    #[tokio::test]
    async fn channel_output_delivers_and_never_blocks() {
        let (output, mut rx) = Output::channel(1);
        output.emit(&snapshot()).await.unwrap();
        output.emit(&snapshot()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn tcp_output_sends_one_line() {
        use tokio::io::AsyncBufReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let emit = tokio::spawn(async move { Output::tcp(addr).emit(&snapshot()).await });
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = tokio::io::BufReader::new(stream).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        emit.await.unwrap().unwrap();

        let received: FeedSnapshot = serde_json::from_str(&line).unwrap();
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn tcp_output_without_listener_is_not_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(Output::tcp(addr).emit(&snapshot()).await.is_ok());
    }
}
