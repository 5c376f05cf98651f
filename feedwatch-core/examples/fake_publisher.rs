//! Example: a set of fake ZeroMQ publishers to monitor
//!
//! Binds one PUB socket per feed on consecutive ports starting at 5555.
//! Feed `i` publishes `"topic{i} message{i}{counter}"` every `i / 2`
//! seconds (at least 50ms), so the feeds run at visibly different rates.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p feedwatch-core --example fake_publisher -- 10
//! ```
//!
//! Then point the daemon at them:
//!
//! ```bash
//! cargo run -- --feed 127.0.0.1:5555/topic0 --feed 127.0.0.1:5556/topic1
//! ```

use std::env;
use std::time::Duration;

use zeromq::{PubSocket, Socket, SocketSend, ZmqMessage};

const BASE_PORT: u16 = 5555;

async fn publish(index: u16) -> Result<(), zeromq::ZmqError> {
    let port = BASE_PORT + index;
    let mut socket = PubSocket::new();
    socket.bind(&format!("tcp://0.0.0.0:{}", port)).await?;

    let period = Duration::from_millis(500 * index as u64).max(Duration::from_millis(50));
    let mut ticker = tokio::time::interval(period);
    let mut counter = 0u64;

    loop {
        ticker.tick().await;
        counter += 1;
        let message = format!("topic{} message{}{}", index, index, counter);
        socket.send(ZmqMessage::from(message)).await?;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let count: u16 = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(10);

    println!("Publishing {} fake feeds on ports {}..{}", count, BASE_PORT, BASE_PORT + count);
    println!("Press Ctrl+C to stop\n");

    for index in 0..count {
        tokio::spawn(async move {
            if let Err(e) = publish(index).await {
                tracing::error!(port = BASE_PORT + index, error = %e, "Publisher failed");
            }
        });
    }

    let _ = tokio::signal::ctrl_c().await;
    println!("Ctrl+C received. Exiting...");
}
