//! Backend liveness.

use std::time::Duration;

use futures::Stream;
use tracing::debug;

use crate::client::ChatClient;
use crate::error::Result;
use crate::protocol::{PingResponse, SERVER_OK_STATUS};

pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// The backend and its model are reachable.
    Connected { vision: bool },
    /// The backend answered but its model is not available.
    Degraded,
    /// The backend could not be reached.
    Disconnected,
}

impl ServerStatus {
    pub fn from_ping(result: Result<PingResponse>) -> Self {
        match result {
            Ok(ping) if ping.status == SERVER_OK_STATUS => ServerStatus::Connected {
                vision: ping.vision_available,
            },
            Ok(ping) => {
                debug!("Backend reported status {:?}", ping.status);
                ServerStatus::Degraded
            }
            Err(e) => {
                debug!("Ping failed: {e}");
                ServerStatus::Disconnected
            }
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            ServerStatus::Connected { vision: true } => "Server connected (Vision enabled)",
            ServerStatus::Connected { vision: false } => "Server connected",
            ServerStatus::Degraded => "Ollama disconnected",
            ServerStatus::Disconnected => "Server disconnected",
        }
    }
}

/// Ping once.
pub async fn check_status(client: &ChatClient) -> ServerStatus {
    ServerStatus::from_ping(client.ping().await)
}

/// Poll `/ping` immediately and then every `interval`.
pub fn watch_status(client: ChatClient, interval: Duration) -> impl Stream<Item = ServerStatus> {
    async_stream::stream! {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            yield check_status(&client).await;
        }
    }
}
