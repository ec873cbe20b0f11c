use std::sync::Arc;

use super::broker::Broker;
use super::error::FeedError;

// The broker lists its own control channel alongside the real ones.
const BROKER_CHANNEL: &str = "sse";

/// Discovers which channels the broker currently carries.
pub struct ChannelRegistry {
    broker: Arc<dyn Broker>,
}

impl ChannelRegistry {
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self { broker }
    }

    /// Any failure here is a connectivity error; callers report it and stop.
    pub async fn list_channels(&self) -> Result<Vec<String>, FeedError> {
        let channels = self
            .broker
            .channels()
            .await
            .map_err(FeedError::into_connectivity)?;
        Ok(channels
            .into_iter()
            .filter(|channel| channel != BROKER_CHANNEL)
            .collect())
    }
}
