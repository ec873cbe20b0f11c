use thiserror::Error;

use crate::tracker::TrackerError;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("cannot reach broker: {0}")]
    Connectivity(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid payload: {0}")]
    Payload(#[from] TrackerError),
}

impl FeedError {
    /// Folds any failure into a connectivity error, keeping its message.
    pub fn into_connectivity(self) -> Self {
        match self {
            FeedError::Connectivity(_) => self,
            other => FeedError::Connectivity(other.to_string()),
        }
    }
}
