use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid color: {0}")]
    InvalidColor(String),
    #[error("geometry transform failed: {0}")]
    Transform(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
}
