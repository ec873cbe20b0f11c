use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::tracker::{PositionSample, TrackMetadata, TrackerError};

/// Remote source of track metadata and the bootstrap position snapshot.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// `Ok(None)` means the server answered but had no single track to give.
    async fn fetch_track(&self, track_pk: &str) -> Result<Option<TrackMetadata>, TrackerError>;

    /// Latest known position of every active track, channel already resolved.
    async fn fetch_active_positions(&self) -> Result<Vec<PositionSample>, TrackerError>;
}

/// Fetch-once bookkeeping for track metadata. Failures are not cached.
#[derive(Debug, Default)]
pub struct TrackCache {
    entries: HashMap<String, TrackMetadata>,
    pending: HashSet<String>,
    failed: HashSet<String>,
}

impl TrackCache {
    pub fn get(&self, channel: &str) -> Option<&TrackMetadata> {
        self.entries.get(channel)
    }

    pub fn is_cached(&self, channel: &str) -> bool {
        self.entries.contains_key(channel)
    }

    /// Claims the fetch for a channel. False if cached or already in flight.
    pub fn begin(&mut self, channel: &str) -> bool {
        if self.is_cached(channel) || self.pending.contains(channel) {
            return false;
        }
        self.pending.insert(channel.to_string());
        true
    }

    pub fn complete(&mut self, channel: &str, metadata: TrackMetadata) {
        self.pending.remove(channel);
        self.failed.remove(channel);
        self.entries.insert(channel.to_string(), metadata);
    }

    pub fn fail(&mut self, channel: &str) {
        self.pending.remove(channel);
        self.failed.insert(channel.to_string());
    }

    pub fn needs_retry(&self, channel: &str) -> bool {
        self.failed.contains(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::SegmentBatch;

    fn metadata() -> TrackMetadata {
        TrackMetadata {
            track_pk: "7".into(),
            color: None,
            segments: SegmentBatch::default(),
        }
    }

    #[test]
    fn only_one_fetch_claim_at_a_time() {
        let mut cache = TrackCache::default();
        assert!(cache.begin("rover1"));
        assert!(!cache.begin("rover1"));
        cache.complete("rover1", metadata());
        assert!(!cache.begin("rover1"));
        assert!(cache.is_cached("rover1"));
    }

    #[test]
    fn failure_allows_retry() {
        let mut cache = TrackCache::default();
        assert!(cache.begin("rover1"));
        cache.fail("rover1");
        assert!(cache.needs_retry("rover1"));
        assert!(!cache.is_cached("rover1"));
        assert!(cache.begin("rover1"));
        cache.complete("rover1", metadata());
        assert!(!cache.needs_retry("rover1"));
    }
}
