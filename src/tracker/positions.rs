use std::collections::HashMap;

use crate::tracker::PositionSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Created,
    Modified,
}

/// Latest raw sample per channel.
#[derive(Debug, Default)]
pub struct PositionStore {
    latest: HashMap<String, PositionSample>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample. An older sample than the one held does not replace
    /// it, but still counts as a modification.
    pub fn update(&mut self, sample: PositionSample) -> UpdateKind {
        match self.latest.get_mut(&sample.channel) {
            Some(current) => {
                if sample.timestamp >= current.timestamp {
                    *current = sample;
                }
                UpdateKind::Modified
            }
            None => {
                self.latest.insert(sample.channel.clone(), sample);
                UpdateKind::Created
            }
        }
    }

    /// First writer wins: returns false if the channel already has a sample.
    pub fn insert_if_absent(&mut self, sample: PositionSample) -> bool {
        if self.latest.contains_key(&sample.channel) {
            return false;
        }
        self.latest.insert(sample.channel.clone(), sample);
        true
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.latest.contains_key(channel)
    }

    pub fn latest(&self, channel: &str) -> Option<&PositionSample> {
        self.latest.get(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }
}
