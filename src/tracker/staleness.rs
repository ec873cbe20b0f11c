use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeSet, HashMap};

use crate::tracker::{ChannelState, PositionStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub channel: String,
    pub from: ChannelState,
    pub to: ChannelState,
}

impl Transition {
    pub fn touches_stale(&self) -> bool {
        self.from == ChannelState::Stale || self.to == ChannelState::Stale
    }
}

/// Connectivity state per channel plus the set of stale channels.
#[derive(Debug, Default)]
pub struct Liveness {
    states: HashMap<String, ChannelState>,
    stale: BTreeSet<String>,
}

impl Liveness {
    pub fn state(&self, channel: &str) -> ChannelState {
        self.states
            .get(channel)
            .copied()
            .unwrap_or(ChannelState::Unknown)
    }

    pub fn is_stale(&self, channel: &str) -> bool {
        self.stale.contains(channel)
    }

    pub fn stale_channels(&self) -> impl Iterator<Item = &str> {
        self.stale.iter().map(String::as_str)
    }

    fn set(&mut self, channel: &str, state: ChannelState) -> Option<Transition> {
        match state {
            ChannelState::Stale => {
                self.stale.insert(channel.to_string());
            }
            _ => {
                self.stale.remove(channel);
            }
        }
        let from = self
            .states
            .insert(channel.to_string(), state)
            .unwrap_or(ChannelState::Unknown);
        (from != state).then(|| Transition {
            channel: channel.to_string(),
            from,
            to: state,
        })
    }
}

/// Marks channels stale once their latest sample is older than the threshold.
#[derive(Debug, Clone, Copy)]
pub struct StalenessWatchdog {
    threshold: Duration,
}

impl StalenessWatchdog {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Re-evaluates every channel in `channels`. Channels without a sample are
    /// stale. Returns only the channels whose state changed.
    pub fn sweep(
        &self,
        channels: &BTreeSet<String>,
        positions: &PositionStore,
        liveness: &mut Liveness,
        now: DateTime<Utc>,
    ) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for channel in channels {
            let live = positions
                .latest(channel)
                .map(|sample| now - sample.timestamp <= self.threshold)
                .unwrap_or(false);
            let state = if live {
                ChannelState::Live
            } else {
                ChannelState::Stale
            };
            if let Some(transition) = liveness.set(channel, state) {
                log::info!(
                    "Channel {} is now {:?} (was {:?})",
                    transition.channel,
                    transition.to,
                    transition.from
                );
                transitions.push(transition);
            }
        }
        transitions
    }
}
