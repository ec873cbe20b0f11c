use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use crate::tracker::{
    Liveness, Material, PositionStore, Rgba, SharedTrajectory, StyleBook, TimeBounds,
    TrackCache, Trajectory,
};

pub type SharedSession = Arc<Mutex<Session>>;

/// All per-channel state of one tracking session.
#[derive(Debug)]
pub struct Session {
    known: BTreeSet<String>,
    pub positions: PositionStore,
    pub liveness: Liveness,
    pub tracks: TrackCache,
    pub styles: StyleBook,
    trajectories: HashMap<String, SharedTrajectory>,
    bounds: HashMap<String, TimeBounds>,
}

impl Session {
    pub fn new(styles: StyleBook) -> Self {
        Self {
            known: BTreeSet::new(),
            positions: PositionStore::new(),
            liveness: Liveness::default(),
            tracks: TrackCache::default(),
            styles,
            trajectories: HashMap::new(),
            bounds: HashMap::new(),
        }
    }

    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Adds channels reported by discovery.
    pub fn register_channels<I, S>(&mut self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(channels.into_iter().map(Into::into));
    }

    /// Discovered channels plus every channel that has sent a sample.
    pub fn known_channels(&self) -> BTreeSet<String> {
        let mut channels = self.known.clone();
        channels.extend(self.positions.channels().map(String::from));
        channels
    }

    pub fn trajectory(&self, channel: &str) -> Option<SharedTrajectory> {
        self.trajectories.get(channel).cloned()
    }

    pub fn trajectory_or_create(&mut self, channel: &str) -> SharedTrajectory {
        self.trajectories
            .entry(channel.to_string())
            .or_insert_with(Trajectory::shared)
            .clone()
    }

    pub fn bounds(&self, channel: &str) -> Option<TimeBounds> {
        self.bounds.get(channel).copied()
    }

    pub fn set_bounds(&mut self, channel: &str, bounds: TimeBounds) {
        self.bounds.insert(channel.to_string(), bounds);
    }

    pub fn color_for(&self, channel: &str, for_label: bool) -> Rgba {
        self.styles
            .resolve_color(channel, for_label, self.liveness.is_stale(channel))
    }

    pub fn material_for(&mut self, channel: &str) -> Arc<Material> {
        let has_heading = self
            .positions
            .latest(channel)
            .map(|sample| sample.has_heading())
            .unwrap_or(false);
        let stale = self.liveness.is_stale(channel);
        self.styles.resolve_material(channel, has_heading, stale)
    }
}
