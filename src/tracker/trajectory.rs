use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use crate::tracker::Cartesian3;

pub type SharedTrajectory = Arc<RwLock<Trajectory>>;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    position: Cartesian3,
    // None for live samples, Some(n) for samples committed as bulk segment n
    segment: Option<u32>,
}

/// Time-ordered sample history for one channel.
///
/// Samples are keyed by timestamp, so commit order does not matter. A sample
/// at an existing timestamp replaces the previous one. Interpolation never
/// spans two different bulk segments; across such a gap the earlier value is
/// held.
#[derive(Debug, Default)]
pub struct Trajectory {
    samples: BTreeMap<DateTime<Utc>, Entry>,
    segments: u32,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedTrajectory {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn segment_count(&self) -> u32 {
        self.segments
    }

    pub fn add_sample(&mut self, time: DateTime<Utc>, position: Cartesian3) {
        self.samples.insert(
            time,
            Entry {
                position,
                segment: None,
            },
        );
    }

    /// Commits one contiguous block. Extra entries in the longer slice are ignored.
    pub fn add_segment(&mut self, times: &[DateTime<Utc>], positions: &[Cartesian3]) -> u32 {
        let segment = self.segments;
        self.segments += 1;
        for (time, position) in times.iter().zip(positions) {
            self.samples.insert(
                *time,
                Entry {
                    position: *position,
                    segment: Some(segment),
                },
            );
        }
        segment
    }

    pub fn latest_time(&self) -> Option<DateTime<Utc>> {
        self.samples.last_key_value().map(|(time, _)| *time)
    }

    pub fn last_known(&self) -> Option<Cartesian3> {
        self.samples.last_key_value().map(|(_, entry)| entry.position)
    }

    pub fn value_at(&self, time: DateTime<Utc>) -> Option<Cartesian3> {
        let before = self.samples.range(..=time).next_back();
        let after = self.samples.range(time..).next();

        match (before, after) {
            (Some((t0, a)), Some((t1, b))) => {
                if t0 == t1 || crosses_gap(a, b) {
                    return Some(a.position);
                }
                let span = seconds_between(*t0, *t1);
                if span <= 0.0 {
                    return Some(a.position);
                }
                let fraction = seconds_between(*t0, time) / span;
                Some(a.position.lerp(&b.position, fraction))
            }
            _ => self.last_known(),
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = (DateTime<Utc>, Cartesian3)> + '_ {
        self.samples
            .iter()
            .map(|(time, entry)| (*time, entry.position))
    }
}

fn crosses_gap(a: &Entry, b: &Entry) -> bool {
    matches!((a.segment, b.segment), (Some(x), Some(y)) if x != y)
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    delta
        .num_microseconds()
        .map(|us| us as f64 / 1e6)
        .unwrap_or_else(|| delta.num_seconds() as f64)
}
