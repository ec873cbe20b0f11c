//! Test doubles for the tracker pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use crate::tracker::{
    Cartesian3, GeoPoint, GeoTransform, Material, MaterialKind, PositionSample, RenderAdapter,
    Renderable, Rgba, TimeBounds, TrackMetadata, TrackSource, TrackerError,
};

pub fn t(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
}

pub fn sample_at(channel: &str, seconds: i64, longitude: f64) -> PositionSample {
    PositionSample {
        channel: channel.to_string(),
        longitude,
        latitude: 0.0,
        timestamp: t(seconds),
        heading: None,
        track_pk: Some("7".to_string()),
        track_hexcolor: None,
    }
}

/// Maps (lon, lat) to (x, y, 0), optionally sleeping per call.
#[derive(Default)]
pub struct ScriptedTransform {
    delays: Mutex<VecDeque<StdDuration>>,
    fail: bool,
}

impl ScriptedTransform {
    pub fn with_delays(delays: impl IntoIterator<Item = StdDuration>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().collect()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            delays: Mutex::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl GeoTransform for ScriptedTransform {
    async fn to_render_space(&self, points: &[GeoPoint]) -> Result<Vec<Cartesian3>, TrackerError> {
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TrackerError::Transform("scripted failure".into()));
        }
        Ok(points
            .iter()
            .map(|p| Cartesian3::new(p.longitude, p.latitude, 0.0))
            .collect())
    }
}

#[derive(Default)]
pub struct ScriptedSource {
    tracks: Mutex<VecDeque<Result<Option<TrackMetadata>, TrackerError>>>,
    active: Mutex<Vec<PositionSample>>,
    track_calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(self, response: Result<Option<TrackMetadata>, TrackerError>) -> Self {
        self.tracks.lock().unwrap().push_back(response);
        self
    }

    pub fn with_active(self, samples: Vec<PositionSample>) -> Self {
        *self.active.lock().unwrap() = samples;
        self
    }

    pub fn track_calls(&self) -> Vec<String> {
        self.track_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackSource for ScriptedSource {
    async fn fetch_track(&self, track_pk: &str) -> Result<Option<TrackMetadata>, TrackerError> {
        self.track_calls.lock().unwrap().push(track_pk.to_string());
        let response = self.tracks.lock().unwrap().pop_front();
        response.unwrap_or(Ok(None))
    }

    async fn fetch_active_positions(&self) -> Result<Vec<PositionSample>, TrackerError> {
        Ok(self.active.lock().unwrap().clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Build {
        channel: String,
        kind: MaterialKind,
        label: Rgba,
    },
    Update {
        channel: String,
    },
    Restyle {
        channel: String,
        label: Rgba,
    },
    Availability {
        channel: String,
        bounds: TimeBounds,
    },
}

#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<RenderCall>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn builds(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RenderCall::Build { .. }))
            .count()
    }

    fn record(&self, call: RenderCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RenderAdapter for RecordingRenderer {
    fn build(&self, renderable: Renderable) {
        self.record(RenderCall::Build {
            channel: renderable.channel,
            kind: renderable.material.kind(),
            label: renderable.label_color,
        });
    }

    fn update(&self, channel: &str, _heading: Option<f64>, _material: Arc<Material>) {
        self.record(RenderCall::Update {
            channel: channel.to_string(),
        });
    }

    fn restyle(&self, channel: &str, _material: Arc<Material>, label_color: Rgba) {
        self.record(RenderCall::Restyle {
            channel: channel.to_string(),
            label: label_color,
        });
    }

    fn set_availability(&self, channel: &str, bounds: TimeBounds) {
        self.record(RenderCall::Availability {
            channel: channel.to_string(),
            bounds,
        });
    }
}
