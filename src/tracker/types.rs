use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Geodetic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Render-space position (earth-fixed, meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Cartesian3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Cartesian3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn lerp(&self, other: &Cartesian3, t: f64) -> Cartesian3 {
        Cartesian3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PositionSample {
    pub channel: String,
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: DateTime<Utc>,
    pub heading: Option<f64>,
    pub track_pk: Option<String>,
    pub track_hexcolor: Option<String>,
}

impl PositionSample {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }

    pub fn has_heading(&self) -> bool {
        self.heading.is_some()
    }
}

/// Parallel coordinate and time blocks; one block per contiguous segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentBatch {
    pub coords: Vec<Vec<GeoPoint>>,
    pub times: Vec<Vec<DateTime<Utc>>>,
}

impl SegmentBatch {
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.times.first().and_then(|block| block.first()).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Point(PositionSample),
    Segment(SegmentBatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Unknown,
    Live,
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimeBounds {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub track_pk: String,
    pub color: Option<String>,
    pub segments: SegmentBatch,
}
