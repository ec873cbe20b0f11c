mod error;
mod geo;
mod parsing;
mod positions;
mod render;
mod sampler;
mod session;
mod staleness;
mod style;
mod track_cache;
mod tracker;
mod trajectory;
mod types;
mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::TrackerError;
pub use geo::{Ellipsoid, GeoTransform};
pub use parsing::{channel_from_track_name, parse_timestamp};
pub use positions::PositionStore;
pub use render::{LogRenderer, RenderAdapter, Renderable};
pub use session::{Session, SharedSession};
pub use staleness::Liveness;
pub use style::{Material, MaterialKind, Rgba, StyleBook};
pub use track_cache::{TrackCache, TrackSource};
pub use tracker::{Tracker, TrackerSettings};
pub use trajectory::{SharedTrajectory, Trajectory};
pub use types::{
    Cartesian3, ChannelState, GeoPoint, InboundEvent, PositionSample, SegmentBatch, TimeBounds,
    TrackMetadata,
};
pub use worker::WorkerHandle;
