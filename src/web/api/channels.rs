use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::tracker::{parse_timestamp, Cartesian3, ChannelState, PositionSample, Session, TimeBounds};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ChannelSummary {
    pub channel: String,
    pub state: ChannelState,
    pub last_sample: Option<PositionSample>,
    /// Fill color as CSS hex, after stale overrides.
    pub fill_color: String,
    pub label_color: String,
    pub has_track: bool,
    pub track_pk: Option<String>,
    pub trajectory_samples: usize,
    pub trajectory_segments: u32,
    /// First and last sample times held by the trajectory.
    pub coverage: Option<TimeBounds>,
    pub availability: Option<TimeBounds>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LatestPosition {
    pub channel: String,
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: DateTime<Utc>,
    pub heading: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PositionQuery {
    /// RFC 3339 time to sample at; defaults to now.
    pub at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PositionAt {
    pub channel: String,
    pub at: DateTime<Utc>,
    pub position: Cartesian3,
}

fn summarize(session: &Session, channel: &str) -> ChannelSummary {
    let (trajectory_samples, trajectory_segments, coverage) = match session.trajectory(channel) {
        Some(trajectory) => {
            let trajectory = trajectory.read().unwrap();
            let coverage = trajectory
                .samples()
                .next()
                .zip(trajectory.latest_time())
                .map(|((start, _), stop)| TimeBounds { start, stop });
            (trajectory.len(), trajectory.segment_count(), coverage)
        }
        None => (0, 0, None),
    };
    ChannelSummary {
        channel: channel.to_string(),
        state: session.liveness.state(channel),
        last_sample: session.positions.latest(channel).cloned(),
        fill_color: session.color_for(channel, false).to_css_hex(),
        label_color: session.color_for(channel, true).to_css_hex(),
        has_track: session.tracks.is_cached(channel),
        track_pk: session
            .tracks
            .get(channel)
            .map(|metadata| metadata.track_pk.clone()),
        trajectory_samples,
        trajectory_segments,
        coverage,
        availability: session.bounds(channel),
    }
}

#[utoipa::path(
    get,
    path = "/api/channels",
    responses(
        (status = 200, description = "Every known channel", body = Vec<ChannelSummary>)
    ),
    tag = "channels"
)]
pub async fn list_channels(State(state): State<AppState>) -> Json<Vec<ChannelSummary>> {
    let session = state.session.lock().unwrap();
    let summaries = session
        .known_channels()
        .iter()
        .map(|channel| summarize(&session, channel))
        .collect();
    Json(summaries)
}

#[utoipa::path(
    get,
    path = "/api/channels/{channel}/latest",
    params(
        ("channel" = String, Path, description = "Channel name")
    ),
    responses(
        (status = 200, description = "Latest reported position", body = LatestPosition),
        (status = 404, description = "Channel has not reported", body = ErrorResponse)
    ),
    tag = "channels"
)]
pub async fn latest(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> ApiResult<Json<LatestPosition>> {
    let session = state.session.lock().unwrap();
    let sample = session
        .positions
        .latest(&channel)
        .ok_or_else(|| ApiError::UnknownChannel(channel.clone()))?;
    Ok(Json(LatestPosition {
        channel: sample.channel.clone(),
        longitude: sample.longitude,
        latitude: sample.latitude,
        timestamp: sample.timestamp,
        heading: sample.heading,
    }))
}

#[utoipa::path(
    get,
    path = "/api/channels/{channel}/position",
    params(
        ("channel" = String, Path, description = "Channel name"),
        PositionQuery
    ),
    responses(
        (status = 200, description = "Interpolated render-space position", body = PositionAt),
        (status = 400, description = "Malformed time", body = ErrorResponse),
        (status = 404, description = "No trajectory for channel", body = ErrorResponse)
    ),
    tag = "channels"
)]
pub async fn position(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<PositionQuery>,
) -> ApiResult<Json<PositionAt>> {
    let at = match query.at.as_deref() {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };

    let trajectory = {
        let session = state.session.lock().unwrap();
        if !session.known_channels().contains(&channel) {
            return Err(ApiError::UnknownChannel(channel));
        }
        session.trajectory(&channel)
    };
    let position = trajectory
        .and_then(|trajectory| trajectory.read().unwrap().value_at(at))
        .ok_or_else(|| ApiError::NoSamples(channel.clone()))?;

    Ok(Json(PositionAt {
        channel,
        at,
        position,
    }))
}
