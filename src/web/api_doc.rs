use utoipa::OpenApi;

use super::api::channels::{ChannelSummary, LatestPosition, PositionAt};
use super::api::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::channels::list_channels,
        super::api::channels::latest,
        super::api::channels::position,
    ),
    components(
        schemas(
            ChannelSummary,
            LatestPosition,
            PositionAt,
            ErrorResponse,
            crate::tracker::ChannelState,
            crate::tracker::PositionSample,
            crate::tracker::TimeBounds,
            crate::tracker::Cartesian3,
        )
    ),
    info(
        title = "Trackcast Status API",
        description = "Read-only view of tracked channels and their trajectories",
        version = "0.1.0"
    ),
    tags(
        (name = "channels", description = "Channel state and positions")
    )
)]
pub struct ApiDoc;
