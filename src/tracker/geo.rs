use async_trait::async_trait;

use crate::tracker::{Cartesian3, GeoPoint, TrackerError};

// WGS-84 constants
const SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;
const ECCENTRICITY_SQ: f64 = 0.006_694_379_990_14;

/// Maps geodetic coordinates into render space, preserving input order.
#[async_trait]
pub trait GeoTransform: Send + Sync {
    async fn to_render_space(&self, points: &[GeoPoint]) -> Result<Vec<Cartesian3>, TrackerError>;
}

/// Places points on the WGS-84 ellipsoid, raised by a fixed height.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ellipsoid {
    pub height_m: f64,
}

impl Ellipsoid {
    pub fn raised(height_m: f64) -> Self {
        Self { height_m }
    }

    pub fn to_ecef(&self, point: GeoPoint) -> Cartesian3 {
        let lat = point.latitude.to_radians();
        let lon = point.longitude.to_radians();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = SEMI_MAJOR_AXIS_M / (1.0 - ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        Cartesian3 {
            x: (n + self.height_m) * cos_lat * lon.cos(),
            y: (n + self.height_m) * cos_lat * lon.sin(),
            z: (n * (1.0 - ECCENTRICITY_SQ) + self.height_m) * sin_lat,
        }
    }
}

#[async_trait]
impl GeoTransform for Ellipsoid {
    async fn to_render_space(&self, points: &[GeoPoint]) -> Result<Vec<Cartesian3>, TrackerError> {
        points
            .iter()
            .map(|point| {
                if point.longitude.is_finite() && point.latitude.is_finite() {
                    Ok(self.to_ecef(*point))
                } else {
                    Err(TrackerError::Transform(format!(
                        "non-finite coordinate {:?}",
                        point
                    )))
                }
            })
            .collect()
    }
}
