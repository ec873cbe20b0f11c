use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;

use crate::tracker::{
    Cartesian3, GeoTransform, PositionSample, SegmentBatch, SharedTrajectory, TrackerError,
};

/// Counts of what one ingestion committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub segments: usize,
    pub samples: usize,
}

/// Converts raw samples into render space and commits them to trajectories.
#[derive(Clone)]
pub struct TrajectorySampler {
    transform: Arc<dyn GeoTransform>,
}

impl TrajectorySampler {
    pub fn new(transform: Arc<dyn GeoTransform>) -> Self {
        Self { transform }
    }

    pub async fn ingest_point(
        &self,
        trajectory: &SharedTrajectory,
        sample: &PositionSample,
    ) -> Result<IngestReport, TrackerError> {
        let raised = self.transform.to_render_space(&[sample.point()]).await?;
        let position = raised
            .first()
            .copied()
            .ok_or_else(|| TrackerError::Transform("transform returned no position".into()))?;

        trajectory
            .write()
            .unwrap()
            .add_sample(sample.timestamp, position);

        Ok(IngestReport {
            segments: 0,
            samples: 1,
        })
    }

    /// Transforms all blocks concurrently, then commits them in block order.
    /// A block whose transform fails is skipped.
    pub async fn ingest_segments(
        &self,
        trajectory: &SharedTrajectory,
        batch: &SegmentBatch,
    ) -> IngestReport {
        let transforms = batch
            .coords
            .iter()
            .map(|block| self.transform.to_render_space(block));
        let results = join_all(transforms).await;

        let mut report = IngestReport::default();
        let mut locked = trajectory.write().unwrap();
        for (index, result) in results.into_iter().enumerate() {
            let positions = match result {
                Ok(positions) => positions,
                Err(e) => {
                    log::warn!("Skipping track block {}: {}", index, e);
                    continue;
                }
            };
            let times = batch.times.get(index).map(Vec::as_slice).unwrap_or(&[]);
            let (times, positions) = align_block(index, times, &positions);
            if times.is_empty() {
                continue;
            }
            locked.add_segment(times, positions);
            report.segments += 1;
            report.samples += times.len();
        }

        report
    }
}

/// Truncates the longer of a block's time and position lists to the shorter.
///
/// Upstream occasionally sends blocks whose lengths disagree; the common
/// prefix is kept so the rest of the track still renders.
fn align_block<'a>(
    index: usize,
    times: &'a [DateTime<Utc>],
    positions: &'a [Cartesian3],
) -> (&'a [DateTime<Utc>], &'a [Cartesian3]) {
    if times.len() != positions.len() {
        let len = times.len().min(positions.len());
        log::warn!(
            "Track block {} has {} positions but {} timestamps, keeping first {}",
            index,
            positions.len(),
            times.len(),
            len
        );
        return (&times[..len], &positions[..len]);
    }
    (times, positions)
}
