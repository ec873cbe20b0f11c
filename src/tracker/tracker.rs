use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::positions::UpdateKind;
use super::render::{RenderAdapter, Renderable};
use super::sampler::{IngestReport, TrajectorySampler};
use super::session::{Session, SharedSession};
use super::staleness::{StalenessWatchdog, Transition};
use super::track_cache::TrackSource;
use super::worker::WorkerHandle;
use crate::feed::EventSink;
use crate::tracker::{
    GeoTransform, InboundEvent, PositionSample, SegmentBatch, SharedTrajectory, TimeBounds,
    TrackMetadata, TrackerError,
};

const DEFAULT_STALE_THRESHOLD_S: i64 = 10;
const DEFAULT_TRACK_WINDOW_H: i64 = 12;

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub stale_threshold: Duration,
    /// Availability window opened from the start of a fetched track.
    pub track_window: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            stale_threshold: Duration::seconds(DEFAULT_STALE_THRESHOLD_S),
            track_window: Duration::hours(DEFAULT_TRACK_WINDOW_H),
        }
    }
}

#[derive(Debug)]
pub struct UpdateOutcome {
    pub kind: UpdateKind,
    /// Track metadata fetch started by this update, if any.
    pub fetch: Option<JoinHandle<()>>,
}

/// Routes samples through the session: position store, trajectory, track
/// metadata, styles and the renderer.
#[derive(Clone)]
pub struct Tracker {
    session: SharedSession,
    sampler: TrajectorySampler,
    source: Arc<dyn TrackSource>,
    renderer: Arc<dyn RenderAdapter>,
    watchdog: StalenessWatchdog,
    track_window: Duration,
}

impl Tracker {
    pub fn new(
        session: SharedSession,
        transform: Arc<dyn GeoTransform>,
        source: Arc<dyn TrackSource>,
        renderer: Arc<dyn RenderAdapter>,
        settings: TrackerSettings,
    ) -> Self {
        Self {
            session,
            sampler: TrajectorySampler::new(transform),
            source,
            renderer,
            watchdog: StalenessWatchdog::new(settings.stale_threshold),
            track_window: settings.track_window,
        }
    }

    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub async fn update(&self, sample: PositionSample) -> UpdateOutcome {
        let (kind, trajectory, retry_fetch) = {
            let mut locked = self.session.lock().unwrap();
            let kind = locked.positions.update(sample.clone());
            if kind == UpdateKind::Created {
                assign_color(
                    &mut locked,
                    &sample.channel,
                    sample.track_hexcolor.as_deref(),
                );
            }
            let retry = kind == UpdateKind::Modified && locked.tracks.needs_retry(&sample.channel);
            (kind, locked.trajectory_or_create(&sample.channel), retry)
        };

        // Build precedes the transform await; later events on the channel
        // always find it built.
        if kind == UpdateKind::Created {
            log::info!("New channel {}", sample.channel);
            self.build(&sample.channel, trajectory.clone(), sample.heading);
        }

        self.commit_point(&trajectory, &sample).await;

        let fetch = match kind {
            UpdateKind::Created => self.spawn_fetch(&sample),
            UpdateKind::Modified => {
                self.refresh(&sample.channel, sample.heading);
                if retry_fetch {
                    self.spawn_fetch(&sample)
                } else {
                    None
                }
            }
        };

        UpdateOutcome { kind, fetch }
    }

    /// Seeds channels from the active-position snapshot. Channels that already
    /// have a sample are left alone.
    pub async fn bootstrap(&self) -> Result<Vec<UpdateOutcome>, TrackerError> {
        let samples = self.source.fetch_active_positions().await?;
        let mut created = Vec::new();

        for sample in samples {
            let trajectory = {
                let mut locked = self.session.lock().unwrap();
                if !locked.positions.insert_if_absent(sample.clone()) {
                    log::debug!("Bootstrap skipped {}, already streaming", sample.channel);
                    continue;
                }
                assign_color(
                    &mut locked,
                    &sample.channel,
                    sample.track_hexcolor.as_deref(),
                );
                locked.trajectory_or_create(&sample.channel)
            };

            self.build(&sample.channel, trajectory.clone(), sample.heading);
            self.commit_point(&trajectory, &sample).await;
            created.push(UpdateOutcome {
                kind: UpdateKind::Created,
                fetch: self.spawn_fetch(&sample),
            });
        }

        log::info!("Bootstrapped {} channels", created.len());
        Ok(created)
    }

    pub async fn ingest_segments(&self, channel: &str, batch: SegmentBatch) -> IngestReport {
        let trajectory = self.session.lock().unwrap().trajectory_or_create(channel);
        self.sampler.ingest_segments(&trajectory, &batch).await
    }

    /// Fetches track metadata for a channel unless it is cached or in flight.
    pub async fn fetch_track(&self, channel: &str, track_pk: &str) {
        let claimed = self.session.lock().unwrap().tracks.begin(channel);
        if !claimed {
            return;
        }

        match self.source.fetch_track(track_pk).await {
            Ok(Some(metadata)) => self.apply_track(channel, metadata).await,
            Ok(None) => {
                log::warn!("No track data for {} (track {})", channel, track_pk);
                self.session.lock().unwrap().tracks.fail(channel);
            }
            Err(e) => {
                log::error!(
                    "Could not get track contents for {} (track {}): {}",
                    channel,
                    track_pk,
                    e
                );
                self.session.lock().unwrap().tracks.fail(channel);
            }
        }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<Transition> {
        let (transitions, restyles) = {
            let mut locked = self.session.lock().unwrap();
            let channels = locked.known_channels();
            let session = &mut *locked;
            let transitions =
                self.watchdog
                    .sweep(&channels, &session.positions, &mut session.liveness, now);

            let mut restyles = Vec::new();
            for transition in transitions.iter().filter(|t| t.touches_stale()) {
                let channel = &transition.channel;
                session.styles.invalidate(channel);
                if session.positions.contains(channel) {
                    restyles.push((
                        channel.clone(),
                        session.material_for(channel),
                        session.color_for(channel, true),
                    ));
                }
            }
            (transitions, restyles)
        };

        for (channel, material, label_color) in restyles {
            self.renderer.restyle(&channel, material, label_color);
        }
        if !transitions.is_empty() {
            let locked = self.session.lock().unwrap();
            let stale: Vec<_> = locked.liveness.stale_channels().collect();
            log::info!("Stale channels: [{}]", stale.join(", "));
        }
        transitions
    }

    pub fn spawn_watchdog(&self, period: std::time::Duration) -> WorkerHandle {
        log::info!(
            "Checking staleness every {:?} (threshold {}s)",
            period,
            self.watchdog.threshold().num_seconds()
        );
        let tracker = self.clone();
        WorkerHandle::spawn("staleness-watchdog", move |mut stop_rx| async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracker.sweep(Utc::now());
                    }
                    _ = &mut stop_rx => break,
                }
            }
            log::info!("Staleness watchdog stopped");
        })
    }

    async fn commit_point(&self, trajectory: &SharedTrajectory, sample: &PositionSample) {
        if let Err(e) = self.sampler.ingest_point(trajectory, sample).await {
            log::warn!(
                "Dropping sample for {} at {}: {}",
                sample.channel,
                sample.timestamp,
                e
            );
        }
    }

    fn build(&self, channel: &str, trajectory: SharedTrajectory, heading: Option<f64>) {
        let (material, label_color) = {
            let mut locked = self.session.lock().unwrap();
            (locked.material_for(channel), locked.color_for(channel, true))
        };
        self.renderer.build(Renderable {
            channel: channel.to_string(),
            trajectory,
            material,
            label_color,
            heading,
        });
    }

    fn refresh(&self, channel: &str, heading: Option<f64>) {
        let material = self.session.lock().unwrap().material_for(channel);
        self.renderer.update(channel, heading, material);
    }

    fn spawn_fetch(&self, sample: &PositionSample) -> Option<JoinHandle<()>> {
        let Some(track_pk) = sample.track_pk.clone() else {
            log::debug!("{} has no track reference, skipping fetch", sample.channel);
            return None;
        };
        let tracker = self.clone();
        let channel = sample.channel.clone();
        Some(tokio::spawn(async move {
            tracker.fetch_track(&channel, &track_pk).await;
        }))
    }

    async fn apply_track(&self, channel: &str, metadata: TrackMetadata) {
        let segments = metadata.segments.clone();
        let (trajectory, bounds, restyle) = {
            let mut locked = self.session.lock().unwrap();
            let bounds = segments.first_time().map(|start| TimeBounds {
                start,
                stop: start + self.track_window,
            });
            if let Some(bounds) = bounds {
                locked.set_bounds(channel, bounds);
            }
            let recolored = assign_color(&mut locked, channel, metadata.color.as_deref());
            let restyle = recolored.then(|| {
                (
                    locked.material_for(channel),
                    locked.color_for(channel, true),
                )
            });
            locked.tracks.complete(channel, metadata);
            (locked.trajectory_or_create(channel), bounds, restyle)
        };

        if let Some(bounds) = bounds {
            self.renderer.set_availability(channel, bounds);
        }
        if let Some((material, label_color)) = restyle {
            self.renderer.restyle(channel, material, label_color);
        }

        let report = self.sampler.ingest_segments(&trajectory, &segments).await;
        log::info!(
            "Loaded track for {}: {} samples in {} segments",
            channel,
            report.samples,
            report.segments
        );
    }
}

#[async_trait]
impl EventSink for Tracker {
    async fn deliver(&self, channel: &str, event: InboundEvent) {
        match event {
            InboundEvent::Point(sample) => {
                self.update(sample).await;
            }
            InboundEvent::Segment(batch) if batch.is_empty() => {
                log::debug!("Empty segment batch on {}", channel);
            }
            InboundEvent::Segment(batch) => {
                let report = self.ingest_segments(channel, batch).await;
                log::debug!(
                    "{} received {} samples in {} segments",
                    channel,
                    report.samples,
                    report.segments
                );
            }
        }
    }
}

/// Gives a channel its color unless it already has one.
fn assign_color(session: &mut Session, channel: &str, hex: Option<&str>) -> bool {
    let Some(hex) = hex.filter(|h| !h.trim().is_empty()) else {
        return false;
    };
    if session.styles.has_color(channel) {
        return false;
    }
    match session.styles.add_color(channel, hex) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Ignoring color for {}: {}", channel, e);
            false
        }
    }
}
