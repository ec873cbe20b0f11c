use std::sync::Arc;

use crate::tracker::{Material, Rgba, SharedTrajectory, TimeBounds};

/// Everything a renderer needs to draw one channel.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub channel: String,
    pub trajectory: SharedTrajectory,
    pub material: Arc<Material>,
    pub label_color: Rgba,
    pub heading: Option<f64>,
}

/// Drawing side of the pipeline. Implementations must not block.
pub trait RenderAdapter: Send + Sync {
    /// Called once, when a channel is created.
    fn build(&self, renderable: Renderable);

    /// Called for every later sample on a channel.
    fn update(&self, channel: &str, heading: Option<f64>, material: Arc<Material>);

    /// Called when a channel's colors change (color assigned, stale or live again).
    fn restyle(&self, channel: &str, material: Arc<Material>, label_color: Rgba);

    fn set_availability(&self, channel: &str, bounds: TimeBounds);
}

/// Headless renderer that only logs what it is handed.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl RenderAdapter for LogRenderer {
    fn build(&self, renderable: Renderable) {
        let samples = {
            let trajectory = renderable.trajectory.read().unwrap();
            if trajectory.is_empty() {
                None
            } else {
                Some(trajectory.len())
            }
        };
        match samples {
            Some(count) => log::info!(
                "Rendering {} ({:?} material, label {}, {} samples)",
                renderable.channel,
                renderable.material.kind(),
                renderable.label_color.to_css_hex(),
                count
            ),
            None => log::info!(
                "Rendering {} ({:?} material, label {}), awaiting first position",
                renderable.channel,
                renderable.material.kind(),
                renderable.label_color.to_css_hex()
            ),
        }
    }

    fn update(&self, channel: &str, heading: Option<f64>, _material: Arc<Material>) {
        log::debug!("Updated {} heading {:?}", channel, heading);
    }

    fn restyle(&self, channel: &str, material: Arc<Material>, label_color: Rgba) {
        log::info!(
            "Restyled {}: fill {} label {}",
            channel,
            material.color().to_css_hex(),
            label_color.to_css_hex()
        );
    }

    fn set_availability(&self, channel: &str, bounds: TimeBounds) {
        log::info!(
            "Track for {} available {} to {}",
            channel,
            bounds.start,
            bounds.stop
        );
    }
}
