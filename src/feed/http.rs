use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

use super::broker::ensure_success;
use super::error::FeedError;
use super::types::{decode_active_positions, decode_track, TrackRecord};
use crate::tracker::{PositionSample, TrackMetadata, TrackSource, TrackerError};

/// Track metadata and active-position snapshot over the map server's JSON API.
pub struct HttpTrackSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTrackSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn track_url(&self, track_pk: &str) -> String {
        format!(
            "{}/xgds_map_server/mapJson/basaltApp.BasaltTrack/pk:{}",
            self.base_url, track_pk
        )
    }

    pub fn active_positions_url(&self) -> String {
        format!("{}/track/position/active/json", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(url, response)?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TrackSource for HttpTrackSource {
    async fn fetch_track(&self, track_pk: &str) -> Result<Option<TrackMetadata>, TrackerError> {
        let url = self.track_url(track_pk);
        let records: Option<Vec<TrackRecord>> = self
            .get_json(&url)
            .await
            .map_err(|e| TrackerError::Fetch(e.to_string()))?;
        decode_track(track_pk, records)
    }

    async fn fetch_active_positions(&self) -> Result<Vec<PositionSample>, TrackerError> {
        let url = self.active_positions_url();
        let snapshot: Option<BTreeMap<String, serde_json::Value>> = self
            .get_json(&url)
            .await
            .map_err(|e| TrackerError::Fetch(e.to_string()))?;
        Ok(decode_active_positions(snapshot))
    }
}
