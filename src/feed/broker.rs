use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use std::time::Duration;

use super::error::FeedError;
use super::sse::{SseDecoder, SseEvent};

pub type EventStream = BoxStream<'static, Result<SseEvent, FeedError>>;

/// Publish/subscribe broker carrying per-channel event streams.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn channels(&self) -> Result<Vec<String>, FeedError>;

    async fn open(&self, channel: &str) -> Result<EventStream, FeedError>;
}

/// Server-Sent Events broker reached over HTTP.
pub struct HttpBroker {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpBroker {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, FeedError> {
        // no client-wide timeout: streams stay open for the whole session
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }
}

#[async_trait]
impl Broker for HttpBroker {
    async fn channels(&self) -> Result<Vec<String>, FeedError> {
        let url = format!("{}/sse/activeChannels", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = ensure_success(&url, response)?;
        Ok(response.json::<Vec<String>>().await?)
    }

    async fn open(&self, channel: &str) -> Result<EventStream, FeedError> {
        let url = format!("{}/sse/stream", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("channel", channel)])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = ensure_success(&url, response)?;

        let mut decoder = SseDecoder::default();
        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(FeedError::from(e))],
            })
            .flat_map(stream::iter)
            .boxed();
        Ok(events)
    }
}

pub(crate) fn ensure_success(
    url: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, FeedError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(FeedError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}
