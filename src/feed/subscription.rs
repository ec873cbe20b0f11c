use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::broker::{Broker, EventStream};
use super::error::FeedError;
use super::sse::SseEvent;
use super::types::WirePayload;
use crate::tracker::{InboundEvent, WorkerHandle};

pub const POSITION_EVENT: &str = "position";

const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);
const RECONNECT_ATTEMPTS: u32 = 5;

/// Receives parsed events, tagged with the channel they arrived on.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, channel: &str, event: InboundEvent);
}

/// A channel whose stream could not be reopened.
#[derive(Debug)]
pub struct ChannelLost {
    pub channel: String,
    pub error: FeedError,
}

/// One background worker per subscribed channel. A stream that ends is
/// reopened with capped exponential backoff; once every attempt fails the
/// channel is reported through [`SubscriptionManager::next_lost`].
pub struct SubscriptionManager {
    broker: Arc<dyn Broker>,
    sink: Arc<dyn EventSink>,
    workers: HashMap<String, WorkerHandle>,
    lost_tx: mpsc::UnboundedSender<ChannelLost>,
    lost_rx: mpsc::UnboundedReceiver<ChannelLost>,
}

impl SubscriptionManager {
    pub fn new(broker: Arc<dyn Broker>, sink: Arc<dyn EventSink>) -> Self {
        let (lost_tx, lost_rx) = mpsc::unbounded_channel();
        Self {
            broker,
            sink,
            workers: HashMap::new(),
            lost_tx,
            lost_rx,
        }
    }

    pub async fn subscribe(&mut self, channel: &str) -> Result<(), FeedError> {
        if self.workers.contains_key(channel) {
            return Ok(());
        }

        let stream = self
            .broker
            .open(channel)
            .await
            .map_err(FeedError::into_connectivity)?;
        let pump = Pump {
            channel: channel.to_string(),
            broker: self.broker.clone(),
            sink: self.sink.clone(),
            lost_tx: self.lost_tx.clone(),
        };
        let worker = WorkerHandle::spawn(format!("subscription-{}", channel), move |stop_rx| {
            pump.run(stream, stop_rx)
        });
        self.workers.insert(channel.to_string(), worker);

        log::info!("Subscribed to {} events on {}", POSITION_EVENT, channel);
        Ok(())
    }

    pub async fn subscribe_all(&mut self, channels: &[String]) -> Result<(), FeedError> {
        for channel in channels {
            self.subscribe(channel).await?;
        }
        Ok(())
    }

    /// False once the channel has been given up on, or if it was never subscribed.
    pub fn is_active(&self, channel: &str) -> bool {
        self.workers
            .get(channel)
            .map(|worker| !worker.is_finished())
            .unwrap_or(false)
    }

    /// Waits for the next channel whose stream could not be reopened.
    pub async fn next_lost(&mut self) -> Option<ChannelLost> {
        self.lost_rx.recv().await
    }

    pub async fn unsubscribe(&mut self, channel: &str) -> bool {
        match self.workers.remove(channel) {
            Some(worker) => {
                log::info!("Stopping {}", worker.name());
                worker.stop().await;
                true
            }
            None => false,
        }
    }

    pub async fn unsubscribe_all(&mut self) {
        let channels: Vec<String> = self.workers.keys().cloned().collect();
        for channel in channels {
            self.unsubscribe(&channel).await;
        }
    }
}

pub fn parse_event(channel: &str, body: &str) -> Result<InboundEvent, FeedError> {
    let payload: WirePayload = serde_json::from_str(body)?;
    Ok(payload.into_event(channel)?)
}

struct Pump {
    channel: String,
    broker: Arc<dyn Broker>,
    sink: Arc<dyn EventSink>,
    lost_tx: mpsc::UnboundedSender<ChannelLost>,
}

impl Pump {
    async fn run(self, mut stream: EventStream, mut stop_rx: oneshot::Receiver<()>) {
        loop {
            loop {
                let next = tokio::select! {
                    next = stream.next() => next,
                    _ = &mut stop_rx => return,
                };
                match next {
                    Some(Ok(event)) => handle_event(&self.channel, event, self.sink.as_ref()).await,
                    Some(Err(e)) => {
                        log::warn!("Event stream for {} failed: {}", self.channel, e);
                        break;
                    }
                    None => {
                        log::warn!("Event stream for {} closed", self.channel);
                        break;
                    }
                }
            }

            stream = match self.reopen(&mut stop_rx).await {
                Ok(Some(stream)) => stream,
                Ok(None) => return,
                Err(error) => {
                    log::error!("Giving up on {}: {}", self.channel, error);
                    let _ = self.lost_tx.send(ChannelLost {
                        channel: self.channel.clone(),
                        error,
                    });
                    return;
                }
            };
        }
    }

    /// `Ok(None)` when stopped while waiting.
    async fn reopen(
        &self,
        stop_rx: &mut oneshot::Receiver<()>,
    ) -> Result<Option<EventStream>, FeedError> {
        let mut delay = RECONNECT_BASE_DELAY;
        let mut attempt = 1;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut *stop_rx => return Ok(None),
            }
            match self.broker.open(&self.channel).await {
                Ok(stream) => {
                    log::info!("Reconnected to {}", self.channel);
                    return Ok(Some(stream));
                }
                Err(e) if attempt >= RECONNECT_ATTEMPTS => return Err(e.into_connectivity()),
                Err(e) => log::warn!(
                    "Reconnect {}/{} to {} failed: {}",
                    attempt,
                    RECONNECT_ATTEMPTS,
                    self.channel,
                    e
                ),
            }
            attempt += 1;
            delay = (delay * 2).min(RECONNECT_MAX_DELAY);
        }
    }
}

async fn handle_event(channel: &str, event: SseEvent, sink: &dyn EventSink) {
    if event.event != POSITION_EVENT {
        log::debug!("Ignoring {} event on {}", event.event, channel);
        return;
    }
    match parse_event(channel, &event.data) {
        Ok(inbound) => sink.deliver(channel, inbound).await,
        Err(e) => log::warn!(
            "Dropping event {} on {}: {}",
            event.id.as_deref().unwrap_or("-"),
            channel,
            e
        ),
    }
}
