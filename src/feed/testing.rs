//! In-memory broker and sink for feed tests.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::broker::{Broker, EventStream};
use super::error::FeedError;
use super::sse::SseEvent;
use super::subscription::{EventSink, POSITION_EVENT};
use crate::tracker::InboundEvent;

pub fn position_event(data: &str) -> SseEvent {
    SseEvent {
        event: POSITION_EVENT.to_string(),
        data: data.to_string(),
        id: None,
    }
}

/// Each `with_events` call scripts one connection. Once a channel's script
/// is used up, opening it is refused unless `endless_after_script` is set.
#[derive(Default)]
pub struct StaticBroker {
    channels: Vec<String>,
    unreachable: bool,
    scripts: Mutex<HashMap<String, VecDeque<Vec<SseEvent>>>>,
    endless: HashSet<String>,
    endless_after_script: bool,
    opens: AtomicUsize,
}

impl StaticBroker {
    pub fn new<const N: usize>(channels: [&str; N]) -> Self {
        Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_events(self, channel: &str, events: Vec<SseEvent>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push_back(events);
        self
    }

    pub fn endless_after_script(mut self) -> Self {
        self.endless_after_script = true;
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// The channel's stream never yields and never ends.
    pub fn endless(mut self, channel: &str) -> Self {
        self.endless.insert(channel.to_string());
        self
    }

    fn refused(&self) -> FeedError {
        FeedError::Status {
            url: "http://broker.test".into(),
            status: 503,
        }
    }
}

#[async_trait]
impl Broker for StaticBroker {
    async fn channels(&self) -> Result<Vec<String>, FeedError> {
        if self.unreachable {
            return Err(self.refused());
        }
        Ok(self.channels.clone())
    }

    async fn open(&self, channel: &str) -> Result<EventStream, FeedError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(self.refused());
        }
        if self.endless.contains(channel) {
            return Ok(stream::pending().boxed());
        }
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(channel)
            .and_then(VecDeque::pop_front);
        match script {
            Some(events) => Ok(stream::iter(events.into_iter().map(Ok)).boxed()),
            None if self.endless_after_script => Ok(stream::pending().boxed()),
            None => Err(self.refused()),
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<(String, InboundEvent)>>,
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<(String, InboundEvent)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn deliver(&self, channel: &str, event: InboundEvent) {
        self.delivered
            .lock()
            .unwrap()
            .push((channel.to_string(), event));
    }
}
