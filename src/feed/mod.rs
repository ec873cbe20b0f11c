mod broker;
mod error;
mod http;
mod registry;
mod sse;
mod subscription;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use broker::HttpBroker;
pub use http::HttpTrackSource;
pub use registry::ChannelRegistry;
pub use subscription::{EventSink, SubscriptionManager};
