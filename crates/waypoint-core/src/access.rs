use crate::error::SinkError;
use crate::short_key::ShortKey;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// One resolved redirect, as seen by the analytics side channel.
///
/// Request metadata is optional: clients routinely omit `Referer` and
/// `User-Agent`, and the redirect must never depend on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub short_key: ShortKey,
    pub destination_url: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_addr: Option<String>,
    pub accessed_at: Timestamp,
}

/// Request metadata captured by the HTTP layer for a redirect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_addr: Option<String>,
}

impl AccessEvent {
    /// Builds an event stamped with the current time.
    pub fn new(short_key: ShortKey, destination_url: impl Into<String>, meta: RequestMeta) -> Self {
        Self {
            short_key,
            destination_url: destination_url.into(),
            referrer: meta.referrer,
            user_agent: meta.user_agent,
            client_addr: meta.client_addr,
            accessed_at: Timestamp::now(),
        }
    }
}

/// A durable log that accepts access events.
///
/// Delivery is best-effort: a failed `record` is logged by the caller and
/// the event is dropped.
#[async_trait]
pub trait AccessSink: Send + Sync + 'static {
    async fn record(&self, event: &AccessEvent) -> Result<(), SinkError>;
}
