pub mod dbus;
#[cfg(test)]
pub mod stub;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A chat message delivered by the Signal daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Sent time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Sender identifier (phone number or account id)
    pub source: String,
    /// Raw group id, only set for group messages
    pub group_id: Option<Vec<u8>>,
    pub message: Option<String>,
    /// Local file paths of received attachments
    pub attachments: Option<Vec<String>>,
}

/// A delivery receipt delivered by the Signal daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptEvent {
    pub timestamp: i64,
    pub source: String,
}

pub type EventStream<T> = BoxStream<'static, Result<T>>;

/// The capabilities the listener consumes from the Signal daemon.
#[async_trait]
pub trait SignalService: Send + Sync {
    /// Contact name for a sender, or an empty string if none is known
    async fn contact_name(&self, source: &str) -> Result<String>;

    /// Group name for a raw group id, or an empty string if none is known
    async fn group_name(&self, group_id: &[u8]) -> Result<String>;

    async fn subscribe_messages(&self) -> Result<EventStream<MessageEvent>>;

    async fn subscribe_receipts(&self) -> Result<EventStream<ReceiptEvent>>;
}
