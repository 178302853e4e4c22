use std::io::Write;

use anyhow::{bail, Context, Result};
use base64::Engine;
use chrono::DateTime;
use futures::StreamExt;
use tracing::{debug, info};

use crate::config::AttachmentPolicy;
use crate::platform::{MessageEvent, ReceiptEvent, SignalService};

const UNKNOWN_CONTACT: &str = "Unknown";

enum Event {
    Message(MessageEvent),
    Receipt(ReceiptEvent),
}

/// Prints Signal messages as they arrive.
/// Events are handled one at a time. Messages keep their bus order among
/// themselves, as do receipts; the two streams are interleaved fairly.
pub struct Listener<S, W> {
    service: S,
    out: W,
    attachments: AttachmentPolicy,
}

fn sent_at(timestamp: i64) -> String {
    DateTime::from_timestamp_millis(timestamp)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

impl<S, W> Listener<S, W>
where
    S: SignalService,
    W: Write + Send,
{
    pub fn new(service: S, out: W, attachments: AttachmentPolicy) -> Self {
        Self {
            service,
            out,
            attachments,
        }
    }

    /// Display name for a sender: contact name, then the raw id, then "Unknown"
    async fn contact(&self, source: &str) -> Result<String> {
        let name = self.service.contact_name(source).await?;
        if !name.is_empty() {
            Ok(name)
        } else if !source.is_empty() {
            Ok(source.to_string())
        } else {
            Ok(UNKNOWN_CONTACT.to_string())
        }
    }

    /// Display name for a group, falling back to its base64 id
    async fn group(&self, group_id: &[u8]) -> Result<String> {
        let name = self.service.group_name(group_id).await?;
        if name.is_empty() {
            Ok(base64::engine::general_purpose::STANDARD.encode(group_id))
        } else {
            Ok(name)
        }
    }

    async fn format_message(&self, event: &MessageEvent) -> Result<String> {
        let contact = self.contact(&event.source).await?;
        let message = event.message.as_deref().unwrap_or_default();

        if let Some(group_id) = &event.group_id {
            let group = self.group(group_id).await?;
            return Ok(format!("{}, in group {}: {}", contact, group, message));
        }

        match event.attachments.as_deref() {
            Some(attachments) if self.attachments.applies(Some(attachments)) => {
                Ok(format!("{:?}", attachments))
            }
            _ => Ok(format!("{}: {}", contact, message)),
        }
    }

    pub async fn on_message(&mut self, event: &MessageEvent) -> Result<()> {
        debug!(
            "Message from {} sent at {}",
            event.source,
            sent_at(event.timestamp)
        );
        let line = self.format_message(event).await?;
        writeln!(self.out, "{}", line).context("Failed to write message")?;
        self.out.flush().context("Failed to flush output")?;
        Ok(())
    }

    /// Receipts are resolved but never printed.
    pub async fn on_receipt(&self, event: &ReceiptEvent) -> Result<()> {
        let contact = self.contact(&event.source).await?;
        debug!(
            "Receipt from {} sent at {}",
            contact,
            sent_at(event.timestamp)
        );
        Ok(())
    }

    /// Dispatch events until a handler fails or the bus stops delivering.
    pub async fn run(&mut self) -> Result<()> {
        let messages = self
            .service
            .subscribe_messages()
            .await?
            .map(|event| event.map(Event::Message));
        let receipts = self
            .service
            .subscribe_receipts()
            .await?
            .map(|event| event.map(Event::Receipt));
        let mut events = futures::stream::select(messages, receipts);

        info!("Listening for Signal messages");

        while let Some(event) = events.next().await {
            match event? {
                Event::Message(message) => self.on_message(&message).await?,
                Event::Receipt(receipt) => self.on_receipt(&receipt).await?,
            }
        }

        bail!("Signal event stream closed")
    }
}
