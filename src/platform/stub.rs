use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::StreamExt;

use crate::platform::{EventStream, MessageEvent, ReceiptEvent, SignalService};

/// In-memory Signal daemon for tests
#[derive(Default)]
pub struct StubSignal {
    contacts: HashMap<String, String>,
    groups: HashMap<Vec<u8>, String>,
    fail_lookups: bool,
    messages: Mutex<Vec<MessageEvent>>,
    receipts: Mutex<Vec<ReceiptEvent>>,
}

impl StubSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact(mut self, source: &str, name: &str) -> Self {
        self.contacts.insert(source.to_string(), name.to_string());
        self
    }

    pub fn with_group(mut self, group_id: &[u8], name: &str) -> Self {
        self.groups.insert(group_id.to_vec(), name.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn push_message(self, event: MessageEvent) -> Self {
        self.messages.lock().unwrap().push(event);
        self
    }

    pub fn push_receipt(self, event: ReceiptEvent) -> Self {
        self.receipts.lock().unwrap().push(event);
        self
    }
}

#[async_trait]
impl SignalService for StubSignal {
    async fn contact_name(&self, source: &str) -> Result<String> {
        if self.fail_lookups {
            bail!("getContactName failed for {}", source);
        }
        Ok(self.contacts.get(source).cloned().unwrap_or_default())
    }

    async fn group_name(&self, group_id: &[u8]) -> Result<String> {
        if self.fail_lookups {
            bail!("getGroupName failed");
        }
        Ok(self.groups.get(group_id).cloned().unwrap_or_default())
    }

    async fn subscribe_messages(&self) -> Result<EventStream<MessageEvent>> {
        let events = std::mem::take(&mut *self.messages.lock().unwrap());
        Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
    }

    async fn subscribe_receipts(&self) -> Result<EventStream<ReceiptEvent>> {
        let events = std::mem::take(&mut *self.receipts.lock().unwrap());
        Ok(futures::stream::iter(events.into_iter().map(Ok)).boxed())
    }
}
