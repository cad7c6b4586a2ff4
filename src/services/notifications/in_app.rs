use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;

use crate::{
    error::ChannelError,
    models::{ChannelKind, Recipient, TriggerEvent},
};

use super::NotificationChannel;

pub const EVENT_NAME: &str = "alertTriggered";

/// Publishes onto the process-wide event bus that backs the `/events` stream.
#[derive(Clone)]
pub struct InAppChannel {
    events_tx: broadcast::Sender<String>,
}

impl InAppChannel {
    pub fn new(events_tx: broadcast::Sender<String>) -> Self {
        Self { events_tx }
    }
}

#[async_trait]
impl NotificationChannel for InAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn send(&self, event: &TriggerEvent, recipient: &Recipient) -> Result<(), ChannelError> {
        let payload = json!({
            "event": EVENT_NAME,
            "owner_id": recipient.owner_id,
            "headline": event.headline(),
            "trigger": event,
        });

        // no subscribers just means nobody has a page open
        if self.events_tx.send(payload.to_string()).is_err() {
            tracing::debug!(alert_id = %event.alert_id, "no in-app listeners");
        }
        Ok(())
    }
}
