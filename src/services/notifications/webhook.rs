use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::ChannelError,
    models::{ChannelKind, Recipient, TriggerEvent},
};

use super::{NotificationChannel, post_json};

/// POSTs the raw event to the owner's webhook URL.
#[derive(Clone, Default)]
pub struct WebhookChannel {
    http: Client,
}

impl WebhookChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, event: &TriggerEvent, recipient: &Recipient) -> Result<(), ChannelError> {
        let url = recipient
            .webhook_url
            .as_deref()
            .ok_or(ChannelError::MissingAddress("webhook"))?;

        let body = serde_json::to_value(event).map_err(|e| ChannelError::Delivery(e.to_string()))?;
        post_json(&self.http, url, None, &body).await
    }
}
