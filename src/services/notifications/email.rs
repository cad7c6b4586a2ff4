use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::{
    error::ChannelError,
    models::{ChannelKind, Recipient, TriggerEvent},
};

use super::{NotificationChannel, post_json};

/// Sends through an HTTP mail relay (`{from, to, subject, text}` JSON).
#[derive(Clone)]
pub struct EmailChannel {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl EmailChannel {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            http: Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

fn body_text(event: &TriggerEvent) -> String {
    format!(
        "{symbol} is {condition}.\nPrice at trigger: {price:.2}\nTriggered at (unix): {at}\nAlert: {id}",
        symbol = event.symbol,
        condition = event.condition_description,
        price = event.price_at_trigger,
        at = event.triggered_at,
        id = event.alert_id,
    )
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, event: &TriggerEvent, recipient: &Recipient) -> Result<(), ChannelError> {
        if self.api_url.trim().is_empty() {
            return Err(ChannelError::NotConfigured("EMAIL_API_URL is empty".to_string()));
        }
        let to = recipient
            .email
            .as_deref()
            .ok_or(ChannelError::MissingAddress("email"))?;

        let body = json!({
            "from": self.from,
            "to": to,
            "subject": event.headline(),
            "text": body_text(event),
        });

        post_json(&self.http, &self.api_url, Some(&self.api_key), &body).await
    }
}
