use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::{
    error::ChannelError,
    models::{ChannelKind, Recipient, TriggerEvent},
};

use super::{NotificationChannel, post_json};

// single-segment SMS
const MAX_BODY_CHARS: usize = 160;

#[derive(Clone)]
pub struct SmsChannel {
    http: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl SmsChannel {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            http: Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, event: &TriggerEvent, recipient: &Recipient) -> Result<(), ChannelError> {
        if self.api_url.trim().is_empty() {
            return Err(ChannelError::NotConfigured("SMS_API_URL is empty".to_string()));
        }
        let to = recipient
            .phone
            .as_deref()
            .ok_or(ChannelError::MissingAddress("phone"))?;

        let text: String = event.headline().chars().take(MAX_BODY_CHARS).collect();
        let body = json!({
            "from": self.from,
            "to": to,
            "body": text,
        });

        post_json(&self.http, &self.api_url, Some(&self.api_key), &body).await
    }
}
