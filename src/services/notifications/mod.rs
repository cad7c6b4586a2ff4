//! Fan-out of trigger events to delivery channels.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use tokio::time::timeout;

use crate::{
    error::ChannelError,
    models::{ChannelKind, DispatchOutcome, Recipient, TriggerEvent},
};

pub mod email;
pub mod in_app;
pub mod sms;
pub mod webhook;

pub use email::EmailChannel;
pub use in_app::InAppChannel;
pub use sms::SmsChannel;
pub use webhook::WebhookChannel;

/// One delivery mechanism. Implementations make a single attempt; the
/// dispatcher never retries.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, event: &TriggerEvent, recipient: &Recipient) -> Result<(), ChannelError>;
}

pub struct Dispatcher {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
    channel_timeout: Duration,
}

impl Dispatcher {
    pub fn new(channel_timeout: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            channel_timeout,
        }
    }

    /// Registers a channel under its own kind, replacing any previous one.
    pub fn register(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.insert(channel.kind(), channel);
        self
    }

    pub fn registered(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        self.channels.keys().copied()
    }

    /// Attempts every requested channel concurrently, each under its own
    /// timeout. Outcomes come back in the order the channels were given.
    pub async fn dispatch<'a>(
        &self,
        event: &TriggerEvent,
        channels: impl IntoIterator<Item = &'a ChannelKind>,
        recipient: &Recipient,
    ) -> Vec<DispatchOutcome> {
        let attempts = channels.into_iter().map(|kind| self.attempt(*kind, event, recipient));
        let outcomes = join_all(attempts).await;

        for o in &outcomes {
            match &o.error {
                None => tracing::info!(
                    alert_id = %event.alert_id,
                    channel = %o.channel,
                    "notification delivered"
                ),
                Some(err) => tracing::warn!(
                    alert_id = %event.alert_id,
                    channel = %o.channel,
                    error = %err,
                    "notification failed"
                ),
            }
        }

        outcomes
    }

    async fn attempt(
        &self,
        kind: ChannelKind,
        event: &TriggerEvent,
        recipient: &Recipient,
    ) -> DispatchOutcome {
        let attempted_at = Utc::now().timestamp();

        let result = match self.channels.get(&kind) {
            None => Err(ChannelError::NotConfigured(kind.to_string())),
            Some(channel) => match timeout(self.channel_timeout, channel.send(event, recipient)).await {
                Ok(res) => res,
                Err(_) => Err(ChannelError::Timeout(self.channel_timeout.as_millis())),
            },
        };

        DispatchOutcome {
            channel: kind,
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            attempted_at,
        }
    }
}

/// Shared POST-and-check used by the HTTP relay channels.
pub(crate) async fn post_json(
    http: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
) -> Result<(), ChannelError> {
    let mut req = http.post(url).json(body);
    if let Some(key) = bearer.filter(|k| !k.trim().is_empty()) {
        req = req.bearer_auth(key);
    }

    let res = req.send().await?;
    if !res.status().is_success() {
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        let snippet: String = text.chars().take(200).collect();
        return Err(ChannelError::Delivery(format!("{status} {snippet}")));
    }

    Ok(())
}
