use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    #[serde(alias = "browser", alias = "push")]
    InApp,
    Sms,
    Webhook,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Email => "email",
            ChannelKind::InApp => "in_app",
            ChannelKind::Sms => "sms",
            ChannelKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One firing decision. Built by the trigger engine, consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub alert_id: String,
    pub symbol: String,
    pub price_at_trigger: f64,
    pub triggered_at: i64,
    pub condition_description: String,
}

impl TriggerEvent {
    pub fn headline(&self) -> String {
        format!(
            "{} alert: {} (now {:.2})",
            self.symbol, self.condition_description, self.price_at_trigger
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub channel: ChannelKind,
    pub success: bool,
    pub error: Option<String>,
    pub attempted_at: i64,
}
