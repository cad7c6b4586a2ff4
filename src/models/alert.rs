use std::collections::BTreeSet;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::{ChannelKind, PriceQuote, TriggerEvent};

const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = "above")]
    Gt,
    #[serde(alias = "below")]
    Lt,
    Eq,
}

impl Operator {
    /// `tolerance` is the relative band used by `Eq`.
    pub fn holds(&self, price: f64, threshold: f64, tolerance: f64) -> bool {
        match self {
            Operator::Gt => price > threshold,
            Operator::Lt => price < threshold,
            Operator::Eq => (price - threshold).abs() < threshold.abs() * tolerance,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Operator::Gt => "above",
            Operator::Lt => "below",
            Operator::Eq => "approximately equal to",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Paused,
    Expired,
    Triggered,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Paused => "paused",
            AlertStatus::Expired => "expired",
            AlertStatus::Triggered => "triggered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Recurring,
    Daily,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub owner_id: ObjectId,
    pub symbol: String,

    pub operator: Operator,
    pub threshold: f64,

    pub status: AlertStatus,
    pub frequency: Frequency,
    pub cooldown_minutes: u32,

    #[serde(default)]
    pub max_triggers: Option<u32>,
    #[serde(default)]
    pub trigger_count: u32,
    #[serde(default)]
    pub last_triggered_at: Option<i64>,

    #[serde(default)]
    pub notification_channels: BTreeSet<ChannelKind>,

    pub created_at: i64,
    pub updated_at: i64,

    /// Bumped on every write; conditional updates match on it.
    #[serde(default)]
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotActive,
    NoQuote,
    ConditionNotMet,
    CoolingDown,
}

/// What one evaluation pass decided for one alert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Skip(SkipReason),
    Expire,
    Fire { price: f64 },
}

impl Alert {
    pub fn condition_description(&self) -> String {
        format!("{} {:.2}", self.operator.describe(), self.threshold)
    }

    /// Minimum seconds between two firings.
    pub fn cooldown_secs(&self) -> i64 {
        let configured = i64::from(self.cooldown_minutes) * 60;
        match self.frequency {
            Frequency::Daily => configured.max(SECS_PER_DAY),
            Frequency::Once | Frequency::Recurring => configured,
        }
    }

    pub fn cooldown_elapsed(&self, now: i64) -> bool {
        match self.last_triggered_at {
            Some(last) => now >= last + self.cooldown_secs(),
            None => true,
        }
    }

    pub fn trigger_budget_exhausted(&self) -> bool {
        self.max_triggers
            .is_some_and(|max| self.trigger_count >= max)
    }

    /// Runs the five gates in order: status, quote, condition, cooldown, budget.
    pub fn decide(&self, quote: Option<&PriceQuote>, now: i64, tolerance: f64) -> Decision {
        if self.status != AlertStatus::Active {
            return Decision::Skip(SkipReason::NotActive);
        }

        let Some(quote) = quote else {
            return Decision::Skip(SkipReason::NoQuote);
        };

        if !self.operator.holds(quote.price, self.threshold, tolerance) {
            return Decision::Skip(SkipReason::ConditionNotMet);
        }

        if !self.cooldown_elapsed(now) {
            return Decision::Skip(SkipReason::CoolingDown);
        }

        if self.trigger_budget_exhausted() {
            return Decision::Expire;
        }

        Decision::Fire { price: quote.price }
    }

    /// Applies a firing to the record and returns the event describing it.
    /// All fields change together; callers persist the whole record.
    pub fn fire(&mut self, price: f64, now: i64) -> TriggerEvent {
        self.trigger_count += 1;
        self.last_triggered_at = Some(now);
        self.updated_at = now;

        if self.frequency == Frequency::Once {
            self.status = AlertStatus::Triggered;
        } else if self.trigger_budget_exhausted() {
            self.status = AlertStatus::Expired;
        }

        TriggerEvent {
            alert_id: self.id.to_hex(),
            symbol: self.symbol.clone(),
            price_at_trigger: price,
            triggered_at: now,
            condition_description: self.condition_description(),
        }
    }

    /// Advances the write version and returns the one the stored record must
    /// still carry for the write to apply.
    pub fn next_version(&mut self) -> i64 {
        let prior = self.version;
        self.version += 1;
        prior
    }

    pub fn expire(&mut self, now: i64) {
        self.status = AlertStatus::Expired;
        self.updated_at = now;
    }
}
