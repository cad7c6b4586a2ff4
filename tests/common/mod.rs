#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use pricewatch::{
    error::{ChannelError, SourceError},
    models::{
        Alert, AlertStatus, ChannelKind, Frequency, Operator, PriceQuote, Recipient, TriggerEvent,
    },
    services::{
        notifications::NotificationChannel,
        quote_cache::{CachePolicy, QuoteCache},
        quote_source::QuoteSource,
    },
};

type Step = Result<Vec<(String, f64)>, SourceError>;

/// In-process quote source that answers from a script, then from a default.
pub struct ScriptedSource {
    name: String,
    script: Mutex<VecDeque<Step>>,
    default: Mutex<Step>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Vec<String>>>,
}

fn owned(prices: &[(&str, f64)]) -> Vec<(String, f64)> {
    prices.iter().map(|(s, p)| (s.to_string(), *p)).collect()
}

impl ScriptedSource {
    fn with_default(name: &str, default: Step) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(VecDeque::new()),
            default: Mutex::new(default),
            delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn serving(name: &str, prices: &[(&str, f64)]) -> Arc<Self> {
        Self::with_default(name, Ok(owned(prices)))
    }

    pub fn failing(name: &str, err: SourceError) -> Arc<Self> {
        Self::with_default(name, Err(err))
    }

    pub fn then_serve(&self, prices: &[(&str, f64)]) {
        self.script.lock().unwrap().push_back(Ok(owned(prices)));
    }

    pub fn then_fail(&self, err: SourceError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn always_serve(&self, prices: &[(&str, f64)]) {
        *self.default.lock().unwrap() = Ok(owned(prices));
    }

    pub fn always_fail(&self, err: SourceError) {
        *self.default.lock().unwrap() = Err(err);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_batch(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceQuote>, SourceError> {
        self.calls.lock().unwrap().push(symbols.to_vec());

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.lock().unwrap().clone());
        let delay = *self.delay.lock().unwrap();

        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }

        let prices = step?;
        Ok(prices
            .into_iter()
            .filter(|(s, _)| symbols.contains(s))
            .map(|(s, p)| (s.clone(), PriceQuote::new(&s, p, 0, &self.name)))
            .collect())
    }
}

pub fn unavailable(name: &str) -> SourceError {
    SourceError::unavailable(name, "503 Service Unavailable")
}

pub fn test_policy() -> CachePolicy {
    CachePolicy {
        ttl_secs: 30,
        stale_secs: 600,
        min_interval: Duration::ZERO,
        max_rate_limit_retries: 2,
        base_backoff: Duration::from_millis(1),
        source_timeout: Duration::from_secs(1),
    }
}

pub fn cache(primary: &Arc<ScriptedSource>, secondary: &Arc<ScriptedSource>) -> QuoteCache {
    QuoteCache::new(primary.clone(), secondary.clone(), test_policy())
}

pub fn alert(symbol: &str, operator: Operator, threshold: f64) -> Alert {
    Alert {
        id: ObjectId::new(),
        owner_id: ObjectId::new(),
        symbol: symbol.to_string(),
        operator,
        threshold,
        status: AlertStatus::Active,
        frequency: Frequency::Once,
        cooldown_minutes: 0,
        max_triggers: None,
        trigger_count: 0,
        last_triggered_at: None,
        notification_channels: BTreeSet::from([ChannelKind::InApp]),
        created_at: 1_000,
        updated_at: 1_000,
        version: 0,
    }
}

/// Channel that records what it was asked to deliver, optionally failing.
pub struct RecordingChannel {
    kind: ChannelKind,
    fail_with: Option<ChannelError>,
    delay: Option<Duration>,
    sent: Mutex<Vec<(TriggerEvent, Recipient)>>,
}

impl RecordingChannel {
    pub fn ok(kind: ChannelKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail_with: None,
            delay: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(kind: ChannelKind, err: ChannelError) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail_with: Some(err),
            delay: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(kind: ChannelKind, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail_with: None,
            delay: Some(delay),
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<(TriggerEvent, Recipient)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, event: &TriggerEvent, recipient: &Recipient) -> Result<(), ChannelError> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.sent
            .lock()
            .unwrap()
            .push((event.clone(), recipient.clone()));
        Ok(())
    }
}
