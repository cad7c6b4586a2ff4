use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    error::{EngineError, StoreError},
    models::{Alert, AlertStatus, Decision, Recipient, TriggerEvent, quote::normalize_symbol},
};

use super::{
    alert_store::AlertStore, notifications::Dispatcher, quote_cache::QuoteCache,
    user_directory::UserDirectory,
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationSummary {
    pub checked: usize,
    pub triggered: usize,
    pub expired: usize,
    pub events: Vec<TriggerEvent>,
}

pub struct TriggerEngine {
    store: Arc<dyn AlertStore>,
    quotes: Arc<QuoteCache>,
    dispatcher: Arc<Dispatcher>,
    users: Arc<dyn UserDirectory>,
    eq_tolerance: f64,
    // one cycle at a time; a second caller waits its turn
    cycle: Mutex<()>,
}

impl TriggerEngine {
    pub fn new(
        store: Arc<dyn AlertStore>,
        quotes: Arc<QuoteCache>,
        dispatcher: Arc<Dispatcher>,
        users: Arc<dyn UserDirectory>,
        eq_tolerance: f64,
    ) -> Self {
        Self {
            store,
            quotes,
            dispatcher,
            users,
            eq_tolerance,
            cycle: Mutex::new(()),
        }
    }

    pub async fn evaluate_all(&self) -> Result<EvaluationSummary, EngineError> {
        self.evaluate_all_at(Utc::now().timestamp()).await
    }

    /// Runs one evaluation cycle as of `now` (unix seconds).
    ///
    /// Quotes for every distinct symbol are fetched in a single batch before
    /// any alert is looked at. Each firing is persisted before its event is
    /// dispatched, so a delivery failure never undoes a state change. An
    /// alert its owner changed mid-cycle is skipped without an event. Only
    /// alert store failures abort the cycle.
    pub async fn evaluate_all_at(&self, now: i64) -> Result<EvaluationSummary, EngineError> {
        let _cycle = self.cycle.lock().await;

        let alerts = self.store.list_active_alerts().await?;
        let mut summary = EvaluationSummary {
            checked: alerts.len(),
            ..Default::default()
        };

        let symbols: BTreeSet<String> = alerts
            .iter()
            .filter(|a| a.status == AlertStatus::Active)
            .map(|a| normalize_symbol(&a.symbol))
            .collect();

        if symbols.is_empty() {
            return Ok(summary);
        }

        let quotes = self.quotes.get_quotes_at(&symbols, now).await;

        for mut alert in alerts {
            let quote = quotes.get(&normalize_symbol(&alert.symbol));

            match alert.decide(quote, now, self.eq_tolerance) {
                Decision::Skip(reason) => {
                    tracing::trace!(alert_id = %alert.id, ?reason, "alert skipped");
                }
                Decision::Expire => {
                    alert.expire(now);
                    if !self.write_back(&mut alert).await? {
                        continue;
                    }
                    summary.expired += 1;
                    tracing::info!(
                        alert_id = %alert.id,
                        trigger_count = alert.trigger_count,
                        "alert reached max triggers, expired"
                    );
                }
                Decision::Fire { price } => {
                    let event = alert.fire(price, now);
                    if !self.write_back(&mut alert).await? {
                        continue;
                    }
                    summary.triggered += 1;
                    if alert.status == AlertStatus::Expired {
                        summary.expired += 1;
                    }

                    tracing::info!(
                        alert_id = %alert.id,
                        symbol = %alert.symbol,
                        price,
                        status = alert.status.as_str(),
                        "alert triggered"
                    );

                    self.notify(&alert, &event).await;
                    summary.events.push(event);
                }
            }
        }

        tracing::debug!(
            checked = summary.checked,
            triggered = summary.triggered,
            expired = summary.expired,
            symbols = symbols.len(),
            "evaluation cycle finished"
        );

        Ok(summary)
    }

    /// Persists a change to an alert read at the start of the cycle. Returns
    /// false, leaving the alert alone, when its owner changed or deleted it
    /// while quotes were being fetched.
    async fn write_back(&self, alert: &mut Alert) -> Result<bool, StoreError> {
        let expected = alert.next_version();
        match self.store.save_alert(alert, expected).await {
            Ok(()) => Ok(true),
            Err(StoreError::Stale(id)) => {
                tracing::info!(alert_id = %id, "alert changed during evaluation, skipped");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn notify(&self, alert: &Alert, event: &TriggerEvent) {
        if alert.notification_channels.is_empty() {
            return;
        }

        let recipient = match self.users.recipient(alert.owner_id).await {
            Ok(Some(r)) => r,
            Ok(None) => Recipient::bare(alert.owner_id),
            Err(e) => {
                tracing::warn!(owner_id = %alert.owner_id, error = %e, "recipient lookup failed");
                Recipient::bare(alert.owner_id)
            }
        };

        self.dispatcher
            .dispatch(event, &alert.notification_channels, &recipient)
            .await;
    }
}
