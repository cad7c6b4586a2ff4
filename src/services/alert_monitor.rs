use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use super::trigger_engine::TriggerEngine;

/// Periodic driver for the trigger engine. A slow cycle delays the next
/// tick instead of overlapping with it or being dropped.
pub fn spawn_price_alert_monitor(engine: Arc<TriggerEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match engine.evaluate_all().await {
                Ok(summary) if summary.triggered > 0 || summary.expired > 0 => {
                    tracing::info!(
                        checked = summary.checked,
                        triggered = summary.triggered,
                        expired = summary.expired,
                        "[alert-monitor] tick"
                    );
                }
                Ok(summary) => {
                    tracing::debug!(checked = summary.checked, "[alert-monitor] tick");
                }
                Err(e) => {
                    tracing::error!(error = %e, "[alert-monitor] tick error");
                }
            }
        }
    })
}
