use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    error::StoreError,
    models::{Alert, AlertStatus, ChannelKind, Frequency, Operator, quote::normalize_symbol},
};

use super::alert_store::AlertStore;

pub type FieldErrors = HashMap<String, String>;

#[derive(Error, Debug)]
pub enum AlertsError {
    #[error("invalid alert")]
    Invalid(FieldErrors),

    #[error("alert not found")]
    NotFound,

    #[error("alert is {0}, expected {1}")]
    WrongStatus(&'static str, &'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAlert {
    pub symbol: String,
    pub operator: Operator,
    pub threshold: f64,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub cooldown_minutes: Option<u32>,
    #[serde(default)]
    pub max_triggers: Option<u32>,
    #[serde(default)]
    pub notification_channels: Option<BTreeSet<ChannelKind>>,
}

/// Owner edits. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertUpdate {
    pub operator: Option<Operator>,
    pub threshold: Option<f64>,
    pub frequency: Option<Frequency>,
    pub cooldown_minutes: Option<u32>,
    pub max_triggers: Option<u32>,
    #[serde(default)]
    pub clear_max_triggers: bool,
    pub notification_channels: Option<BTreeSet<ChannelKind>>,
}

fn check_symbol(sym: &str, errs: &mut FieldErrors) {
    let valid = !sym.is_empty()
        && sym.len() <= 24
        && sym
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_' | '/'));
    if !valid {
        errs.insert("symbol".into(), "Enter a valid symbol.".into());
    }
}

fn check_threshold(threshold: f64, errs: &mut FieldErrors) {
    if !threshold.is_finite() || threshold <= 0.0 {
        errs.insert("threshold".into(), "Please enter a valid target price.".into());
    }
}

fn check_max_triggers(max: Option<u32>, errs: &mut FieldErrors) {
    if max == Some(0) {
        errs.insert("max_triggers".into(), "Max triggers must be at least 1.".into());
    }
}

fn check_channels(channels: &BTreeSet<ChannelKind>, errs: &mut FieldErrors) {
    if channels.is_empty() {
        errs.insert(
            "notification_channels".into(),
            "Choose at least one notification channel.".into(),
        );
    }
}

pub async fn create_alert(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    input: NewAlert,
    default_cooldown_minutes: u32,
) -> Result<Alert, AlertsError> {
    let mut errs = FieldErrors::new();

    let symbol = normalize_symbol(&input.symbol);
    check_symbol(&symbol, &mut errs);
    check_threshold(input.threshold, &mut errs);
    check_max_triggers(input.max_triggers, &mut errs);

    let channels = input
        .notification_channels
        .unwrap_or_else(|| BTreeSet::from([ChannelKind::InApp]));
    check_channels(&channels, &mut errs);

    if !errs.is_empty() {
        return Err(AlertsError::Invalid(errs));
    }

    let now = Utc::now().timestamp();
    let alert = Alert {
        id: ObjectId::new(),
        owner_id,
        symbol,
        operator: input.operator,
        threshold: input.threshold,
        status: AlertStatus::Active,
        frequency: input.frequency.unwrap_or(Frequency::Once),
        cooldown_minutes: input.cooldown_minutes.unwrap_or(default_cooldown_minutes),
        max_triggers: input.max_triggers,
        trigger_count: 0,
        last_triggered_at: None,
        notification_channels: channels,
        created_at: now,
        updated_at: now,
        version: 0,
    };

    store.insert_alert(&alert).await?;
    tracing::info!(alert_id = %alert.id, owner_id = %owner_id, symbol = %alert.symbol, "alert created");

    Ok(alert)
}

async fn owned_alert(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Alert, AlertsError> {
    match store.get_alert(alert_id).await? {
        Some(a) if a.owner_id == owner_id => Ok(a),
        _ => Err(AlertsError::NotFound),
    }
}

pub async fn update_alert(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    alert_id: ObjectId,
    update: AlertUpdate,
) -> Result<Alert, AlertsError> {
    let mut alert = owned_alert(store, owner_id, alert_id).await?;
    let mut errs = FieldErrors::new();

    if let Some(op) = update.operator {
        alert.operator = op;
    }
    if let Some(t) = update.threshold {
        check_threshold(t, &mut errs);
        alert.threshold = t;
    }
    if let Some(f) = update.frequency {
        alert.frequency = f;
    }
    if let Some(c) = update.cooldown_minutes {
        alert.cooldown_minutes = c;
    }
    if update.clear_max_triggers {
        alert.max_triggers = None;
    } else if update.max_triggers.is_some() {
        check_max_triggers(update.max_triggers, &mut errs);
        alert.max_triggers = update.max_triggers;
    }
    if let Some(ch) = update.notification_channels {
        check_channels(&ch, &mut errs);
        alert.notification_channels = ch;
    }

    if !errs.is_empty() {
        return Err(AlertsError::Invalid(errs));
    }

    alert.updated_at = Utc::now().timestamp();
    let expected = alert.next_version();
    store.save_alert(&alert, expected).await?;

    Ok(alert)
}

async fn transition(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    alert_id: ObjectId,
    from: AlertStatus,
    to: AlertStatus,
) -> Result<Alert, AlertsError> {
    let mut alert = owned_alert(store, owner_id, alert_id).await?;
    if alert.status != from {
        return Err(AlertsError::WrongStatus(alert.status.as_str(), from.as_str()));
    }

    alert.status = to;
    alert.updated_at = Utc::now().timestamp();
    let expected = alert.next_version();
    store.save_alert(&alert, expected).await?;

    tracing::info!(alert_id = %alert.id, status = to.as_str(), "alert status changed by owner");
    Ok(alert)
}

pub async fn pause_alert(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Alert, AlertsError> {
    transition(store, owner_id, alert_id, AlertStatus::Active, AlertStatus::Paused).await
}

pub async fn resume_alert(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Alert, AlertsError> {
    transition(store, owner_id, alert_id, AlertStatus::Paused, AlertStatus::Active).await
}

pub async fn delete_alert(
    store: &dyn AlertStore,
    owner_id: ObjectId,
    alert_id: ObjectId,
) -> Result<(), AlertsError> {
    if store.delete_alert(owner_id, alert_id).await? {
        Ok(())
    } else {
        Err(AlertsError::NotFound)
    }
}

pub async fn list_owner_alerts(
    store: &dyn AlertStore,
    owner_id: ObjectId,
) -> Result<Vec<Alert>, AlertsError> {
    Ok(store.list_owner_alerts(owner_id).await?)
}
