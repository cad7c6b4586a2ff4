use std::collections::{HashMap, hash_map::Entry};

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::{
    Database,
    bson::{doc, oid::ObjectId},
    options::FindOptions,
};
use parking_lot::RwLock;

use crate::{
    error::StoreError,
    models::{Alert, AlertStatus},
};

/// Key-value-by-id persistence for alert records.
///
/// Updates replace the whole record but only apply while the stored record
/// still carries the version the writer read, so a write based on an old
/// read never resurrects a deleted alert or undoes an owner's change.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_active_alerts(&self) -> Result<Vec<Alert>, StoreError>;

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Stale`] when no record with this id and
    /// `expected_version` exists. Never creates a record.
    async fn save_alert(&self, alert: &Alert, expected_version: i64) -> Result<(), StoreError>;

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError>;

    /// Newest first.
    async fn list_owner_alerts(&self, owner_id: ObjectId) -> Result<Vec<Alert>, StoreError>;

    /// Returns false when nothing matched.
    async fn delete_alert(&self, owner_id: ObjectId, id: ObjectId) -> Result<bool, StoreError>;
}

const ALERTS: &str = "alerts";

#[derive(Clone)]
pub struct MongoAlertStore {
    db: Database,
}

impl MongoAlertStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn alerts(&self) -> mongodb::Collection<Alert> {
        self.db.collection::<Alert>(ALERTS)
    }

    async fn find_all(
        &self,
        filter: mongodb::bson::Document,
        opts: Option<FindOptions>,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut cursor = self.alerts().find(filter, opts).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": 1 }).build();
        self.find_all(doc! { "status": AlertStatus::Active.as_str() }, Some(opts))
            .await
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts().insert_one(alert, None).await?;
        Ok(())
    }

    async fn save_alert(&self, alert: &Alert, expected_version: i64) -> Result<(), StoreError> {
        let res = self
            .alerts()
            .replace_one(
                doc! { "_id": alert.id, "version": expected_version },
                alert,
                None,
            )
            .await?;

        if res.matched_count == 0 {
            return Err(StoreError::Stale(alert.id));
        }
        Ok(())
    }

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError> {
        Ok(self.alerts().find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_owner_alerts(&self, owner_id: ObjectId) -> Result<Vec<Alert>, StoreError> {
        let opts = FindOptions::builder().sort(doc! { "created_at": -1 }).build();
        self.find_all(doc! { "owner_id": owner_id }, Some(opts)).await
    }

    async fn delete_alert(&self, owner_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let res = self
            .alerts()
            .delete_one(doc! { "_id": id, "owner_id": owner_id }, None)
            .await?;
        Ok(res.deleted_count > 0)
    }
}

/// Process-local store for tests and database-less runs.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<HashMap<ObjectId, Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alerts(alerts: impl IntoIterator<Item = Alert>) -> Self {
        let map = alerts.into_iter().map(|a| (a.id, a)).collect();
        Self {
            alerts: RwLock::new(map),
        }
    }

    pub fn snapshot(&self, id: ObjectId) -> Option<Alert> {
        self.alerts.read().get(&id).cloned()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn list_active_alerts(&self) -> Result<Vec<Alert>, StoreError> {
        let mut items: Vec<Alert> = self
            .alerts
            .read()
            .values()
            .filter(|a| a.status == AlertStatus::Active)
            .cloned()
            .collect();
        items.sort_by_key(|a| (a.created_at, a.id));
        Ok(items)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        match self.alerts.write().entry(alert.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(alert.id)),
            Entry::Vacant(slot) => {
                slot.insert(alert.clone());
                Ok(())
            }
        }
    }

    async fn save_alert(&self, alert: &Alert, expected_version: i64) -> Result<(), StoreError> {
        match self.alerts.write().get_mut(&alert.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = alert.clone();
                Ok(())
            }
            _ => Err(StoreError::Stale(alert.id)),
        }
    }

    async fn get_alert(&self, id: ObjectId) -> Result<Option<Alert>, StoreError> {
        Ok(self.snapshot(id))
    }

    async fn list_owner_alerts(&self, owner_id: ObjectId) -> Result<Vec<Alert>, StoreError> {
        let mut items: Vec<Alert> = self
            .alerts
            .read()
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        items.sort_by_key(|a| std::cmp::Reverse((a.created_at, a.id)));
        Ok(items)
    }

    async fn delete_alert(&self, owner_id: ObjectId, id: ObjectId) -> Result<bool, StoreError> {
        let mut alerts = self.alerts.write();
        match alerts.get(&id) {
            Some(a) if a.owner_id == owner_id => {
                alerts.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
