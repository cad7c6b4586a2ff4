use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::{
    Database,
    bson::{doc, oid::ObjectId},
};
use parking_lot::RwLock;

use crate::{
    error::StoreError,
    models::{Recipient, User},
};

/// Resolves an alert owner to the addresses notifications go to.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn recipient(&self, owner_id: ObjectId) -> Result<Option<Recipient>, StoreError>;
}

#[derive(Clone)]
pub struct MongoUserDirectory {
    db: Database,
}

impl MongoUserDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for MongoUserDirectory {
    async fn recipient(&self, owner_id: ObjectId) -> Result<Option<Recipient>, StoreError> {
        let users = self.db.collection::<User>("users");
        let user = users.find_one(doc! { "_id": owner_id }, None).await?;
        Ok(user.map(Recipient::from))
    }
}

#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<ObjectId, Recipient>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, owner_id: ObjectId, recipient: Recipient) {
        self.users.write().insert(owner_id, recipient);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn recipient(&self, owner_id: ObjectId) -> Result<Option<Recipient>, StoreError> {
        Ok(self.users.read().get(&owner_id).cloned())
    }
}
