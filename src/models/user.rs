use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// The slice of a user document the dispatcher needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Delivery addresses for an alert owner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub owner_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub webhook_url: Option<String>,
}

impl Recipient {
    /// A recipient with no addresses; only owner-scoped channels can reach it.
    pub fn bare(owner_id: ObjectId) -> Self {
        Self {
            owner_id: owner_id.to_hex(),
            ..Default::default()
        }
    }
}

impl From<User> for Recipient {
    fn from(u: User) -> Self {
        Self {
            owner_id: u.id.to_hex(),
            email: non_blank(u.email),
            phone: non_blank(u.phone),
            webhook_url: non_blank(u.webhook_url),
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Identity of the caller, injected by the owner middleware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Owner {
    pub id: ObjectId,
}
