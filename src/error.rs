use mongodb::bson::oid::ObjectId;
use thiserror::Error;

/// Failure of one upstream quote source for one batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("{source_name} rate limited the request")]
    RateLimited { source_name: String },

    #[error("{source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    #[error("{source_name} timed out after {millis}ms")]
    Timeout { source_name: String, millis: u128 },
}

impl SourceError {
    pub fn unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn rate_limited(source_name: &str) -> Self {
        SourceError::RateLimited {
            source_name: source_name.to_string(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited { .. })
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("alert {0} already exists")]
    Duplicate(ObjectId),

    #[error("alert {0} was changed or deleted since it was read")]
    Stale(ObjectId),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("recipient has no {0} address")]
    MissingAddress(&'static str),

    #[error("channel not configured: {0}")]
    NotConfigured(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("delivery timed out after {0}ms")]
    Timeout(u128),
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        ChannelError::Delivery(e.to_string())
    }
}

/// The only failure that escapes an evaluation cycle.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("alert store failure: {0}")]
    Store(#[from] StoreError),
}
