use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    // unix seconds, as reported by the source
    pub as_of: i64,
    // name of the source that produced it
    pub source: String,
}

impl PriceQuote {
    pub fn new(symbol: &str, price: f64, as_of: i64, source: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            price,
            as_of,
            source: source.to_string(),
        }
    }

    /// Sources occasionally report zero or NaN for unknown symbols.
    pub fn is_usable(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A cached quote with its two expiry horizons. Replaced whole, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub quote: PriceQuote,
    pub fetched_at: i64,
    pub ttl_expires_at: i64,
    pub stale_expires_at: i64,
}

impl CacheEntry {
    pub fn new(quote: PriceQuote, fetched_at: i64, ttl_secs: i64, stale_secs: i64) -> Self {
        Self {
            quote,
            fetched_at,
            ttl_expires_at: fetched_at + ttl_secs,
            stale_expires_at: fetched_at + stale_secs.max(ttl_secs),
        }
    }

    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.ttl_expires_at
    }

    pub fn is_servable(&self, now: i64) -> bool {
        now < self.stale_expires_at
    }
}
