//! Two-tier quote cache in front of a primary and a secondary source.
//!
//! A lookup is answered from fresh entries first. Everything else is
//! refreshed in one batch: primary (paced, rate limits retried with
//! backoff), then secondary for whatever the primary could not resolve,
//! then stale entries still inside their stale window. A symbol nobody can
//! price is left out of the result.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::{
    sync::Mutex,
    time::{Instant, sleep, timeout},
};

use crate::{
    config::Settings,
    error::SourceError,
    models::{CacheEntry, PriceQuote, quote::normalize_symbol},
};

use super::quote_source::QuoteSource;

// ceiling for the doubling rate-limit backoff
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub ttl_secs: i64,
    pub stale_secs: i64,
    pub min_interval: Duration,
    pub max_rate_limit_retries: u32,
    pub base_backoff: Duration,
    pub source_timeout: Duration,
}

impl CachePolicy {
    pub fn from_settings(s: &Settings) -> Self {
        Self {
            ttl_secs: s.quote_ttl_secs,
            stale_secs: s.quote_stale_secs,
            min_interval: s.primary_min_interval,
            max_rate_limit_retries: s.rate_limit_max_retries,
            base_backoff: s.rate_limit_base_delay,
            source_timeout: s.source_timeout,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl_secs: 30,
            stale_secs: 600,
            min_interval: Duration::from_secs(1),
            max_rate_limit_retries: 3,
            base_backoff: Duration::from_millis(500),
            source_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct CacheStats {
    fresh_hits: AtomicU64,
    refreshed: AtomicU64,
    stale_served: AtomicU64,
    unresolved: AtomicU64,
    primary_calls: AtomicU64,
    primary_failures: AtomicU64,
    secondary_calls: AtomicU64,
    secondary_failures: AtomicU64,
    evicted: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub fresh_hits: u64,
    pub refreshed: u64,
    pub stale_served: u64,
    pub unresolved: u64,
    pub primary_calls: u64,
    pub primary_failures: u64,
    pub secondary_calls: u64,
    pub secondary_failures: u64,
    pub evicted: u64,
    pub entries: usize,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(by as u64, Ordering::Relaxed);
}

/// Spaces outbound primary calls by at least `min_interval`.
struct Pacer {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl Pacer {
    async fn wait_turn(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "pacing primary quote source");
                sleep(wait).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

pub struct QuoteCache {
    primary: Arc<dyn QuoteSource>,
    secondary: Arc<dyn QuoteSource>,
    policy: CachePolicy,
    entries: RwLock<HashMap<String, CacheEntry>>,
    // held for the whole refresh so one batch is in flight at a time
    refresh: Mutex<Pacer>,
    stats: CacheStats,
}

impl QuoteCache {
    pub fn new(
        primary: Arc<dyn QuoteSource>,
        secondary: Arc<dyn QuoteSource>,
        policy: CachePolicy,
    ) -> Self {
        let pacer = Pacer {
            min_interval: policy.min_interval,
            last_call: None,
        };

        Self {
            primary,
            secondary,
            policy,
            entries: RwLock::new(HashMap::new()),
            refresh: Mutex::new(pacer),
            stats: CacheStats::default(),
        }
    }

    pub async fn get_quotes<I, S>(&self, symbols: I) -> HashMap<String, PriceQuote>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.get_quotes_at(symbols, Utc::now().timestamp()).await
    }

    /// Same as [`get_quotes`](Self::get_quotes) with an explicit clock reading
    /// (unix seconds) for the freshness checks.
    pub async fn get_quotes_at<I, S>(&self, symbols: I, now: i64) -> HashMap<String, PriceQuote>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| normalize_symbol(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();

        let started = Instant::now();
        let mut out = HashMap::with_capacity(wanted.len());
        if wanted.is_empty() {
            return out;
        }

        let stale_symbols = self.take_fresh(&wanted, now, &mut out);
        bump(&self.stats.fresh_hits, out.len());

        if stale_symbols.is_empty() {
            return out;
        }

        let refreshed = self.refresh(stale_symbols.clone(), now, started).await;
        let now = advance(now, started);

        let entries = self.entries.read();
        for sym in stale_symbols {
            if let Some(q) = refreshed.get(&sym) {
                out.insert(sym, q.clone());
                continue;
            }

            match entries.get(&sym) {
                Some(entry) if entry.is_servable(now) => {
                    tracing::debug!(symbol = %sym, fetched_at = entry.fetched_at, "serving stale quote");
                    bump(&self.stats.stale_served, 1);
                    out.insert(sym, entry.quote.clone());
                }
                _ => {
                    tracing::debug!(symbol = %sym, "no usable quote from any tier");
                    bump(&self.stats.unresolved, 1);
                }
            }
        }

        out
    }

    /// Moves fresh entries into `out`; returns the symbols that need a refresh.
    fn take_fresh(
        &self,
        wanted: &BTreeSet<String>,
        now: i64,
        out: &mut HashMap<String, PriceQuote>,
    ) -> Vec<String> {
        let entries = self.entries.read();
        let mut missing = Vec::new();

        for sym in wanted {
            match entries.get(sym) {
                Some(entry) if entry.is_fresh(now) => {
                    out.insert(sym.clone(), entry.quote.clone());
                }
                _ => missing.push(sym.clone()),
            }
        }

        missing
    }

    async fn refresh(
        &self,
        symbols: Vec<String>,
        now: i64,
        started: Instant,
    ) -> HashMap<String, PriceQuote> {
        let mut pacer = self.refresh.lock().await;
        let queued_until = advance(now, started);

        // another caller may have refreshed these while we queued
        let mut resolved = HashMap::new();
        let wanted: BTreeSet<String> = symbols.into_iter().collect();
        let pending = self.take_fresh(&wanted, queued_until, &mut resolved);
        if pending.is_empty() {
            return resolved;
        }

        let mut accepted = Vec::new();

        match self.fetch_primary(&mut pacer, &pending).await {
            Ok(quotes) => accepted.extend(usable(quotes, &pending)),
            Err(e) => {
                bump(&self.stats.primary_failures, 1);
                tracing::warn!(error = %e, symbols = pending.len(), "primary quote source failed");
            }
        }

        let remaining: Vec<String> = pending
            .iter()
            .filter(|s| !accepted.iter().any(|q: &PriceQuote| &q.symbol == *s))
            .cloned()
            .collect();

        if !remaining.is_empty() {
            bump(&self.stats.secondary_calls, 1);
            match self.call(self.secondary.as_ref(), &remaining).await {
                Ok(quotes) => accepted.extend(usable(quotes, &remaining)),
                Err(e) => {
                    bump(&self.stats.secondary_failures, 1);
                    tracing::warn!(error = %e, symbols = remaining.len(), "secondary quote source failed");
                }
            }
        }

        bump(&self.stats.refreshed, accepted.len());

        let fetched_at = advance(now, started);
        let mut entries = self.entries.write();
        for quote in accepted {
            let entry = CacheEntry::new(
                quote.clone(),
                fetched_at,
                self.policy.ttl_secs,
                self.policy.stale_secs,
            );
            entries.insert(quote.symbol.clone(), entry);
            resolved.insert(quote.symbol.clone(), quote);
        }

        let before = entries.len();
        entries.retain(|_, e| e.is_servable(fetched_at));
        bump(&self.stats.evicted, before - entries.len());

        resolved
    }

    async fn fetch_primary(
        &self,
        pacer: &mut Pacer,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceQuote>, SourceError> {
        let mut delay = self.policy.base_backoff;
        let mut retries = 0;

        loop {
            pacer.wait_turn().await;
            bump(&self.stats.primary_calls, 1);

            match self.call(self.primary.as_ref(), symbols).await {
                Err(e) if e.is_rate_limited() && retries < self.policy.max_rate_limit_retries => {
                    retries += 1;
                    tracing::info!(
                        retry = retries,
                        delay_ms = delay.as_millis() as u64,
                        "primary quote source rate limited, backing off"
                    );
                    sleep(delay).await;
                    delay = next_backoff(delay);
                }
                other => return other,
            }
        }
    }

    async fn call(
        &self,
        source: &dyn QuoteSource,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceQuote>, SourceError> {
        match timeout(self.policy.source_timeout, source.fetch_batch(symbols)).await {
            Ok(res) => res,
            Err(_) => Err(SourceError::Timeout {
                source_name: source.name().to_string(),
                millis: self.policy.source_timeout.as_millis(),
            }),
        }
    }

    /// Current entry for a symbol regardless of freshness.
    pub fn peek(&self, symbol: &str) -> Option<CacheEntry> {
        self.entries.read().get(&normalize_symbol(symbol)).cloned()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CacheStatsSnapshot {
            fresh_hits: load(&self.stats.fresh_hits),
            refreshed: load(&self.stats.refreshed),
            stale_served: load(&self.stats.stale_served),
            unresolved: load(&self.stats.unresolved),
            primary_calls: load(&self.stats.primary_calls),
            primary_failures: load(&self.stats.primary_failures),
            secondary_calls: load(&self.stats.secondary_calls),
            secondary_failures: load(&self.stats.secondary_failures),
            evicted: load(&self.stats.evicted),
            entries: self.entries.read().len(),
        }
    }
}

/// Keeps quotes for requested symbols with a sane price, keyed by symbol.
/// `now` moved forward by the whole seconds spent since `started`, so an
/// entry is stamped with when its fetch finished, not when the lookup began.
fn advance(now: i64, started: Instant) -> i64 {
    let waited = i64::try_from(started.elapsed().as_secs()).unwrap_or(i64::MAX);
    now.saturating_add(waited)
}

fn next_backoff(delay: Duration) -> Duration {
    delay.saturating_mul(2).min(MAX_BACKOFF)
}

fn usable(quotes: HashMap<String, PriceQuote>, requested: &[String]) -> Vec<PriceQuote> {
    quotes
        .into_iter()
        .filter_map(|(key, mut q)| {
            let sym = normalize_symbol(&key);
            if !requested.contains(&sym) || !q.is_usable() {
                return None;
            }
            q.symbol = sym;
            Some(q)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_the_ceiling() {
        assert_eq!(next_backoff(Duration::from_millis(500)), Duration::from_secs(1));
        assert_eq!(next_backoff(Duration::from_secs(40)), MAX_BACKOFF);
        assert_eq!(next_backoff(Duration::MAX), MAX_BACKOFF);
    }

    #[test]
    fn advance_adds_whole_seconds_waited() {
        let started = Instant::now() - Duration::from_millis(2_500);
        assert_eq!(advance(100, started), 102);
        assert_eq!(advance(i64::MAX, started), i64::MAX);
    }
}
