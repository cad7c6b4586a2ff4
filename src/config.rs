use std::{env, str::FromStr, time::Duration};

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub finnhub_api_key: String,
    pub aggregator_base_url: String,
    pub aggregator_api_key: String,
    pub quote_currency: String,

    pub quote_ttl_secs: i64,
    pub quote_stale_secs: i64,
    pub primary_min_interval: Duration,
    pub rate_limit_max_retries: u32,
    pub rate_limit_base_delay: Duration,
    pub source_timeout: Duration,
    pub channel_timeout: Duration,

    pub alert_eval_interval: Duration,
    pub eq_tolerance: f64,
    pub default_cooldown_minutes: u32,

    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
    pub sms_api_url: String,
    pub sms_api_key: String,
    pub sms_from: String,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    Settings::from_lookup(|key| env::var(key).ok())
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn text(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

impl Settings {
    /// Builds settings from an arbitrary key lookup. Unparseable values fall
    /// back to the default for that key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let quote_ttl_secs = parsed(&lookup, "QUOTE_TTL_SECS", 30i64).max(1);
        // the stale window can never be shorter than the fresh window
        let quote_stale_secs = parsed(&lookup, "QUOTE_STALE_SECS", 600i64).max(quote_ttl_secs);

        Settings {
            mongodb_uri: text(&lookup, "MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_db: text(&lookup, "MONGODB_DB", "pricewatch"),
            host: text(&lookup, "HOST", "127.0.0.1"),
            port: parsed(&lookup, "PORT", 3000u16),

            finnhub_api_key: text(&lookup, "FINNHUB_API_KEY", ""),
            aggregator_base_url: text(
                &lookup,
                "AGGREGATOR_BASE_URL",
                "https://min-api.cryptocompare.com/data",
            ),
            aggregator_api_key: text(&lookup, "AGGREGATOR_API_KEY", ""),
            quote_currency: text(&lookup, "QUOTE_CURRENCY", "USD").to_uppercase(),

            quote_ttl_secs,
            quote_stale_secs,
            primary_min_interval: Duration::from_millis(parsed(
                &lookup,
                "PRIMARY_MIN_INTERVAL_MS",
                1_000u64,
            )),
            rate_limit_max_retries: parsed(&lookup, "RATE_LIMIT_MAX_RETRIES", 3u32),
            rate_limit_base_delay: Duration::from_millis(parsed(
                &lookup,
                "RATE_LIMIT_BASE_DELAY_MS",
                500u64,
            )),
            source_timeout: Duration::from_millis(parsed(&lookup, "SOURCE_TIMEOUT_MS", 5_000u64)),
            channel_timeout: Duration::from_millis(parsed(&lookup, "CHANNEL_TIMEOUT_MS", 5_000u64)),

            alert_eval_interval: Duration::from_secs(
                parsed(&lookup, "ALERT_EVAL_INTERVAL_SECS", 60u64).max(1),
            ),
            eq_tolerance: parsed(&lookup, "EQ_TOLERANCE", 0.001f64),
            default_cooldown_minutes: parsed(&lookup, "DEFAULT_COOLDOWN_MINUTES", 60u32),

            email_api_url: text(&lookup, "EMAIL_API_URL", ""),
            email_api_key: text(&lookup, "EMAIL_API_KEY", ""),
            email_from: text(&lookup, "EMAIL_FROM", "alerts@pricewatch.local"),
            sms_api_url: text(&lookup, "SMS_API_URL", ""),
            sms_api_key: text(&lookup, "SMS_API_KEY", ""),
            sms_from: text(&lookup, "SMS_FROM", ""),
        }
    }
}
