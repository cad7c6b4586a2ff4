use std::{collections::HashMap, time::Duration};

use pricewatch::config::Settings;

fn settings(pairs: &[(&str, &str)]) -> Settings {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Settings::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn defaults_apply_when_nothing_is_set() {
    let s = settings(&[]);

    assert_eq!(s.port, 3000);
    assert_eq!(s.mongodb_db, "pricewatch");
    assert_eq!(s.quote_ttl_secs, 30);
    assert_eq!(s.quote_stale_secs, 600);
    assert_eq!(s.rate_limit_max_retries, 3);
    assert_eq!(s.rate_limit_base_delay, Duration::from_millis(500));
    assert_eq!(s.eq_tolerance, 0.001);
    assert_eq!(s.quote_currency, "USD");
}

#[test]
fn values_are_parsed_and_bad_values_fall_back() {
    let s = settings(&[
        ("PORT", "8080"),
        ("QUOTE_TTL_SECS", "15"),
        ("RATE_LIMIT_MAX_RETRIES", "many"),
        ("ALERT_EVAL_INTERVAL_SECS", "10"),
        ("QUOTE_CURRENCY", "eur"),
    ]);

    assert_eq!(s.port, 8080);
    assert_eq!(s.quote_ttl_secs, 15);
    assert_eq!(s.rate_limit_max_retries, 3);
    assert_eq!(s.alert_eval_interval, Duration::from_secs(10));
    assert_eq!(s.quote_currency, "EUR");
}

#[test]
fn stale_window_is_never_shorter_than_ttl() {
    let s = settings(&[("QUOTE_TTL_SECS", "120"), ("QUOTE_STALE_SECS", "60")]);

    assert_eq!(s.quote_stale_secs, 120);
}
