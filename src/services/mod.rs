pub mod aggregator;
pub mod alert_monitor;
pub mod alert_store;
pub mod alerts_service;
pub mod db_init;
pub mod finnhub;
pub mod notifications;
pub mod quote_cache;
pub mod quote_source;
pub mod trigger_engine;
pub mod user_directory;
