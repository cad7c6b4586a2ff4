//! Library entrypoint for pricewatch.
//!
//! `main.rs` wires the long-lived instances together; integration tests under
//! `tests/` build the same state around in-memory collaborators.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/owner.rs"]
pub mod owner;

pub mod services;

pub mod controllers;
pub mod routes;

use services::{alert_store::AlertStore, quote_cache::QuoteCache, trigger_engine::TriggerEngine};

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub quotes: Arc<QuoteCache>,
    pub engine: Arc<TriggerEngine>,
    pub store: Arc<dyn AlertStore>,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}
