use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;

// upper bound on one request's batch
const MAX_SYMBOLS: usize = 50;

#[derive(Deserialize)]
pub struct QuotesQuery {
    #[serde(default)]
    pub symbols: String,
}

// GET /quotes?symbols=BTC,ETH
pub async fn get_quotes(State(state): State<AppState>, Query(q): Query<QuotesQuery>) -> Response {
    let symbols: Vec<&str> = q
        .symbols
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "missing symbols" })),
        )
            .into_response();
    }
    if symbols.len() > MAX_SYMBOLS {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("at most {MAX_SYMBOLS} symbols per request") })),
        )
            .into_response();
    }

    let quotes = state.quotes.get_quotes(symbols).await;
    (StatusCode::OK, Json(json!({ "quotes": quotes }))).into_response()
}

// GET /quotes/stats
pub async fn get_quote_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.quotes.stats())
}
