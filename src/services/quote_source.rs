use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{error::SourceError, models::PriceQuote};

/// An upstream that can price a batch of symbols in one logical call.
///
/// Implementations return whatever subset they could resolve, keyed by the
/// normalized symbol. A whole-batch failure is an `Err`; a symbol that is
/// simply unknown upstream is left out of the map.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_batch(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceQuote>, SourceError>;
}

/// Maps a non-success HTTP status to the matching source failure.
pub(crate) fn status_error(source_name: &str, status: StatusCode, body: &str) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return SourceError::rate_limited(source_name);
    }

    let body = body.trim();
    let snippet: String = body.chars().take(200).collect();
    SourceError::unavailable(source_name, format!("{status} {snippet}"))
}

pub(crate) fn transport_error(source_name: &str, e: reqwest::Error) -> SourceError {
    if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
        return SourceError::rate_limited(source_name);
    }
    SourceError::unavailable(source_name, e.to_string())
}
