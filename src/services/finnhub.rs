use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{error::SourceError, models::PriceQuote};

use super::quote_source::{QuoteSource, status_error, transport_error};

pub const SOURCE_NAME: &str = "finnhub";

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<QuoteResponse, SourceError> {
        if !self.has_key() {
            return Err(SourceError::unavailable(
                SOURCE_NAME,
                "FINNHUB_API_KEY is missing in .env",
            ));
        }

        let url = "https://finnhub.io/api/v1/quote";
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(status_error(SOURCE_NAME, status, &body));
        }

        res.json::<QuoteResponse>()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))
    }
}

/// Finnhub has no multi-symbol quote endpoint, so one batch is a set of
/// concurrent single-symbol requests. The batch fails only if every symbol
/// failed.
#[async_trait]
impl QuoteSource for FinnhubClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_batch(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceQuote>, SourceError> {
        if !self.has_key() {
            return Err(SourceError::unavailable(
                SOURCE_NAME,
                "FINNHUB_API_KEY is missing in .env",
            ));
        }

        let results = join_all(symbols.iter().map(|sym| async move {
            (sym.clone(), self.quote(sym).await)
        }))
        .await;

        let mut quotes = HashMap::new();
        let mut last_err = None;
        let mut rate_limited = false;

        for (sym, res) in results {
            match res {
                Ok(q) => {
                    quotes.insert(sym.clone(), PriceQuote::new(&sym, q.c, q.t, SOURCE_NAME));
                }
                Err(e) => {
                    tracing::debug!(symbol = %sym, error = %e, "finnhub quote failed");
                    rate_limited |= e.is_rate_limited();
                    last_err = Some(e);
                }
            }
        }

        if quotes.is_empty() {
            if rate_limited {
                return Err(SourceError::rate_limited(SOURCE_NAME));
            }
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        Ok(quotes)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // change
    #[serde(default)]
    pub d: Option<f64>,
    // percent change
    #[serde(default)]
    pub dp: Option<f64>,
    // high
    #[serde(default)]
    pub h: f64,
    // low
    #[serde(default)]
    pub l: f64,
    // open
    #[serde(default)]
    pub o: f64,
    // previous close
    #[serde(default)]
    pub pc: f64,
    // timestamp
    #[serde(default)]
    pub t: i64,
}
