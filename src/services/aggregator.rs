use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::SourceError,
    models::{PriceQuote, quote::normalize_symbol},
};

use super::quote_source::{QuoteSource, status_error, transport_error};

pub const SOURCE_NAME: &str = "aggregator";

/// Multi-symbol price aggregator (CryptoCompare `pricemulti` shape).
/// One HTTP request prices the whole batch.
#[derive(Clone)]
pub struct AggregatorClient {
    http: Client,
    base_url: String,
    api_key: String,
    currency: String,
}

impl AggregatorClient {
    pub fn new(base_url: String, api_key: String, currency: String) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            currency,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

// The upstream answers errors with HTTP 200 and a `Response: "Error"` body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceMultiResponse {
    Error {
        #[serde(rename = "Response")]
        response: String,
        #[serde(rename = "Message", default)]
        message: String,
    },
    Prices(HashMap<String, HashMap<String, f64>>),
}

#[async_trait]
impl QuoteSource for AggregatorClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_batch(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, PriceQuote>, SourceError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!("{}/pricemulti", self.base_url);
        let fsyms = symbols.join(",");

        let mut req = self
            .http
            .get(&url)
            .query(&[("fsyms", fsyms.as_str()), ("tsyms", self.currency.as_str())]);
        if self.has_key() {
            req = req.header("authorization", format!("Apikey {}", self.api_key));
        }

        let res = req.send().await.map_err(|e| transport_error(SOURCE_NAME, e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(status_error(SOURCE_NAME, status, &body));
        }

        let body = res
            .json::<PriceMultiResponse>()
            .await
            .map_err(|e| transport_error(SOURCE_NAME, e))?;

        parse_prices(body, &self.currency, Utc::now().timestamp())
    }
}

fn parse_prices(
    body: PriceMultiResponse,
    currency: &str,
    as_of: i64,
) -> Result<HashMap<String, PriceQuote>, SourceError> {
    match body {
        PriceMultiResponse::Error { response, message } => {
            if message.to_lowercase().contains("rate limit") {
                Err(SourceError::rate_limited(SOURCE_NAME))
            } else {
                Err(SourceError::unavailable(
                    SOURCE_NAME,
                    format!("{response}: {message}"),
                ))
            }
        }
        PriceMultiResponse::Prices(map) => Ok(map
            .into_iter()
            .filter_map(|(sym, per_currency)| {
                let price = per_currency.get(currency).copied()?;
                let quote = PriceQuote::new(&sym, price, as_of, SOURCE_NAME);
                Some((normalize_symbol(&sym), quote))
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(raw: &str) -> PriceMultiResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn prices_are_keyed_by_upper_symbol() {
        let body = decode(r#"{"BTC":{"USD":50001.5},"eth":{"USD":2900.0},"XRP":{"EUR":0.5}}"#);
        let quotes = parse_prices(body, "USD", 100).unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["BTC"].price, 50001.5);
        assert_eq!(quotes["ETH"].symbol, "ETH");
        assert_eq!(quotes["ETH"].source, SOURCE_NAME);
    }

    #[test]
    fn error_body_with_rate_limit_message_is_rate_limited() {
        let body = decode(r#"{"Response":"Error","Message":"You are over your rate limit please upgrade"}"#);
        let err = parse_prices(body, "USD", 0).unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[test]
    fn other_error_bodies_are_unavailable() {
        let body = decode(r#"{"Response":"Error","Message":"fsyms param is empty"}"#);
        let err = parse_prices(body, "USD", 0).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}
