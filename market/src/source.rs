//! External quote-source boundary.
//!
//! The engine never talks to a broker directly; it is handed anything
//! implementing [`QuoteSource`] (HTTP client, reverse proxy, mock
//! generator). Failures are typed so the poll loop can skip a cycle
//! and retry on the next tick instead of crashing.

use async_trait::async_trait;

use crate::types::{Credentials, RawQuote};

/// Errors the quote source may surface per fetch.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("network error talking to quote feed: {0}")]
    Network(String),

    #[error("quote feed rejected credentials: {0}")]
    Auth(String),

    #[error("quote feed returned a malformed payload: {0}")]
    MalformedPayload(String),
}

/// Abstraction over the upstream brokerage quote feed.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch point-in-time snapshots for a list of instruments.
    async fn fetch_quotes(
        &self,
        security_ids: &[String],
        credentials: &Credentials,
    ) -> Result<Vec<RawQuote>, SourceError>;

    /// Derive the near-the-money strike ladder for the nearest weekly
    /// expiry, given the current index price.
    async fn fetch_option_symbols(&self, index_price: f64) -> Result<Vec<String>, SourceError>;
}
