//! Remote quote feed.
//!
//! Candidates are fetched with a plain HTTP GET returning a JSON array. Each
//! element's title-like field becomes the quote text and the category is
//! fixed to the configured default.

use std::future::Future;

use serde_json::Value;

use crate::domain::{AppError, Quote, Result, SyncConfig};

/// Fields tried, in order, for the quote text of a remote item.
const TITLE_FIELDS: &[&str] = &["title", "text", "quote"];

/// Anything that can produce a batch of candidate quotes.
pub trait QuoteSource: Send + Sync {
    /// Fetch the current batch of candidates.
    ///
    /// Failures are reported as `AppError::Network`.
    fn pull(&self) -> impl Future<Output = Result<Vec<Quote>>> + Send;
}

/// HTTP implementation of [`QuoteSource`].
#[derive(Debug, Clone)]
pub struct HttpQuoteSource {
    client: reqwest::Client,
    url: String,
    default_category: String,
}

impl HttpQuoteSource {
    /// Build a source from the sync configuration.
    ///
    /// # Errors
    /// Returns a config error for a blank URL or category, or a network
    /// error if the HTTP client cannot be built.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        if config.source_url.trim().is_empty() {
            return Err(AppError::Config {
                message: "sync.source_url must not be empty".into(),
            });
        }
        if config.default_category.trim().is_empty() {
            return Err(AppError::Config {
                message: "sync.default_category must not be empty".into(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("quote-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(AppError::network)?;

        Ok(Self {
            client,
            url: config.source_url.clone(),
            default_category: config.default_category.clone(),
        })
    }

    /// The endpoint this source reads from.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl QuoteSource for HttpQuoteSource {
    async fn pull(&self) -> Result<Vec<Quote>> {
        tracing::debug!(url = %self.url, "Fetching remote quotes");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(AppError::network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::network_message(format!(
                "Server returned status {status}"
            )));
        }

        let body: Value = response.json().await.map_err(AppError::network)?;
        map_remote_items(&body, &self.default_category)
    }
}

/// Map a remote JSON body onto candidate quotes.
///
/// Elements whose title is blank are dropped, mirroring local validation.
///
/// # Errors
/// Returns a network error when the body is not an array or an element has
/// no title-like string field.
pub fn map_remote_items(body: &Value, category: &str) -> Result<Vec<Quote>> {
    let items = body
        .as_array()
        .ok_or_else(|| AppError::network_message("Malformed response: expected a JSON array"))?;

    let mut quotes = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let title = TITLE_FIELDS
            .iter()
            .find_map(|field| item.get(field).and_then(Value::as_str))
            .ok_or_else(|| {
                AppError::network_message(format!(
                    "Malformed response: item {index} has no title field"
                ))
            })?;

        if title.trim().is_empty() {
            tracing::debug!(index, "Skipping remote item with blank title");
            continue;
        }

        quotes.push(Quote::new(title, category));
    }

    Ok(quotes)
}
