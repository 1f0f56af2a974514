//! OpenAlex API client.
//!
//! Provides async HTTP client with:
//! - Connection pooling via reqwest
//! - Retry middleware with exponential backoff
//! - Fixed delay between requests
//! - Response caching (nested expansion fetches the same works repeatedly)

mod middleware;

use std::time::Duration;

use moka::future::Cache;
use reqwest_middleware::ClientWithMiddleware;

use crate::config::{Config, SearchParams};
use crate::error::{ClientError, ClientResult};
use crate::models::{Work, WorkId, WorksPage};

/// OpenAlex API client.
#[derive(Clone)]
pub struct OpenAlexClient {
    /// HTTP client with middleware.
    client: ClientWithMiddleware,

    /// Response cache.
    cache: Cache<String, serde_json::Value>,

    /// API key (optional).
    api_key: Option<String>,

    /// Polite-pool contact (optional).
    mailto: Option<String>,

    /// Works endpoint.
    works_url: String,

    /// Delay before each uncached request.
    rate_limit_delay: Duration,
}

impl OpenAlexClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: middleware::build_http_client(config)?,
            cache: middleware::build_cache(config),
            api_key: config.api_key.clone(),
            mailto: config.mailto.clone(),
            works_url: config.works_url(),
            rate_limit_delay: config.rate_limit_delay,
        })
    }

    /// Check if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search works, returning a single page in response order.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn search_works(&self, search: &SearchParams) -> ClientResult<WorksPage> {
        let params = vec![
            ("search".to_string(), search.query.clone()),
            ("filter".to_string(), search.filter.clone()),
            ("per-page".to_string(), search.per_page.to_string()),
        ];

        self.get(&self.works_url, &params).await
    }

    /// Get a single work by id.
    ///
    /// # Errors
    ///
    /// Returns error on API failure.
    pub async fn get_work(&self, id: WorkId) -> ClientResult<Work> {
        let url = format!("{}/{}", self.works_url, id);
        self.get(&url, &[]).await
    }

    /// Make a GET request.
    async fn get<T>(&self, url: &str, params: &[(String, String)]) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut params = params.to_vec();
        if let Some(ref mailto) = self.mailto {
            params.push(("mailto".to_string(), mailto.clone()));
        }
        if let Some(ref key) = self.api_key {
            params.push(("api_key".to_string(), key.clone()));
        }

        // Check cache
        let cache_key = middleware::cache_key("GET", url, &params);
        if let Some(cached) = self.cache.get(&cache_key).await {
            return serde_json::from_value(cached).map_err(ClientError::from);
        }

        // Rate limit
        tokio::time::sleep(self.rate_limit_delay).await;

        tracing::debug!(url, "GET");
        let response = self.client.get(url).query(&params).send().await?;

        let response = Self::handle_response(response).await?;
        let value: serde_json::Value = response.json().await?;

        // Cache response
        self.cache.insert(cache_key, value.clone()).await;

        serde_json::from_value(value).map_err(ClientError::from)
    }

    /// Handle API response status codes.
    async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);

                Err(ClientError::rate_limited(retry_after))
            }
            404 => {
                let resource = response.url().path().to_string();
                Err(ClientError::not_found(resource))
            }
            400 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::bad_request(text))
            }
            500..=599 => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::server(status.as_u16(), text))
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(ClientError::UnexpectedStatus { status: status.as_u16(), message: text })
            }
        }
    }
}

impl std::fmt::Debug for OpenAlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAlexClient")
            .field("works_url", &self.works_url)
            .field("has_api_key", &self.has_api_key())
            .finish()
    }
}
