//! Middleware stack for the HTTP client (retry, caching).

use std::time::Duration;

use moka::future::Cache;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

use crate::config::{Config, api};

/// Build the pooled HTTP client wrapped in transient-retry middleware.
pub(super) fn build_http_client(config: &Config) -> anyhow::Result<ClientWithMiddleware> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        "application/json".parse().expect("valid accept header"),
    );

    let client = Client::builder()
        .default_headers(headers)
        .user_agent(concat!("novelty-corpus/", env!("CARGO_PKG_VERSION")))
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(api::MAX_KEEPALIVE)
        .pool_idle_timeout(api::KEEPALIVE_EXPIRY)
        .gzip(true)
        .build()?;

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_secs(1), Duration::from_secs(30))
        .build_with_max_retries(3);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Build the response cache.
pub(super) fn build_cache(config: &Config) -> Cache<String, serde_json::Value> {
    Cache::builder()
        .max_capacity(config.cache_max_size)
        .time_to_live(config.cache_ttl)
        .build()
}

/// Cache key over method, URL and query parameters.
pub(super) fn cache_key(method: &str, url: &str, params: &[(String, String)]) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    hasher.update(method.as_bytes());
    hasher.update(b"|");
    hasher.update(url.as_bytes());
    hasher.update(b"|");

    for (k, v) in params {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_depends_on_params() {
        let a = cache_key("GET", "http://x/works", &[("search".into(), "water".into())]);
        let b = cache_key("GET", "http://x/works", &[("search".into(), "soil".into())]);
        let c = cache_key("GET", "http://x/works", &[("search".into(), "water".into())]);
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 32);
    }
}
