//! HTTP client for fetching the school pages
//!
//! Provides a rate-limited HTTP client with respect for the school server
//! and typed fetch errors. The parsing core never sees a URL; everything
//! network-related stops here.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::config::FetchConfig;

/// Typed "bad response" signal raised by the fetch collaborator.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("bad response from {url}: status {status}")]
    Status { url: String, status: StatusCode },

    /// The request timed out.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Connection or body-read failure.
    #[error("transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Rate-limited HTTP client for the two school pages.
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Fetch a URL and return the body text, waiting out the rate limiter
    /// first.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::from_reqwest(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| FetchError::from_reqwest(url, source))?;

        debug!("Successfully fetched: {} ({} chars)", url, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_from_default_config() {
        assert!(HttpClient::new(&FetchConfig::default()).is_ok());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let config = FetchConfig {
            max_requests_per_second: 0,
            ..FetchConfig::default()
        };
        assert!(HttpClient::new(&config).is_err());
    }
}
