//! HTTP fetcher implementation
//!
//! This module handles all requests to the search endpoint, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Building search URLs for a task and page
//! - Classifying responses as pages, blocks or network failures

use crate::config::HttpConfig;
use crate::query::{build_search_url, SearchTask};
use crate::{ConfigError, CrawlError};
use async_trait::async_trait;
use reqwest::header::{COOKIE, LOCATION};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Failure of one fetch attempt
///
/// Both variants count as a blocked attempt for backoff and retry purposes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The endpoint explicitly refused or deflected the request
    #[error("Blocked{}: {reason}", status_suffix(.status))]
    Blocked { status: Option<u16>, reason: String },

    /// Transport failure or unexpected status
    #[error("Network error: {0}")]
    Network(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

/// Source of raw search result pages
///
/// The coordinator only depends on this trait, so tests can script page
/// sequences without a network.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetches one result page of a task
    ///
    /// # Arguments
    ///
    /// * `task` - The search task
    /// * `page` - 1-based page number
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Raw page body
    /// * `Err(FetchError)` - The attempt was blocked or failed
    async fn fetch_page(&self, task: &SearchTask, page: u32) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are not followed: the endpoint answers throttled or
/// unauthenticated sessions with a redirect to its login or visitor page,
/// which has to be seen to be classified as a block.
///
/// # Arguments
///
/// * `config` - The endpoint configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use weibo_search::config::HttpConfig;
/// use weibo_search::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`SearchClient`] backed by `reqwest`
pub struct HttpSearchClient {
    client: Client,
    base_url: Url,
    cookie: Option<String>,
}

impl HttpSearchClient {
    /// Creates a client for the configured endpoint
    pub fn new(config: &HttpConfig) -> Result<Self, CrawlError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ConfigError::Validation(format!("Invalid base-url '{}': {}", config.base_url, e))
        })?;

        Ok(Self {
            client: build_http_client(config)?,
            base_url,
            cookie: config.cookie.clone().filter(|c| !c.trim().is_empty()),
        })
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn fetch_page(&self, task: &SearchTask, page: u32) -> Result<String, FetchError> {
        let url = build_search_url(&self.base_url, task, page);
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url.as_str());
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.as_str());
        }

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            return Err(classify_redirect(status, &location));
        }

        if is_block_status(status) {
            return Err(FetchError::Blocked {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("request refused")
                    .to_string(),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Network(format!("unexpected HTTP {}", status.as_u16())));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("failed to read body: {}", e)))
    }
}

/// Statuses the endpoint uses to throttle or refuse a session
fn is_block_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 403 | 418 | 429)
}

/// Redirects to the login or visitor pages mean the session was deflected
fn classify_redirect(status: StatusCode, location: &str) -> FetchError {
    let lowered = location.to_ascii_lowercase();
    if ["login", "passport", "visitor"]
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        FetchError::Blocked {
            status: Some(status.as_u16()),
            reason: format!("redirected to {}", location),
        }
    } else {
        FetchError::Network(format!(
            "unexpected redirect (HTTP {}) to '{}'",
            status.as_u16(),
            location
        ))
    }
}

fn classify_transport_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Network("request timeout".to_string())
    } else if error.is_connect() {
        FetchError::Network(format!("connection failed: {}", error))
    } else {
        FetchError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_http_search_client_rejects_bad_url() {
        let config = HttpConfig {
            base_url: "not a url".to_string(),
            ..HttpConfig::default()
        };
        assert!(HttpSearchClient::new(&config).is_err());
    }

    #[test]
    fn test_block_statuses() {
        assert!(is_block_status(StatusCode::FORBIDDEN));
        assert!(is_block_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_block_status(StatusCode::from_u16(418).unwrap()));
        assert!(!is_block_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_block_status(StatusCode::OK));
    }

    #[test]
    fn test_classify_redirect() {
        let blocked = classify_redirect(
            StatusCode::FOUND,
            "https://passport.weibo.com/visitor/visitor?entry=miniblog",
        );
        assert!(matches!(blocked, FetchError::Blocked { status: Some(302), .. }));

        let other = classify_redirect(StatusCode::MOVED_PERMANENTLY, "https://s.weibo.com/other");
        assert!(matches!(other, FetchError::Network(_)));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Blocked {
            status: Some(429),
            reason: "Too Many Requests".to_string(),
        };
        assert_eq!(err.to_string(), "Blocked (HTTP 429): Too Many Requests");

        let err = FetchError::Blocked {
            status: None,
            reason: "unparseable page".to_string(),
        };
        assert_eq!(err.to_string(), "Blocked: unparseable page");
    }
}
