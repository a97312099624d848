//! Network access for the worker.
//!
//! ### Network Seam
//! - The worker only talks to the network through the [`Network`] trait so
//!   hosts and tests can supply their own transport.
//!
//! ### Response Typing
//! - A response whose final URL shares the worker's origin is `basic`.
//! - Anything else is `cors`, and is never written to the cache.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Request timeout comes from the host configuration; the worker adds none.

pub mod url;

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use swcache_core::{AppConfig, Error, Headers, Request, Response, ResponseType};

pub use self::url::{UrlError, has_scheme, is_same_origin, resolve};

/// A single-attempt network transport.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request once. Non-2xx statuses are responses, not errors;
    /// `Err` means the request never produced a response.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Origin used to classify responses as `basic`
    pub origin: ::url::Url,
}

impl FetchConfig {
    /// Build from application configuration.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            origin,
        })
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, final_url: &::url::Url) -> ResponseType {
        if is_same_origin(final_url, &self.config.origin) { ResponseType::Basic } else { ResponseType::Cors }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {}", request.method(), e)))?;

        let mut builder = self.http.request(method, request.url().clone());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url(), e)))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::Network(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::Network(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let kind = self.classify(&final_url);

        tracing::debug!(
            "fetched {} {} -> {} {} in {}ms ({} bytes)",
            request.method(),
            request.url(),
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response::from_parts(
            status.as_u16(),
            status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            kind,
            Some(final_url),
            bytes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FetchConfig {
        FetchConfig::from_app(&AppConfig { origin: "https://example.com".into(), ..Default::default() }).unwrap()
    }

    #[test]
    fn test_fetch_config_from_app() {
        let config = config();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.origin.as_str(), "https://example.com/");
    }

    #[test]
    fn test_classify_by_origin() {
        let client = FetchClient::new(config()).unwrap();
        let same = ::url::Url::parse("https://example.com/app.js").unwrap();
        let other = ::url::Url::parse("https://cdn.example.org/lib.js").unwrap();
        assert_eq!(client.classify(&same), ResponseType::Basic);
        assert_eq!(client.classify(&other), ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(config());
        assert!(client.is_ok());
    }
}
