//! Network access for the policy engine.
//!
//! ### Network trait
//! - `Network::fetch` issues one request and yields a full response snapshot
//!   or a failure. Non-2xx statuses are responses, not failures.
//!
//! ### Response classification
//! - `basic` when the final URL shares the application origin
//! - `opaque` for a cross-origin `no-cors` request (status 0, nothing readable)
//! - `cors` otherwise

pub mod url;

use bytes::Bytes;
use reqwest::{Client, Method, header};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize};

use stalecache_core::{AppConfig, CacheRequest, Error, RequestMode, ResponseSnapshot, ResponseType};

/// Anything that can turn a request into a response.
#[async_trait::async_trait]
pub trait Network: Send + Sync + 'static {
    /// Issue the request and wait for the complete response.
    async fn fetch(&self, request: &CacheRequest) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stalecache/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Application origin used to classify responses (default: http://localhost:8080)
    pub origin: ::url::Url,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stalecache/0.1".to_string(),
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
            origin: ::url::Url::parse("http://localhost:8080").expect("static origin parses"),
        }
    }
}

impl FetchConfig {
    /// Derive the fetch settings from a loaded application config.
    ///
    /// Falls back to the default origin if the configured one does not parse;
    /// `AppConfig::validate` rejects that case before it gets here.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            origin: ::url::Url::parse(&config.origin).unwrap_or(defaults.origin),
        }
    }
}

/// reqwest-backed [`Network`].
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
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Classify a response by where it came from and how it was requested.
    pub fn classify(&self, request: &CacheRequest, final_url: &::url::Url) -> ResponseType {
        if final_url.origin() == self.config.origin.origin() {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

fn collect_headers(headers: &header::HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &CacheRequest) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        let final_url = response.url().clone();
        let response_type = self.classify(request, &final_url);
        let headers = collect_headers(response.headers());
        let body = response.bytes().await.map_err(transport_error)?;

        let fetch_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            response_type = %response_type,
            bytes = body.len(),
            fetch_ms,
            "fetched"
        );

        let fetched_at = chrono::Utc::now().to_rfc3339();
        if response_type == ResponseType::Opaque {
            return Ok(ResponseSnapshot {
                url: String::new(),
                status: 0,
                status_text: String::new(),
                response_type,
                headers: BTreeMap::new(),
                body: Bytes::new(),
                fetched_at,
            });
        }

        Ok(ResponseSnapshot {
            url: final_url.to_string(),
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            response_type,
            headers,
            body,
            fetched_at,
        })
    }
}
