//! Request and response types stored in a cache generation.
//!
//! A [`ResponseSnapshot`] owns its body as [`Bytes`], so every clone handed to
//! the store is a distinct value from the one returned to the caller.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// Methods the fetch layer normalises to upper case.
const NORMALIZED_METHODS: &[&str] = &["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

/// How a request was issued relative to the application origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// An outgoing request as seen by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    pub method: String,
    pub url: Url,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    pub mode: RequestMode,
}

impl CacheRequest {
    /// Build a request, normalising well-known method names and dropping the fragment.
    pub fn new(method: impl AsRef<str>, mut url: Url) -> Self {
        let method = method.as_ref();
        let method = NORMALIZED_METHODS
            .iter()
            .find(|m| m.eq_ignore_ascii_case(method))
            .map(|m| m.to_string())
            .unwrap_or_else(|| method.to_string());
        url.set_fragment(None);
        Self { method, url, headers: BTreeMap::new(), mode: RequestMode::default() }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn hostname(&self) -> Option<&str> {
        self.url.host_str()
    }
}

/// Delivery type of a response, mirroring the fetch layer's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Basic,
    Cors,
    Default,
    Error,
    Opaque,
    OpaqueRedirect,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Default => "default",
            ResponseType::Error => "error",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
        }
    }

    /// Same-origin and readable cross-origin deliveries are the only cacheable ones.
    pub fn is_cacheable(&self) -> bool {
        matches!(self, ResponseType::Basic | ResponseType::Cors)
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "default" => Ok(ResponseType::Default),
            "error" => Ok(ResponseType::Error),
            "opaque" => Ok(ResponseType::Opaque),
            "opaqueredirect" => Ok(ResponseType::OpaqueRedirect),
            other => Err(Error::CorruptEntry(format!("unknown response type: {other}"))),
        }
    }
}

/// An immutable capture of a response: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// URL the response was ultimately served from.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    /// Header names are stored lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    /// RFC 3339 timestamp of when the response arrived.
    pub fetched_at: String,
}

impl ResponseSnapshot {
    /// Status in the 200-299 range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only a plain 200 with a readable delivery type goes into a generation.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type.is_cacheable()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Lower-cased field names listed in the `Vary` header.
    pub fn vary_fields(&self) -> Vec<String> {
        self.header("vary")
            .map(|v| {
                v.split(',')
                    .map(|f| f.trim().to_ascii_lowercase())
                    .filter(|f| !f.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Request header values a stored response varies on.
///
/// Captured at put time; a later lookup only matches when every listed
/// header carries the same value (or is absent on both sides).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaryKey {
    headers: BTreeMap<String, Option<String>>,
}

impl VaryKey {
    /// Capture the vary key for a request/response pair about to be stored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for `Vary: *`, which can never match.
    pub fn capture(request: &CacheRequest, response: &ResponseSnapshot) -> Result<Self, Error> {
        let mut headers = BTreeMap::new();
        for field in response.vary_fields() {
            if field == "*" {
                return Err(Error::InvalidInput(format!("{}: Vary: * cannot be stored", request.url)));
            }
            let value = request.header(&field).map(str::to_string);
            headers.insert(field, value);
        }
        Ok(Self { headers })
    }

    pub fn matches(&self, request: &CacheRequest) -> bool {
        self.headers.iter().all(|(name, stored)| request.header(name) == stored.as_deref())
    }
}

/// Reject requests a generation cannot hold.
pub(crate) fn ensure_storable(request: &CacheRequest) -> Result<(), Error> {
    if !request.is_get() {
        return Err(Error::InvalidInput(format!("cannot store {} {}", request.method, request.url)));
    }
    Ok(())
}
