//! Cache-related MCP tools.
//!
//! This module provides tools for driving the policy engine and inspecting
//! the current cache generation.

pub mod fetch;
pub mod get;
pub mod status;

pub use fetch::{CacheFetchParams, fetch_impl};
pub use get::{CacheGetParams, get_impl};
pub use status::status_impl;

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stalecache_core::{ResponseSnapshot, ResponseType};

/// A response snapshot rendered for tool output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseView {
    /// URL the response was served from.
    pub url: String,
    /// HTTP status code (0 for opaque responses).
    pub status: u16,
    pub status_text: String,
    /// Delivery type: basic, cors, opaque, ...
    pub response_type: ResponseType,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Body length in bytes.
    pub body_bytes: usize,
    /// ISO8601 timestamp of when the response was fetched.
    pub fetched_at: String,
}

impl From<ResponseSnapshot> for ResponseView {
    fn from(snapshot: ResponseSnapshot) -> Self {
        Self {
            body: String::from_utf8_lossy(&snapshot.body).into_owned(),
            body_bytes: snapshot.body.len(),
            url: snapshot.url,
            status: snapshot.status,
            status_text: snapshot.status_text,
            response_type: snapshot.response_type,
            headers: snapshot.headers,
            fetched_at: snapshot.fetched_at,
        }
    }
}
