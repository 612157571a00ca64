//! cache_fetch tool implementation.
//!
//! Sends a request through the policy engine: stale-while-revalidate for
//! eligible GETs, a plain network fetch for everything else.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stalecache_client::{Network, PolicyEngine, canonicalize};
use stalecache_core::{CacheRequest, CacheStorage, RequestMode};

use super::ResponseView;
use crate::error::ToolError;

/// Parameters for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request mode: navigate, same-origin, no-cors or cors (default).
    #[serde(default)]
    pub mode: RequestMode,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    /// Where the response came from: cache, network or pass_through.
    pub source: String,
    /// The response delivered to the caller.
    pub response: ResponseView,
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl<S, N>(engine: &PolicyEngine<S, N>, params: CacheFetchParams) -> Result<CallToolResult, McpError>
where
    S: CacheStorage,
    N: Network + ?Sized,
{
    let url = canonicalize(&params.url, &engine.config().origin).map_err(ToolError::from)?;
    let mut request = CacheRequest::new(&params.method, url).with_mode(params.mode);
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }

    let served = engine.respond(request).await?;
    tracing::debug!(url = %params.url, source = served.source.as_str(), "cache_fetch served");

    let output = CacheFetchOutput { source: served.source.as_str().to_string(), response: served.response.into() };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
