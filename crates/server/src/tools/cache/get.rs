//! cache_get tool implementation.
//!
//! Reads an entry from the current cache generation without touching the
//! network.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stalecache_client::{Network, PolicyEngine, canonicalize};
use stalecache_core::{CacheGeneration, CacheRequest, CacheStorage, Error};

use super::ResponseView;
use crate::error::ToolError;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// Request headers, consulted when the stored response has a Vary header.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    /// Generation the entry was found in.
    pub generation: String,
    /// The stored response.
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<S, N>(engine: &PolicyEngine<S, N>, params: CacheGetParams) -> Result<CallToolResult, McpError>
where
    S: CacheStorage,
    N: Network + ?Sized,
{
    let url = canonicalize(&params.url, &engine.config().origin).map_err(ToolError::from)?;
    let mut request = CacheRequest::get(url);
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }

    let generation = engine.storage().open(&engine.config().version).await?;
    let snapshot = generation
        .match_request(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    let output = CacheGetOutput { generation: generation.name().to_string(), response: snapshot.into() };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, active_engine, output_json};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let engine = active_engine(StubNetwork::new().ok("https://app.example.com/", "shell")).await;
        let params = CacheGetParams { url: "/nonexistent".to_string(), headers: BTreeMap::new() };

        let err = get_impl(&engine, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let engine = active_engine(StubNetwork::new().ok("https://app.example.com/", "shell")).await;
        let params = CacheGetParams { url: "https://app.example.com/".to_string(), headers: BTreeMap::new() };

        let result = get_impl(&engine, params).await.unwrap();
        let output: CacheGetOutput = output_json(&result);

        assert_eq!(output.generation, "v1");
        assert_eq!(output.response.body, "shell");
        assert_eq!(output.response.body_bytes, 5);
    }
}
