//! cache_status tool implementation.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stalecache_client::{Network, PolicyEngine};
use stalecache_core::{CacheGeneration, CacheStorage};

use crate::error::ToolError;

/// Output from the cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    /// Lifecycle state of the engine.
    pub state: String,
    /// Version tag of the current generation.
    pub version: String,
    /// Every generation present in the store.
    pub generations: Vec<String>,
    /// URLs stored in the current generation.
    pub entries: Vec<String>,
}

/// Implementation of the cache_status tool.
pub async fn status_impl<S, N>(engine: &PolicyEngine<S, N>) -> Result<CallToolResult, McpError>
where
    S: CacheStorage,
    N: Network + ?Sized,
{
    let version = engine.config().version.clone();
    let generations = engine.storage().keys().await?;
    let entries = if generations.contains(&version) {
        engine.storage().open(&version).await?.keys().await?
    } else {
        Vec::new()
    };

    let output = CacheStatusOutput { state: engine.state().to_string(), version, generations, entries };
    let json = serde_json::to_string_pretty(&output).map_err(ToolError::from)?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{StubNetwork, active_engine, output_json};

    #[tokio::test]
    async fn test_status_after_start() {
        let engine = active_engine(StubNetwork::new().ok("https://app.example.com/", "shell")).await;

        let result = status_impl(&engine).await.unwrap();
        let output: CacheStatusOutput = output_json(&result);

        assert_eq!(output.state, "activated");
        assert_eq!(output.version, "v1");
        assert_eq!(output.generations, vec!["v1".to_string()]);
        assert_eq!(output.entries, vec!["https://app.example.com/".to_string()]);
    }
}
