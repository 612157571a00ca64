//! Structured errors for the stalecache server.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use stalecache_client::UrlError;

/// Errors raised by tool plumbing rather than by the cache engine.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The requested URL could not be canonicalized.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] UrlError),

    /// Tool output could not be serialized.
    #[error("INTERNAL: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::InvalidUrl(_) => -32003,
            ToolError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
