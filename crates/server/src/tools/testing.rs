//! Test fixtures shared by the tool tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use stalecache_client::{Network, PolicyEngine};
use stalecache_core::{CacheRequest, Error, MemoryStorage, PolicyConfig, ResponseSnapshot, ResponseType};
use url::Url;

/// Network answering fixed bodies per URL; anything else fails as offline.
#[derive(Default)]
pub(crate) struct StubNetwork {
    bodies: HashMap<String, &'static str>,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn ok(mut self, url: &str, body: &'static str) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &CacheRequest) -> Result<ResponseSnapshot, Error> {
        let body = self
            .bodies
            .get(request.url.as_str())
            .copied()
            .ok_or_else(|| Error::Network(format!("offline: {}", request.url)))?;
        Ok(ResponseSnapshot {
            url: request.url.to_string(),
            status: 200,
            status_text: "OK".into(),
            response_type: ResponseType::Basic,
            headers: BTreeMap::new(),
            body: Bytes::from_static(body.as_bytes()),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// An engine for `https://app.example.com` at version `v1` with `/` in the
/// manifest, already installed and activated.
pub(crate) async fn active_engine(network: StubNetwork) -> PolicyEngine<MemoryStorage, StubNetwork> {
    let config = PolicyConfig::new("v1", Url::parse("https://app.example.com").unwrap()).with_manifest(["/"]);
    let engine = PolicyEngine::new(config, MemoryStorage::new(), Arc::new(network));
    engine.start().await.unwrap();
    engine
}

pub(crate) fn output_json<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
