//! Install-time provisioning of the asset manifest.
//!
//! Every manifest entry is fetched concurrently and stored independently.
//! One failed entry never takes its siblings or the install step down with
//! it: failures are logged and listed in the report.

use futures_util::future::join_all;
use serde::Serialize;

use stalecache_core::{CacheGeneration, CacheRequest, CacheStorage, Error, PolicyConfig};

use crate::fetch::Network;

/// A manifest entry that could not be provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of provisioning one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub generation: String,
    /// Stored URLs, in manifest order.
    pub stored: Vec<String>,
    /// Failed entries, in manifest order.
    pub failed: Vec<ProvisionFailure>,
}

impl ProvisionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Open the current generation and fill it with the manifest assets.
///
/// Never fails: an unopenable generation marks every entry as failed.
pub async fn provision<S, N>(config: &PolicyConfig, storage: &S, network: &N) -> ProvisionReport
where
    S: CacheStorage,
    N: Network + ?Sized,
{
    let mut report = ProvisionReport { generation: config.version.clone(), ..Default::default() };

    let generation = match storage.open(&config.version).await {
        Ok(generation) => generation,
        Err(e) => {
            tracing::error!(generation = %config.version, error = %e, "failed to open cache generation");
            report.failed = config
                .manifest
                .iter()
                .map(|entry| ProvisionFailure { url: entry.clone(), reason: e.to_string() })
                .collect();
            return report;
        }
    };

    let attempts = config.manifest.iter().map(|entry| provision_one(config, &generation, network, entry));
    let outcomes = join_all(attempts).await;

    for (entry, outcome) in config.manifest.iter().zip(outcomes) {
        match outcome {
            Ok(url) => report.stored.push(url),
            Err(e) => {
                tracing::warn!(generation = %config.version, url = %entry, error = %e, "failed to provision asset");
                report.failed.push(ProvisionFailure { url: entry.clone(), reason: e.to_string() });
            }
        }
    }

    tracing::info!(
        generation = %config.version,
        stored = report.stored.len(),
        failed = report.failed.len(),
        "provisioned cache generation"
    );

    report
}

async fn provision_one<G, N>(config: &PolicyConfig, generation: &G, network: &N, entry: &str) -> Result<String, Error>
where
    G: CacheGeneration,
    N: Network + ?Sized,
{
    let request = CacheRequest::get(config.resolve(entry)?);
    let response = network.fetch(&request).await?;
    if !response.is_ok() {
        return Err(Error::Network(format!("unexpected status {} for {}", response.status, request.url)));
    }
    generation.put(&request, &response).await?;
    Ok(request.url.to_string())
}
