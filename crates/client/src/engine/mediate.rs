//! Per-request mediation: pass through, or stale-while-revalidate.
//!
//! For an eligible request the network fetch always runs on a detached task.
//! A cache hit is returned without waiting for it; a miss waits for it and
//! hands its outcome, success or failure, straight back. Whenever the fetch
//! yields a cacheable response a copy is written to the current generation
//! on yet another detached task.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use stalecache_core::{CacheGeneration, CacheRequest, CacheStorage, Error, PolicyConfig, ResponseSnapshot};

use crate::fetch::Network;

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    /// Not a GET.
    Method,
    /// Hostname matched the exclusion set.
    ExcludedHost,
    /// The engine is not active yet.
    Inactive,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    PassThrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::PassThrough => "pass_through",
        }
    }
}

/// The engine's decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mediation {
    /// Do not intercept; the host sends the request as if no cache existed.
    PassThrough(PassReason),
    /// Respond with this snapshot.
    Respond { response: ResponseSnapshot, source: ResponseSource },
}

/// Decide how to answer a request.
///
/// # Errors
///
/// Only on a cache miss: the network failure is returned unchanged.
pub async fn mediate<S, N>(
    request: CacheRequest, config: &PolicyConfig, storage: &S, network: &Arc<N>,
) -> Result<Mediation, Error>
where
    S: CacheStorage,
    N: Network + ?Sized,
{
    if !request.is_get() {
        tracing::trace!(method = %request.method, url = %request.url, "passing through non-GET request");
        return Ok(Mediation::PassThrough(PassReason::Method));
    }

    if request.hostname().is_some_and(|host| config.is_excluded(host)) {
        tracing::trace!(url = %request.url, "passing through excluded host");
        return Ok(Mediation::PassThrough(PassReason::ExcludedHost));
    }

    let generation = match storage.open(&config.version).await {
        Ok(generation) => Some(generation),
        Err(e) => {
            tracing::warn!(generation = %config.version, error = %e, "cache generation unavailable");
            None
        }
    };

    let cached = match &generation {
        Some(generation) => generation.match_request(&request).await.unwrap_or_else(|e| {
            tracing::warn!(url = %request.url, error = %e, "cache lookup failed; treating as miss");
            None
        }),
        None => None,
    };

    let url = request.url.clone();
    let refresh = spawn_refresh(request, generation, Arc::clone(network));

    match cached {
        Some(response) => {
            tracing::debug!(url = %url, "serving from cache");
            Ok(Mediation::Respond { response, source: ResponseSource::Cache })
        }
        None => {
            let response = refresh.await.map_err(|e| Error::TaskFailed(e.to_string()))??;
            tracing::debug!(url = %url, status = response.status, "serving from network");
            Ok(Mediation::Respond { response, source: ResponseSource::Network })
        }
    }
}

/// Launch the network fetch for a request.
///
/// Dropping the handle detaches the task; its failure then goes nowhere
/// but a debug trace.
fn spawn_refresh<G, N>(
    request: CacheRequest, generation: Option<G>, network: Arc<N>,
) -> JoinHandle<Result<ResponseSnapshot, Error>>
where
    G: CacheGeneration,
    N: Network + ?Sized,
{
    tokio::spawn(async move {
        let response = match network.fetch(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network fetch failed");
                return Err(e);
            }
        };

        match generation {
            Some(generation) if response.is_cacheable() => {
                spawn_store(generation, request, response.clone());
            }
            _ => {
                tracing::trace!(
                    url = %request.url,
                    status = response.status,
                    response_type = %response.response_type,
                    "response not cached"
                );
            }
        }

        Ok(response)
    })
}

fn spawn_store<G: CacheGeneration>(generation: G, request: CacheRequest, snapshot: ResponseSnapshot) {
    tokio::spawn(async move {
        match generation.put(&request, &snapshot).await {
            Ok(()) => tracing::trace!(generation = %generation.name(), url = %request.url, "cache entry refreshed"),
            Err(e) => {
                tracing::debug!(generation = %generation.name(), url = %request.url, error = %e, "cache write failed")
            }
        }
    });
}
