//! The cache policy engine.
//!
//! Three lifecycle handlers, each usable on its own:
//!
//! - [`provision`]: install-time fetch of the asset manifest into the current generation
//! - [`rotate`]: activation-time deletion of every other generation
//! - [`mediate`]: per-request pass-through or stale-while-revalidate
//!
//! [`PolicyEngine`] strings them together behind the lifecycle
//! `Installing → Installed → Activating → Activated`. Waiting between
//! install and activation is always skipped, and activation claims every
//! request immediately.

pub mod mediate;
pub mod provision;
pub mod rotate;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use stalecache_core::{CacheRequest, CacheStorage, Error, PolicyConfig, ResponseSnapshot};

use crate::fetch::Network;

pub use mediate::{Mediation, PassReason, ResponseSource, mediate};
pub use provision::{ProvisionFailure, ProvisionReport, provision};
pub use rotate::{RotationReport, rotate};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Activation failed; the engine never intercepts.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Reports from a full install + activate pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Startup {
    pub provision: ProvisionReport,
    pub rotation: RotationReport,
}

/// A response handed back to the host, with its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: ResponseSnapshot,
    pub source: ResponseSource,
}

/// Cache policy engine bound to one policy version.
pub struct PolicyEngine<S, N: ?Sized> {
    config: PolicyConfig,
    storage: S,
    network: Arc<N>,
    state: watch::Sender<LifecycleState>,
}

impl<S, N> PolicyEngine<S, N>
where
    S: CacheStorage,
    N: Network + ?Sized,
{
    pub fn new(config: PolicyConfig, storage: S, network: Arc<N>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Parsed);
        Self { config, storage, network, state }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn network(&self) -> &Arc<N> {
        &self.network
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(version = %self.config.version, from = %previous, to = %next, "lifecycle transition");
    }

    /// Install: provision the manifest, then skip waiting.
    ///
    /// Per-asset failures are in the report, not the error.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` unless the engine is still `Parsed`;
    /// installation runs once per engine.
    pub async fn install(&self) -> Result<ProvisionReport, Error> {
        let current = self.state();
        if current != LifecycleState::Parsed {
            return Err(Error::InvalidInput(format!("cannot install from state {current}")));
        }

        self.transition(LifecycleState::Installing);
        let report = provision(&self.config, &self.storage, self.network.as_ref()).await;
        self.transition(LifecycleState::Installed);
        tracing::info!(version = %self.config.version, "installed; skipping wait for activation");
        Ok(report)
    }

    /// Activate: rotate out stale generations, then claim all requests.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when called before `install`, or the
    /// store error if rotation fails (the engine is then redundant).
    pub async fn activate(&self) -> Result<RotationReport, Error> {
        let current = self.state();
        if !matches!(current, LifecycleState::Installed | LifecycleState::Activated) {
            return Err(Error::InvalidInput(format!("cannot activate from state {current}")));
        }

        self.transition(LifecycleState::Activating);
        match rotate(&self.config, &self.storage).await {
            Ok(report) => {
                self.transition(LifecycleState::Activated);
                tracing::info!(version = %self.config.version, deleted = report.deleted.len(), "activated; claiming clients");
                Ok(report)
            }
            Err(e) => {
                tracing::error!(version = %self.config.version, error = %e, "activation failed");
                self.transition(LifecycleState::Redundant);
                Err(e)
            }
        }
    }

    /// Install then activate.
    pub async fn start(&self) -> Result<Startup, Error> {
        let provision = self.install().await?;
        let rotation = self.activate().await?;
        Ok(Startup { provision, rotation })
    }

    /// Mediate an observed request. Until activation every request passes through.
    pub async fn handle(&self, request: CacheRequest) -> Result<Mediation, Error> {
        if self.state() != LifecycleState::Activated {
            return Ok(Mediation::PassThrough(PassReason::Inactive));
        }
        mediate(request, &self.config, &self.storage, &self.network).await
    }

    /// Answer a request the way the host would: mediated, or sent straight
    /// to the network when the engine passes it through.
    pub async fn respond(&self, request: CacheRequest) -> Result<Served, Error> {
        match self.handle(request.clone()).await? {
            Mediation::Respond { response, source } => Ok(Served { response, source }),
            Mediation::PassThrough(reason) => {
                tracing::trace!(url = %request.url, ?reason, "not intercepted");
                let response = self.network.fetch(&request).await?;
                Ok(Served { response, source: ResponseSource::PassThrough })
            }
        }
    }
}
