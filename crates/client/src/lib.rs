//! Client code for stalecache.
//!
//! This crate provides the network layer and the cache policy engine that
//! decides, per request, between pass-through and stale-while-revalidate.

pub mod engine;
pub mod fetch;

pub use engine::{
    LifecycleState, Mediation, PassReason, PolicyEngine, ProvisionFailure, ProvisionReport, ResponseSource,
    RotationReport, Served, Startup, mediate, provision, rotate,
};

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, canonicalize};
