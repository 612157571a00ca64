//! Core types and shared functionality for stalecache.
//!
//! This crate provides:
//! - Cache generation storage (SQLite and in-memory backends)
//! - Request/response snapshot types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{
    CacheDb, CacheGeneration, CacheRequest, CacheStorage, MemoryStorage, RequestMode, ResponseSnapshot, ResponseType,
};
pub use config::{AppConfig, ConfigError, PolicyConfig};
pub use error::Error;
