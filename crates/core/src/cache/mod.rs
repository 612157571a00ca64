//! Versioned cache generations.
//!
//! A generation is a named key-value store from request identity to a
//! response snapshot. This module provides:
//!
//! - Request/response types and vary matching
//! - The `CacheStorage`/`CacheGeneration` traits
//! - A SQLite backend with WAL mode and schema migrations
//! - An in-memory backend

pub mod connection;
pub mod entry;
pub mod generations;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{CacheRequest, RequestMode, ResponseSnapshot, ResponseType, VaryKey};
pub use generations::SqliteGeneration;
pub use memory::{MemoryGeneration, MemoryStorage};
pub use store::{CacheGeneration, CacheStorage};
