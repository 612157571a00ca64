//! MCP tool implementations.
//!
//! This module contains all tools exposed by the stalecache server.

pub mod cache;

#[cfg(test)]
pub(crate) mod testing;
