//! Activation-time generation rotation.

use futures_util::future::try_join_all;
use serde::Serialize;

use stalecache_core::{CacheStorage, Error, PolicyConfig};

/// Outcome of rotating generations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    pub current: String,
    pub deleted: Vec<String>,
}

/// Delete every generation whose name is not the current version tag.
pub async fn rotate<S: CacheStorage>(config: &PolicyConfig, storage: &S) -> Result<RotationReport, Error> {
    let stale: Vec<String> = storage.keys().await?.into_iter().filter(|name| *name != config.version).collect();

    try_join_all(stale.iter().map(|name| storage.delete(name))).await?;

    for name in &stale {
        tracing::info!(generation = %name, current = %config.version, "deleted stale cache generation");
    }

    Ok(RotationReport { current: config.version.clone(), deleted: stale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::policy;
    use stalecache_core::{CacheDb, MemoryStorage};

    #[tokio::test]
    async fn test_rotate_keeps_only_current() {
        let storage = CacheDb::open_in_memory().await.unwrap();
        for name in ["v6", "v7", "v8"] {
            storage.open(name).await.unwrap();
        }

        let report = rotate(&policy("v8"), &storage).await.unwrap();

        assert_eq!(report.deleted, vec!["v6".to_string(), "v7".to_string()]);
        assert_eq!(storage.keys().await.unwrap(), vec!["v8".to_string()]);
    }

    #[tokio::test]
    async fn test_rotate_without_current_generation() {
        let storage = MemoryStorage::new();
        storage.open("other-app-v1").await.unwrap();

        let report = rotate(&policy("v8"), &storage).await.unwrap();

        assert_eq!(report.deleted, vec!["other-app-v1".to_string()]);
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rotate_nothing_to_do() {
        let storage = MemoryStorage::new();
        storage.open("v8").await.unwrap();

        let report = rotate(&policy("v8"), &storage).await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.current, "v8");
    }
}
