//! In-Memory Secure Storage
//!
//! Fallback store for headless environments (CI, integration tests, servers
//! without a secret service). Secrets live only for the lifetime of the
//! process and are never written to disk.

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::SecureStore};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-lifetime secure store backed by a map.
#[derive(Default)]
pub struct MemorySecureStore {
    secrets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.secrets
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.secrets.read().await.get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        self.secrets.write().await.remove(key);
        Ok(())
    }

    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.secrets.read().await.contains_key(key))
    }
}
