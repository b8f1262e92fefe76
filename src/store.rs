//! Optional auxiliary store for complaint facts.
//!
//! The pipeline behaves identically with or without a store: writes are
//! best-effort and failures are only logged by the caller.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::triage::types::ComplaintId;

/// Key-value facts attached to a complaint identifier.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Register a freshly generated identifier.
    async fn register(&self, id: &ComplaintId) -> Result<(), StoreError>;

    /// Attach a fact to a registered identifier.
    async fn put(&self, id: &ComplaintId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read one fact.
    async fn get(&self, id: &ComplaintId, key: &str) -> Result<Option<String>, StoreError>;

    /// Read every fact for an identifier.
    async fn get_all(&self, id: &ComplaintId) -> Result<HashMap<String, String>, StoreError>;
}

/// Store that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl ComplaintStore for NoopStore {
    async fn register(&self, _id: &ComplaintId) -> Result<(), StoreError> {
        Ok(())
    }

    async fn put(&self, _id: &ComplaintId, _key: &str, _value: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, _id: &ComplaintId, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn get_all(&self, _id: &ComplaintId) -> Result<HashMap<String, String>, StoreError> {
        Ok(HashMap::new())
    }
}

/// In-process store, useful for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    complaints: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn register(&self, id: &ComplaintId) -> Result<(), StoreError> {
        let mut guard = self.complaints.write().await;
        guard
            .entry(id.to_string())
            .or_default()
            .insert("created_at".to_string(), Utc::now().to_rfc3339());
        Ok(())
    }

    async fn put(&self, id: &ComplaintId, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.complaints.write().await;
        let facts = guard
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotRegistered { id: id.to_string() })?;
        facts.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, id: &ComplaintId, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.complaints.read().await;
        Ok(guard.get(id.as_str()).and_then(|facts| facts.get(key).cloned()))
    }

    async fn get_all(&self, id: &ComplaintId) -> Result<HashMap<String, String>, StoreError> {
        let guard = self.complaints.read().await;
        Ok(guard.get(id.as_str()).cloned().unwrap_or_default())
    }
}
