use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::store::{KeyValueStore, StoreError, StoreResult};

/// Envoltorio que acota cada llamada al almacén con un timeout
///
/// Una llamada colgada se convierte en `StoreError::Timeout`, que las capas
/// superiores tratan igual que cualquier caída del almacén.
#[derive(Clone)]
pub struct TimeoutStore {
    inner: Arc<dyn KeyValueStore>,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn KeyValueStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn guard<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout.as_millis() as u64))?
    }
}

#[async_trait]
impl KeyValueStore for TimeoutStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> StoreResult<()> {
        self.guard(self.inner.set_ex(key, value, ttl)).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.guard(self.inner.get(key)).await
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        self.guard(self.inner.delete(key)).await
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.guard(self.inner.exists(key)).await
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.guard(self.inner.keys(pattern)).await
    }

    async fn delete_many(&self, keys: &[String]) -> StoreResult<u64> {
        self.guard(self.inner.delete_many(keys)).await
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.guard(self.inner.incr(key)).await
    }

    async fn expire(&self, key: &str, ttl: u64) -> StoreResult<bool> {
        self.guard(self.inner.expire(key, ttl)).await
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<u64>> {
        self.guard(self.inner.ttl(key)).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.guard(self.inner.ping()).await
    }
}
