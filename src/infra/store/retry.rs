//! Timeouts and retries around a document store.
//!
//! Every call is bounded by the policy timeout. Reads and deletes are
//! retried on transient failures with exponential backoff; inserts,
//! replacements and sequence draws run exactly once since repeating them
//! after an unknown outcome could apply them twice.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{DocumentQuery, DocumentStore, StoreError, StoreResult, StoredDocument};
use crate::config::Config;
use crate::domain::Document;

/// Timeout and retry settings for store calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Total attempts for retryable calls, including the first
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.store_timeout(),
            attempts: config.store_retry_attempts.max(1),
            base_delay: config.store_retry_delay(),
        }
    }

    /// Backoff before retry number `attempt` (1-based)
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Store decorator applying a `RetryPolicy`
pub struct RetryingStore {
    inner: Arc<dyn DocumentStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn guarded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.policy.timeout)),
        }
    }

    async fn retried<T, F, Fut>(&self, operation: &'static str, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = StoreResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match self.guarded(call()).await {
                Err(err) if err.is_transient() && attempt < self.policy.attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        backend = self.inner.backend_name(),
                        "Transient store failure, retrying in {:?}: {}",
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[async_trait]
impl DocumentStore for RetryingStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<StoredDocument> {
        self.guarded(self.inner.insert(collection, id, body)).await
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>> {
        self.retried("get", || self.inner.get(collection, id)).await
    }

    async fn find(&self, query: &DocumentQuery) -> StoreResult<Vec<StoredDocument>> {
        self.retried("find", || self.inner.find(query)).await
    }

    async fn count(&self, collection: &str, filter: &Document) -> StoreResult<u64> {
        self.retried("count", || self.inner.count(collection, filter))
            .await
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<Option<StoredDocument>> {
        self.guarded(self.inner.replace(collection, id, body)).await
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        self.retried("remove", || self.inner.remove(collection, id))
            .await
    }

    async fn next_sequence(&self, collection: &str) -> StoreResult<u64> {
        self.guarded(self.inner.next_sequence(collection)).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.retried("ping", || self.inner.ping()).await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
