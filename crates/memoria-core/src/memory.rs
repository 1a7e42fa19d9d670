//! In-process store.
//!
//! [`MemoryStore`] keeps the whole tree in memory and notifies subscribers
//! through a broadcast channel. It applies every write synchronously, so a
//! write is visible to subscribers as soon as it resolves. Access can be
//! restricted with [`MemoryStore::deny`] to exercise permission failures.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_core::Stream;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::Result;
use crate::error::{Error, RemoteErrorKind};
use crate::record::{FieldPatch, Snapshot, tree};
use crate::traits::Store;
use crate::types::{StoragePath, StoreUrl};

const CHANGE_CAPACITY: usize = 256;

/// A store that lives entirely in memory.
///
/// Cloning is cheap and clones share the same tree.
#[derive(Clone)]
pub struct MemoryStore {
    url: StoreUrl,
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    tree: Mutex<Value>,
    denied: Mutex<Vec<StoragePath>>,
    changes: broadcast::Sender<StoragePath>,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            url: StoreUrl::local_memory(),
            inner: Arc::new(MemoryInner {
                tree: Mutex::new(Value::Null),
                denied: Mutex::new(Vec::new()),
                changes,
                writes: AtomicU64::new(0),
            }),
        }
    }

    /// Reject every read and write at or below `prefix`.
    ///
    /// Existing subscriptions under `prefix` fail with `PermissionDenied`.
    pub fn deny(&self, prefix: StoragePath) {
        debug!(prefix = %prefix, "Denying access");
        lock(&self.inner.denied).push(prefix.clone());
        let _ = self.inner.changes.send(prefix);
    }

    /// Lift every restriction added with [`deny`](Self::deny).
    pub fn allow_all(&self) {
        lock(&self.inner.denied).clear();
    }

    /// The value at `path`, if any.
    pub fn get(&self, path: &StoragePath) -> Option<Value> {
        tree::value_at(&lock(&self.inner.tree), path.segments()).cloned()
    }

    /// Number of writes the store has accepted.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::SeqCst)
    }

    fn check_access(&self, path: &StoragePath) -> Result<()> {
        let denied = lock(&self.inner.denied);
        match denied.iter().find(|prefix| prefix.contains(path)) {
            Some(prefix) => Err(permission_denied(prefix)),
            None => Ok(()),
        }
    }

    fn write(&self, path: &StoragePath, apply: impl FnOnce(&mut Value)) -> Result<()> {
        self.check_access(path)?;
        apply(&mut lock(&self.inner.tree));
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        trace!(path = %path, "Write applied");
        let _ = self.inner.changes.send(path.clone());
        Ok(())
    }

    fn snapshot(&self, path: &StoragePath) -> Result<Snapshot> {
        self.check_access(path)?;
        let value = self.get(path).unwrap_or(Value::Null);
        Ok(Snapshot::from_value(path.clone(), value))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("url", &self.url)
            .field("writes", &self.write_count())
            .finish()
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Subscription = MemorySubscription;

    fn url(&self) -> &StoreUrl {
        &self.url
    }

    fn subscribe(&self, path: &StoragePath) -> Result<Self::Subscription> {
        Ok(MemorySubscription::new(self.clone(), path.clone()))
    }

    async fn set(&self, path: &StoragePath, value: &Value) -> Result<()> {
        self.write(path, |root| {
            tree::set_at(root, path.segments(), value.clone())
        })
    }

    async fn update(&self, path: &StoragePath, patch: &FieldPatch) -> Result<()> {
        self.write(path, |root| tree::merge_at(root, path.segments(), patch))
    }

    async fn remove(&self, path: &StoragePath) -> Result<()> {
        self.write(path, |root| {
            tree::remove_at(root, path.segments());
        })
    }
}

/// Snapshot stream for a [`MemoryStore`] path.
pub struct MemorySubscription {
    inner: Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>,
}

impl MemorySubscription {
    fn new(store: MemoryStore, path: StoragePath) -> Self {
        // Listen before taking the first snapshot so no write falls in between.
        let mut changes = store.inner.changes.subscribe();

        let stream = async_stream::stream! {
            match store.snapshot(&path) {
                Ok(snapshot) => yield Ok(snapshot),
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }

            loop {
                match changes.recv().await {
                    Ok(changed) if !changed.overlaps(&path) => continue,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => return,
                }

                match store.snapshot(&path) {
                    Ok(snapshot) => yield Ok(snapshot),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for MemorySubscription {
    type Item = Result<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

fn permission_denied(prefix: &StoragePath) -> Error {
    Error::remote(
        RemoteErrorKind::PermissionDenied,
        format!("access to '{prefix}' is denied"),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;

    fn path(s: &str) -> StoragePath {
        StoragePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn first_item_is_current_content() {
        let store = MemoryStore::new();
        store
            .set(&path("users/u1/ideas/a"), &json!({"text": "x"}))
            .await
            .unwrap();

        let mut sub = store.subscribe(&path("users/u1/ideas")).unwrap();
        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("a"), Some(&json!({"text": "x"})));
    }

    #[tokio::test]
    async fn unrelated_writes_are_not_delivered() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&path("users/u1/ideas")).unwrap();
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        store
            .set(&path("users/u2/ideas/a"), &json!({"text": "other"}))
            .await
            .unwrap();
        store
            .set(&path("users/u1/ideas/b"), &json!({"text": "mine"}))
            .await
            .unwrap();

        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("b").is_some());
    }

    #[tokio::test]
    async fn update_merges_and_remove_deletes() {
        let store = MemoryStore::new();
        let record = path("ideas/a");
        store
            .set(&record, &json!({"text": "x", "status": "pending"}))
            .await
            .unwrap();
        store
            .update(&record, &FieldPatch::new().set("status", "done"))
            .await
            .unwrap();
        assert_eq!(
            store.get(&record),
            Some(json!({"text": "x", "status": "done"}))
        );

        store.remove(&record).await.unwrap();
        assert_eq!(store.get(&record), None);
        store.remove(&record).await.unwrap();
        assert_eq!(store.write_count(), 4);
    }

    #[tokio::test]
    async fn denied_subscription_fails_then_ends() {
        let store = MemoryStore::new();
        store.deny(path("users/u1"));

        let mut sub = store.subscribe(&path("users/u1/ideas")).unwrap();
        let err = sub.next().await.unwrap().unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn deny_fails_live_subscription() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe(&path("commonNotes")).unwrap();
        sub.next().await.unwrap().unwrap();

        store.deny(path("commonNotes"));
        let err = sub.next().await.unwrap().unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn denied_write_is_rejected() {
        let store = MemoryStore::new();
        store.deny(path("ideas"));
        let err = store
            .set(&path("ideas/a"), &json!({"text": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
        assert_eq!(store.write_count(), 0);

        store.allow_all();
        store
            .set(&path("ideas/a"), &json!({"text": "x"}))
            .await
            .unwrap();
    }
}
