//! Store trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::record::FieldPatch;
use crate::types::{StoragePath, StoreUrl};

use super::Subscription;

/// A path-addressed realtime key-value store.
///
/// All writes resolve once the store has acknowledged them. They do not wait
/// for subscriptions to observe the change.
#[async_trait]
pub trait Store: Send + Sync {
    /// Subscription stream type for this store.
    type Subscription: Subscription + 'static;

    /// Returns the location of this store.
    fn url(&self) -> &StoreUrl;

    /// Subscribe to the content of `path`.
    fn subscribe(&self, path: &StoragePath) -> Result<Self::Subscription>;

    /// Replace the value at `path`.
    async fn set(&self, path: &StoragePath, value: &Value) -> Result<()>;

    /// Merge `patch` into the object at `path`, creating it if absent.
    async fn update(&self, path: &StoragePath, patch: &FieldPatch) -> Result<()>;

    /// Delete `path` and everything below it. Missing paths are not an error.
    async fn remove(&self, path: &StoragePath) -> Result<()>;
}

#[async_trait]
impl<S: Store + ?Sized> Store for Arc<S> {
    type Subscription = S::Subscription;

    fn url(&self) -> &StoreUrl {
        (**self).url()
    }

    fn subscribe(&self, path: &StoragePath) -> Result<Self::Subscription> {
        (**self).subscribe(path)
    }

    async fn set(&self, path: &StoragePath, value: &Value) -> Result<()> {
        (**self).set(path, value).await
    }

    async fn update(&self, path: &StoragePath, patch: &FieldPatch) -> Result<()> {
        (**self).update(path, patch).await
    }

    async fn remove(&self, path: &StoragePath) -> Result<()> {
        (**self).remove(path).await
    }
}
