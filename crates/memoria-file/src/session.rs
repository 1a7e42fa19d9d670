//! File-backed store session.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use memoria_core::error::RemoteErrorKind;
use memoria_core::types::USERS_ROOT;
use memoria_core::{Error, FieldPatch, Identity, Result, StoragePath, Store, StoreUrl};

use crate::backend::FileBackend;
use crate::subscription::FileSubscription;

/// The file store as seen by one user.
#[derive(Debug, Clone)]
pub struct FileSession {
    backend: FileBackend,
    identity: Option<Identity>,
}

impl FileSession {
    pub(crate) fn new(backend: FileBackend, identity: Option<Identity>) -> Self {
        Self { backend, identity }
    }

    /// The user this session acts as.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    fn uid(&self) -> &str {
        self.identity
            .as_ref()
            .map(|identity| identity.user_id.as_str())
            .unwrap_or("-")
    }

    /// Reads and writes need a signed-in user; `users/{uid}` is private.
    fn check_access(&self, path: &StoragePath) -> Result<()> {
        let Some(identity) = &self.identity else {
            return Err(denied(path, "not signed in"));
        };

        match path.owner() {
            Some(owner) if owner == identity.user_id => Ok(()),
            Some(_) => Err(denied(path, "owned by another user")),
            None if path.as_str() == USERS_ROOT => Err(denied(path, "not readable")),
            None => Ok(()),
        }
    }
}

fn denied(path: &StoragePath, reason: &str) -> Error {
    Error::remote(
        RemoteErrorKind::PermissionDenied,
        format!("'{}' {}", path, reason),
    )
}

#[async_trait]
impl Store for FileSession {
    type Subscription = FileSubscription;

    fn url(&self) -> &StoreUrl {
        self.backend.url()
    }

    #[instrument(skip(self), fields(uid = %self.uid(), %path))]
    fn subscribe(&self, path: &StoragePath) -> Result<Self::Subscription> {
        self.check_access(path)?;
        debug!("Subscribing");
        FileSubscription::new(self.backend.store().clone(), path.clone())
    }

    #[instrument(skip(self, value), fields(uid = %self.uid(), %path))]
    async fn set(&self, path: &StoragePath, value: &Value) -> Result<()> {
        self.check_access(path)?;
        self.backend.store().set(path, value)
    }

    #[instrument(skip(self, patch), fields(uid = %self.uid(), %path))]
    async fn update(&self, path: &StoragePath, patch: &FieldPatch) -> Result<()> {
        self.check_access(path)?;
        self.backend.store().update(path, patch)
    }

    #[instrument(skip(self), fields(uid = %self.uid(), %path))]
    async fn remove(&self, path: &StoragePath) -> Result<()> {
        self.check_access(path)?;
        self.backend.store().remove(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_core::{AuthProvider, Credentials};
    use serde_json::json;
    use tempfile::TempDir;

    async fn signed_in(dir: &TempDir, email: &str) -> FileSession {
        let url = StoreUrl::new(format!("file://{}", dir.path().display())).unwrap();
        let backend = FileBackend::open(url).unwrap().with_hash_cost(4);
        let session = backend
            .sign_up(&Credentials::new(email, "pw"), None)
            .await
            .unwrap();
        backend.authenticated(&session).unwrap()
    }

    fn path(s: &str) -> StoragePath {
        StoragePath::new(s).unwrap()
    }

    #[tokio::test]
    async fn own_subtree_is_writable() {
        let dir = TempDir::new().unwrap();
        let alice = signed_in(&dir, "alice@example.com").await;
        let uid = alice.identity().unwrap().user_id.clone();

        alice
            .set(&path(&format!("users/{uid}/ideas/a")), &json!({"text": "x"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn other_users_subtree_is_denied() {
        let dir = TempDir::new().unwrap();
        let alice = signed_in(&dir, "alice@example.com").await;
        let bob = signed_in(&dir, "bob@example.com").await;
        let alice_uid = alice.identity().unwrap().user_id.clone();

        let ideas = path(&format!("users/{alice_uid}/ideas"));
        let err = bob.subscribe(&ideas).err().unwrap();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));

        let err = bob
            .remove(&path(&format!("users/{alice_uid}/ideas/a")))
            .await
            .unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));

        let err = bob.subscribe(&path("users")).err().unwrap();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    }

    #[tokio::test]
    async fn shared_paths_are_open_to_signed_in_users() {
        let dir = TempDir::new().unwrap();
        let bob = signed_in(&dir, "bob@example.com").await;
        bob.set(&path("commonNotes/n1"), &json!({"text": "hi"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn anonymous_session_is_denied_everything() {
        let dir = TempDir::new().unwrap();
        let url = StoreUrl::new(format!("file://{}", dir.path().display())).unwrap();
        let anonymous = FileBackend::open(url).unwrap().anonymous();

        let err = anonymous
            .set(&path("commonNotes/n1"), &json!({"text": "hi"}))
            .await
            .unwrap_err();
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
        assert!(anonymous.subscribe(&path("commonNotes")).is_err());
    }
}
