//! Live list binding.
//!
//! A [`ListBinding`] mirrors the collection at a resolved path into a local
//! [`ListState`] and writes through to the store. It never applies writes
//! locally: the mirror only changes when the store delivers a snapshot.
//!
//! ```text
//!   AuthState ──► PathResolver ──► Resolution
//!                                     │
//!        Pending ─► Uninitialized     │ Ready(path)
//!        Unauthenticated ─► Unsubscribed
//!                                     ▼
//!                               Subscribing ──snapshot──► Synced
//!                                     │                     ▲ │
//!                                     └──────error──► Errored ┘
//! ```
//!
//! Every subscription gets a generation number. Tearing it down bumps the
//! generation before the next state is published, and snapshots are applied
//! only if their generation is still current, checked under the state lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::error::{Error, InvalidArgumentError, NotReadyError};
use crate::identity::{AuthState, Identity};
use crate::record::{FieldPatch, Record};
use crate::resolver::{PathMode, PathResolver, Resolution};
use crate::traits::{Store, Subscription};
use crate::types::{RecordId, StoragePath};

/// Uid of the creator, stamped on shared records.
pub const CREATED_BY_UID: &str = "createdByUid";
/// Display name of the creator, stamped on shared records.
pub const CREATOR_DISPLAY_NAME: &str = "creatorDisplayName";
/// Creation time (RFC 3339), used for display ordering.
pub const CREATED_AT: &str = "createdAt";

/// Where a binding is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// Waiting for the identity to load.
    Uninitialized,
    /// Nobody signed in; no subscription is held.
    Unsubscribed,
    /// Subscribed, waiting for the first snapshot.
    Subscribing,
    /// Items reflect the latest snapshot.
    Synced,
    /// The subscription failed.
    Errored,
}

impl SyncStatus {
    /// True while the binding is waiting for something.
    pub fn is_loading(self) -> bool {
        matches!(self, SyncStatus::Uninitialized | SyncStatus::Subscribing)
    }
}

/// Observable state of a binding.
///
/// On a subscription error the items are cleared, so a consumer shows an
/// empty list with an error rather than stale data.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    /// Lifecycle status.
    pub status: SyncStatus,
    /// Records from the latest snapshot, in no particular order.
    pub items: Vec<Record<T>>,
    /// The subscription failure, when `status` is `Errored`.
    pub error: Option<Error>,
    /// The path currently bound, if any.
    pub path: Option<StoragePath>,
}

impl<T> ListState<T> {
    fn with_status(status: SyncStatus, path: Option<StoragePath>) -> Self {
        Self {
            status,
            items: Vec::new(),
            error: None,
            path,
        }
    }

    fn errored(path: Option<StoragePath>, error: Error) -> Self {
        Self {
            status: SyncStatus::Errored,
            items: Vec::new(),
            error: Some(error),
            path,
        }
    }

    fn for_resolution(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Pending => Self::with_status(SyncStatus::Uninitialized, None),
            Resolution::Unauthenticated => Self::with_status(SyncStatus::Unsubscribed, None),
            Resolution::Ready(path) => {
                Self::with_status(SyncStatus::Subscribing, Some(path.clone()))
            }
        }
    }

    /// True while the binding is waiting for an identity or a first snapshot.
    pub fn loading(&self) -> bool {
        self.status.is_loading()
    }
}

struct Shared<T> {
    state: watch::Sender<ListState<T>>,
    generation: AtomicU64,
}

struct Inner {
    auth: AuthState,
    /// `None` after the auth state failed to resolve.
    resolution: Option<Resolution>,
    task: Option<JoinHandle<()>>,
    closed: bool,
}

/// A live, writable view of one collection.
///
/// Created with [`ListBinding::open`]; must be used inside a Tokio runtime
/// because the subscription is driven by a spawned task. Dropping the binding
/// tears the subscription down.
pub struct ListBinding<S, T> {
    store: Arc<S>,
    resolver: PathResolver,
    shared: Arc<Shared<T>>,
    inner: Mutex<Inner>,
}

impl<S, T> ListBinding<S, T>
where
    S: Store + 'static,
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Bind to `resource` in `mode`, resolving against `auth` right away.
    ///
    /// # Errors
    ///
    /// `Configuration` for a resource name that cannot work in `mode`;
    /// `InvalidArgument` if the identity's user id is not a valid path segment.
    pub fn open(store: Arc<S>, resource: &str, mode: PathMode, auth: &AuthState) -> Result<Self> {
        let resolver = PathResolver::new(resource, mode)?;
        let (state, _) = watch::channel(ListState::with_status(SyncStatus::Uninitialized, None));

        let binding = Self {
            store,
            resolver,
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
            }),
            inner: Mutex::new(Inner {
                auth: AuthState::loading(),
                resolution: Some(Resolution::Pending),
                task: None,
                closed: false,
            }),
        };

        binding.set_auth(auth)?;
        Ok(binding)
    }

    /// React to a change of the auth state.
    ///
    /// If the resolved path changes, the old subscription is torn down before
    /// anything else happens; no snapshot for the old path reaches the state
    /// after this returns.
    pub fn set_auth(&self, auth: &AuthState) -> Result<()> {
        let mut inner = self.lock_inner();
        if inner.closed {
            return Err(NotReadyError::Closed.into());
        }
        inner.auth = auth.clone();

        let resolution = match self.resolver.resolve(auth) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.teardown(&mut inner);
                inner.resolution = None;
                self.shared
                    .state
                    .send_replace(ListState::errored(None, e.clone()));
                return Err(e);
            }
        };

        if inner.resolution.as_ref() == Some(&resolution) {
            return Ok(());
        }

        self.teardown(&mut inner);
        inner.resolution = Some(resolution.clone());

        match resolution {
            Resolution::Ready(path) => self.subscribe(&mut inner, path),
            other => {
                self.shared
                    .state
                    .send_replace(ListState::for_resolution(&other));
            }
        }

        Ok(())
    }

    fn subscribe(&self, inner: &mut Inner, path: StoragePath) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.shared
            .state
            .send_replace(ListState::with_status(SyncStatus::Subscribing, Some(path.clone())));

        let stream = match self.store.subscribe(&path) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(path = %path, error = %e, "Subscription failed");
                self.shared
                    .state
                    .send_replace(ListState::errored(Some(path), e));
                return;
            }
        };

        info!(path = %path, generation, "Subscribed");
        let shared = Arc::clone(&self.shared);
        inner.task = Some(tokio::spawn(drive(shared, generation, path, stream)));
    }

    /// Create a record from `fields` and return it with its new id.
    ///
    /// For shared lists the creator uid and display name are stamped on the
    /// record, and `createdAt` is filled in when absent. The store write is a
    /// full replace of the new key. The returned record is what the client
    /// sent; the mirror picks it up from the next snapshot.
    ///
    /// # Errors
    ///
    /// `NotReady` without a path (or, for shared lists, without an identity);
    /// `InvalidArgument` if `fields` does not serialize to a JSON object;
    /// `Remote` if the store rejects the write.
    #[instrument(skip_all)]
    pub async fn add_item(&self, fields: T) -> Result<Record<T>> {
        let (path, identity) = self.target()?;

        let mut value = serde_json::to_value(&fields).map_err(fields_error)?;
        let Value::Object(map) = &mut value else {
            return Err(InvalidArgumentError::Fields {
                reason: "record fields must serialize to a JSON object".to_string(),
            }
            .into());
        };
        map.remove("id");

        if self.resolver.mode() == PathMode::GlobalRoot {
            let identity = identity.ok_or(NotReadyError::Unauthenticated)?;
            stamp_creator(map, &identity);
        }

        let record_fields: T = serde_json::from_value(value.clone()).map_err(fields_error)?;
        let id = RecordId::generate();
        let record_path = path.child(&id);

        self.store.set(&record_path, &value).await?;
        debug!(path = %record_path, "Added record");

        Ok(Record::new(id, record_fields))
    }

    /// Merge `patch` into the record `id`.
    ///
    /// Fields not in the patch are untouched. The id itself, and on shared
    /// lists the creator stamp, cannot be changed. An empty patch succeeds
    /// without a write. Merging into a missing id creates it.
    ///
    /// # Errors
    ///
    /// `NotReady` without a path; `InvalidArgument` for an empty or invalid
    /// id or a protected field; `Remote` if the store rejects the write.
    #[instrument(skip(self, patch), fields(field_count = patch.len()))]
    pub async fn update_item(&self, id: &str, patch: FieldPatch) -> Result<()> {
        let (path, _) = self.target()?;
        let id = RecordId::new(id)?;

        patch.validate()?;
        self.check_protected(&patch)?;

        if patch.is_empty() {
            return Ok(());
        }

        let record_path = path.child(&id);
        self.store.update(&record_path, &patch).await?;
        debug!(path = %record_path, "Updated record");

        Ok(())
    }

    /// Delete the record `id`. Deleting a missing id succeeds.
    ///
    /// # Errors
    ///
    /// `NotReady` without a path; `InvalidArgument` for an empty or invalid
    /// id; `Remote` if the store rejects the write.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: &str) -> Result<()> {
        let (path, _) = self.target()?;
        let id = RecordId::new(id)?;

        let record_path = path.child(&id);
        self.store.remove(&record_path).await?;
        debug!(path = %record_path, "Deleted record");

        Ok(())
    }

    fn target(&self) -> Result<(StoragePath, Option<Identity>)> {
        let inner = self.lock_inner();
        if inner.closed {
            return Err(NotReadyError::Closed.into());
        }
        match &inner.resolution {
            Some(Resolution::Ready(path)) => Ok((path.clone(), inner.auth.identity.clone())),
            Some(Resolution::Pending) => Err(NotReadyError::Pending.into()),
            _ => Err(NotReadyError::Unauthenticated.into()),
        }
    }

    fn check_protected(&self, patch: &FieldPatch) -> Result<()> {
        let mut protected = vec!["id"];
        if self.resolver.mode() == PathMode::GlobalRoot {
            protected.extend([CREATED_BY_UID, CREATOR_DISPLAY_NAME]);
        }
        match protected.into_iter().find(|field| patch.contains(field)) {
            Some(field) => Err(InvalidArgumentError::ProtectedField {
                field: field.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl<S, T: Clone> ListBinding<S, T> {
    /// Wait until the binding is no longer loading and return its state.
    ///
    /// Never returns while the identity is still loading, unless
    /// [`set_auth`](Self::set_auth) moves it on.
    pub async fn settled(&self) -> Result<ListState<T>> {
        let mut rx = self.watch();
        let state = rx
            .wait_for(|state| !state.loading())
            .await
            .map_err(|_| Error::NotReady(NotReadyError::Closed))?;
        Ok(state.clone())
    }

    /// A copy of the current state.
    pub fn state(&self) -> ListState<T> {
        self.shared.state.borrow().clone()
    }

    /// A copy of the current items.
    pub fn items(&self) -> Vec<Record<T>> {
        self.shared.state.borrow().items.clone()
    }

    /// The current subscription error, if any.
    pub fn error(&self) -> Option<Error> {
        self.shared.state.borrow().error.clone()
    }
}

impl<S, T> ListBinding<S, T> {
    /// A receiver that sees every state change.
    pub fn watch(&self) -> watch::Receiver<ListState<T>> {
        self.shared.state.subscribe()
    }

    /// The current status.
    pub fn status(&self) -> SyncStatus {
        self.shared.state.borrow().status
    }

    /// True while waiting for an identity or a first snapshot.
    pub fn loading(&self) -> bool {
        self.status().is_loading()
    }

    /// The path currently bound.
    pub fn path(&self) -> Option<StoragePath> {
        self.shared.state.borrow().path.clone()
    }

    /// The path mode this binding was opened with.
    pub fn mode(&self) -> PathMode {
        self.resolver.mode()
    }

    /// Tear down the subscription. Later operations fail with `NotReady`.
    pub fn close(&self) {
        let mut inner = self.lock_inner();
        if inner.closed {
            return;
        }
        inner.closed = true;
        self.teardown(&mut inner);
        // Wait out a snapshot that passed its generation check before the bump.
        self.shared.state.send_if_modified(|_| false);
    }

    fn teardown(&self, inner: &mut Inner) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = inner.task.take() {
            task.abort();
            info!("Tore down subscription");
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S, T> Drop for ListBinding<S, T> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn drive<T, Sub>(shared: Arc<Shared<T>>, generation: u64, path: StoragePath, mut stream: Sub)
where
    T: DeserializeOwned + Send + Sync + 'static,
    Sub: Subscription,
{
    while let Some(item) = stream.next().await {
        let next = item.map(|snapshot| snapshot.decode::<T>());

        let applied = shared.state.send_if_modified(|state| {
            if shared.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            match next {
                Ok(items) => {
                    state.status = SyncStatus::Synced;
                    state.items = items;
                    state.error = None;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Subscription error");
                    state.status = SyncStatus::Errored;
                    state.items.clear();
                    state.error = Some(e);
                }
            }
            true
        });

        if !applied {
            debug!(path = %path, generation, "Dropped snapshot for stale subscription");
            return;
        }
    }

    debug!(path = %path, "Subscription stream ended");
}

fn stamp_creator(map: &mut serde_json::Map<String, Value>, identity: &Identity) {
    map.insert(
        CREATED_BY_UID.to_string(),
        Value::String(identity.user_id.clone()),
    );
    map.insert(
        CREATOR_DISPLAY_NAME.to_string(),
        Value::String(identity.display_name.clone()),
    );
    if map.get(CREATED_AT).is_none_or(Value::is_null) {
        map.insert(CREATED_AT.to_string(), Value::String(now_timestamp()));
    }
}

/// Current time as RFC 3339 with millisecond precision, e.g.
/// `2024-05-01T09:30:00.000Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn fields_error(e: serde_json::Error) -> Error {
    InvalidArgumentError::Fields {
        reason: e.to_string(),
    }
    .into()
}
