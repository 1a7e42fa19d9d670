//! Stores, accounts and the saved session.
//!
//! The CLI talks to either backend through one [`CliStore`] and one
//! [`CliAuth`], picked by the scheme of the store URL.

pub mod storage;
mod types;

use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;

use memoria_core::record::FieldPatch;
use memoria_core::{
    AuthProvider, AuthSession, Credentials, Snapshot, StoragePath, Store, StoreUrl,
};
use memoria_file::{FileBackend, FileSession, FileSubscription};
use memoria_rest::{RestAuth, RestStore, RestSubscription};

use crate::cli::StoreArgs;

pub use types::CliSession;

/// A store of either kind, acting as the signed-in user.
#[derive(Debug, Clone)]
pub enum CliStore {
    File(FileSession),
    Rest(RestStore),
}

/// A live subscription from a [`CliStore`].
pub enum CliSubscription {
    File(FileSubscription),
    Rest(RestSubscription),
}

impl Stream for CliSubscription {
    type Item = memoria_core::Result<Snapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.get_mut() {
            CliSubscription::File(sub) => Pin::new(sub).poll_next(cx),
            CliSubscription::Rest(sub) => Pin::new(sub).poll_next(cx),
        }
    }
}

#[async_trait]
impl Store for CliStore {
    type Subscription = CliSubscription;

    fn url(&self) -> &StoreUrl {
        match self {
            CliStore::File(store) => store.url(),
            CliStore::Rest(store) => store.url(),
        }
    }

    fn subscribe(&self, path: &StoragePath) -> memoria_core::Result<CliSubscription> {
        match self {
            CliStore::File(store) => store.subscribe(path).map(CliSubscription::File),
            CliStore::Rest(store) => store.subscribe(path).map(CliSubscription::Rest),
        }
    }

    async fn set(&self, path: &StoragePath, value: &Value) -> memoria_core::Result<()> {
        match self {
            CliStore::File(store) => store.set(path, value).await,
            CliStore::Rest(store) => store.set(path, value).await,
        }
    }

    async fn update(&self, path: &StoragePath, patch: &FieldPatch) -> memoria_core::Result<()> {
        match self {
            CliStore::File(store) => store.update(path, patch).await,
            CliStore::Rest(store) => store.update(path, patch).await,
        }
    }

    async fn remove(&self, path: &StoragePath) -> memoria_core::Result<()> {
        match self {
            CliStore::File(store) => store.remove(path).await,
            CliStore::Rest(store) => store.remove(path).await,
        }
    }
}

/// Account operations for either kind of store.
pub enum CliAuth {
    File(FileBackend),
    Rest(RestAuth),
}

impl CliAuth {
    /// Pick the account service for the store named in `args`.
    pub fn from_args(args: &StoreArgs) -> Result<(StoreUrl, Self)> {
        let raw = args
            .store
            .as_deref()
            .context("No store given. Pass --store or set MEMORIA_STORE.")?;
        let url = StoreUrl::new(raw).context("Invalid store URL")?;

        if url.is_local() {
            let backend = FileBackend::open(url.clone()).context("Failed to open file store")?;
            return Ok((url, CliAuth::File(backend)));
        }

        if url.is_network() {
            let api_key = args
                .api_key
                .as_deref()
                .context("Hosted stores need an API key. Pass --api-key or set MEMORIA_API_KEY.")?;
            let mut auth = RestAuth::new(api_key).context("Failed to create auth client")?;
            if let Some(endpoint) = &args.auth_endpoint {
                auth = auth.with_endpoint(endpoint);
            }
            return Ok((url, CliAuth::Rest(auth)));
        }

        bail!("Store '{}' cannot be used from the command line", url);
    }

    pub async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> memoria_core::Result<AuthSession> {
        match self {
            CliAuth::File(backend) => backend.sign_up(credentials, display_name).await,
            CliAuth::Rest(auth) => auth.sign_up(credentials, display_name).await,
        }
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> memoria_core::Result<AuthSession> {
        match self {
            CliAuth::File(backend) => backend.sign_in(credentials).await,
            CliAuth::Rest(auth) => auth.sign_in(credentials).await,
        }
    }
}
