//! The signed-in session of the CLI.

use anyhow::{Context, Result, bail};

use memoria_core::{AuthSession, AuthState, Identity, StoreUrl};
use memoria_file::FileBackend;
use memoria_rest::RestStore;

use super::CliStore;

/// Who is signed in, and where.
#[derive(Debug, Clone)]
pub struct CliSession {
    store: StoreUrl,
    session: AuthSession,
}

impl CliSession {
    pub fn new(store: StoreUrl, session: AuthSession) -> Self {
        Self { store, session }
    }

    pub fn store_url(&self) -> &StoreUrl {
        &self.store
    }

    pub fn identity(&self) -> &Identity {
        &self.session.identity
    }

    pub fn auth_session(&self) -> &AuthSession {
        &self.session
    }

    pub fn auth_state(&self) -> AuthState {
        self.session.auth_state()
    }

    /// Open the store as the signed-in user.
    pub fn connect(&self) -> Result<CliStore> {
        if self.store.is_local() {
            let backend =
                FileBackend::open(self.store.clone()).context("Failed to open file store")?;
            let session = backend
                .authenticated(&self.session)
                .context("Saved session is no longer valid. Run 'memoria login' again.")?;
            return Ok(CliStore::File(session));
        }

        if self.store.is_network() {
            let store = RestStore::new(self.store.clone())
                .context("Failed to create database client")?
                .with_token(self.session.access_token.clone());
            return Ok(CliStore::Rest(store));
        }

        bail!("Store '{}' cannot be used from the command line", self.store);
    }
}
