//! Authentication provider trait.

use async_trait::async_trait;

use crate::identity::AuthSession;
use crate::{Credentials, Result};

/// Email/password authentication shared by everyone using one store.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an account and sign it in.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> Result<AuthSession>;

    /// Sign in to an existing account.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession>;
}
