//! Accounts and sessions for a file store.

use std::path::Path;

use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use serde_json::json;
use tracing::debug;

use memoria_core::error::{AuthError, Error, InvalidArgumentError};
use memoria_core::{
    AccessToken, AuthProvider, AuthSession, Credentials, Identity, Result, StoreUrl,
};

use crate::session::FileSession;
use crate::store::{FileStore, LocalAccount};

/// A file store together with its accounts.
///
/// Signing in yields an [`AuthSession`]; [`FileBackend::authenticated`] turns
/// it back into a [`FileSession`] that reads and writes as that user.
#[derive(Debug, Clone)]
pub struct FileBackend {
    store: FileStore,
    url: StoreUrl,
    hash_cost: u32,
}

impl FileBackend {
    /// Create a backend at the given root directory.
    pub fn new(root: impl AsRef<Path>, url: StoreUrl) -> Self {
        Self {
            store: FileStore::new(root),
            url,
            hash_cost: DEFAULT_COST,
        }
    }

    /// Create a backend from a `file://` URL.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the URL is not a local directory.
    pub fn open(url: StoreUrl) -> Result<Self> {
        let root = url.to_file_path().ok_or_else(|| InvalidArgumentError::StoreUrl {
            value: url.to_string(),
            reason: "not a local directory".to_string(),
        })?;
        Ok(Self::new(root, url))
    }

    /// Use a different bcrypt cost for new passwords.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Returns the store URL.
    pub fn url(&self) -> &StoreUrl {
        &self.url
    }

    pub(crate) fn store(&self) -> &FileStore {
        &self.store
    }

    /// A session nobody is signed in to. Every access is denied.
    pub fn anonymous(&self) -> FileSession {
        FileSession::new(self.clone(), None)
    }

    /// A session acting as the user of `session`.
    ///
    /// # Errors
    ///
    /// `Auth(InvalidCredentials)` if the token does not belong to the
    /// identity, or the account was removed or changed its password.
    pub fn authenticated(&self, session: &AuthSession) -> Result<FileSession> {
        let account = self.validate_token(&session.access_token)?;
        if account.uid != session.identity.user_id {
            return Err(AuthError::InvalidCredentials(
                "token belongs to another user".to_string(),
            )
            .into());
        }
        Ok(FileSession::new(self.clone(), Some(identity_of(&account))))
    }

    fn make_token(account: &LocalAccount) -> AccessToken {
        let token = json!({
            "uid": account.uid,
            "password_hash": account.password_hash,
        })
        .to_string();
        AccessToken::new(token)
    }

    fn parse_token(token: &AccessToken) -> Result<(String, String)> {
        let invalid = |message: &str| AuthError::InvalidCredentials(message.to_string());

        let value: serde_json::Value =
            serde_json::from_str(token.as_str()).map_err(|_| invalid("malformed token"))?;

        let uid = value
            .get("uid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("token missing 'uid'"))?;

        let password_hash = value
            .get("password_hash")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("token missing 'password_hash'"))?;

        Ok((uid.to_string(), password_hash.to_string()))
    }

    fn validate_token(&self, token: &AccessToken) -> Result<LocalAccount> {
        let (uid, password_hash) = Self::parse_token(token)?;
        let account = self
            .store
            .get_account(&uid)?
            .ok_or_else(|| AuthError::InvalidCredentials("account not found".to_string()))?;

        if account.password_hash != password_hash {
            return Err(AuthError::InvalidCredentials("token has expired".to_string()).into());
        }

        Ok(account)
    }
}

#[async_trait]
impl AuthProvider for FileBackend {
    async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> Result<AuthSession> {
        let email = credentials.email().trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Other(format!("invalid email '{}'", email)).into());
        }
        if credentials.password().is_empty() {
            return Err(AuthError::Other("password cannot be empty".to_string()).into());
        }

        let password_hash =
            hash(credentials.password(), self.hash_cost).map_err(|e| AuthError::Other(e.to_string()))?;

        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_display_name(email));

        let account = self
            .store
            .create_account(email, display_name, &password_hash)?;
        debug!(uid = %account.uid, "Signed up");

        Ok(AuthSession::new(identity_of(&account), Self::make_token(&account)))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession> {
        let account = self
            .store
            .find_account_by_email(credentials.email().trim())?
            .ok_or_else(|| AuthError::InvalidCredentials("account not found".to_string()))?;

        let ok = verify(credentials.password(), &account.password_hash)
            .map_err(|e| Error::Auth(AuthError::Other(e.to_string())))?;

        if !ok {
            return Err(AuthError::InvalidCredentials("wrong password".to_string()).into());
        }

        debug!(uid = %account.uid, "Signed in");
        Ok(AuthSession::new(identity_of(&account), Self::make_token(&account)))
    }
}

fn identity_of(account: &LocalAccount) -> Identity {
    Identity::new(&account.uid, &account.display_name).with_email(&account.email)
}

/// The part of an email before the `@`.
fn default_display_name(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend() -> (TempDir, FileBackend) {
        let dir = TempDir::new().unwrap();
        let url = StoreUrl::new(format!("file://{}", dir.path().display())).unwrap();
        let backend = FileBackend::open(url).unwrap().with_hash_cost(4);
        (dir, backend)
    }

    fn alice() -> Credentials {
        Credentials::new("alice@example.com", "hunter2")
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let (_dir, backend) = backend();
        let created = backend.sign_up(&alice(), Some("Alice")).await.unwrap();
        assert_eq!(created.identity.display_name, "Alice");

        let session = backend.sign_in(&alice()).await.unwrap();
        assert_eq!(session.identity.user_id, created.identity.user_id);
        assert_eq!(session.identity.email.as_deref(), Some("alice@example.com"));
        assert!(backend.authenticated(&session).is_ok());
    }

    #[tokio::test]
    async fn display_name_defaults_to_email_name() {
        let (_dir, backend) = backend();
        let session = backend.sign_up(&alice(), None).await.unwrap();
        assert_eq!(session.identity.display_name, "alice");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (_dir, backend) = backend();
        backend.sign_up(&alice(), None).await.unwrap();

        let err = backend
            .sign_in(&Credentials::new("alice@example.com", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let (_dir, backend) = backend();
        backend.sign_up(&alice(), None).await.unwrap();
        let err = backend.sign_up(&alice(), None).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountExists(_))));
    }

    #[tokio::test]
    async fn token_for_another_identity_is_rejected() {
        let (_dir, backend) = backend();
        let mut session = backend.sign_up(&alice(), None).await.unwrap();
        session.identity.user_id = "someone-else".to_string();
        assert!(backend.authenticated(&session).is_err());
    }
}
