//! Identity and authentication state.
//!
//! The binding never asks who is signed in; callers hand it an [`AuthState`]
//! and call [`ListBinding::set_auth`](crate::ListBinding::set_auth) when it changes.

use serde::{Deserialize, Serialize};

use crate::tokens::AccessToken;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user id; also the key of the user's subtree.
    pub user_id: String,
    /// Name shown next to shared records.
    pub display_name: String,
    /// Sign-in email, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity without an email.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: None,
        }
    }

    /// Attach an email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// What the auth layer currently knows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthState {
    /// The signed-in identity, if any.
    pub identity: Option<Identity>,
    /// True while the auth layer has not decided yet.
    pub loading: bool,
}

impl AuthState {
    /// Auth is still being determined.
    pub fn loading() -> Self {
        Self {
            identity: None,
            loading: true,
        }
    }

    /// Nobody is signed in.
    pub fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    /// `identity` is signed in.
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
        }
    }

    /// True once an identity is known.
    pub fn is_authenticated(&self) -> bool {
        !self.loading && self.identity.is_some()
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Who signed in.
    pub identity: Identity,
    /// Token the store uses to check access.
    pub access_token: AccessToken,
}

impl AuthSession {
    /// Create a session.
    pub fn new(identity: Identity, access_token: AccessToken) -> Self {
        Self {
            identity,
            access_token,
        }
    }

    /// The matching auth state.
    pub fn auth_state(&self) -> AuthState {
        AuthState::signed_in(self.identity.clone())
    }
}
