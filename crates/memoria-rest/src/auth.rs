//! Email/password accounts through the identity toolkit REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use memoria_core::error::{AuthError, Error, RemoteErrorKind};
use memoria_core::{AccessToken, AuthProvider, AuthSession, Credentials, Identity, Result};

use crate::error::transport_error;

/// Base URL of the hosted identity toolkit.
pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

const SIGN_UP: &str = "accounts:signUp";
const SIGN_IN: &str = "accounts:signInWithPassword";
const UPDATE: &str = "accounts:update";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest<'a> {
    id_token: &'a str,
    display_name: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    id_token: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Accounts shared by every user of a project, identified by its API key.
#[derive(Debug, Clone)]
pub struct RestAuth {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl RestAuth {
    /// Create an auth client for the project with `api_key`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("memoria/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::remote(RemoteErrorKind::Unavailable, e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: DEFAULT_AUTH_ENDPOINT.to_string(),
        })
    }

    /// Use a different identity toolkit base URL, e.g. a local emulator.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    async fn call<B>(&self, method: &str, body: &B) -> Result<AccountResponse>
    where
        B: Serialize + std::fmt::Debug,
    {
        let url = format!("{}/{}", self.endpoint, method);
        debug!(method, "Identity toolkit call");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(transport_error);
        }

        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("HTTP {}", status.as_u16()),
        };
        Err(classify(&message, status.as_u16()))
    }

    async fn set_display_name(&self, id_token: &str, display_name: &str) -> Result<()> {
        let request = UpdateProfileRequest {
            id_token,
            display_name,
            return_secure_token: false,
        };
        let url = format!("{}/{}", self.endpoint, UPDATE);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthError::Other(format!("profile update failed: HTTP {}", status.as_u16())).into())
        }
    }
}

#[async_trait]
impl AuthProvider for RestAuth {
    #[instrument(skip_all)]
    async fn sign_up(
        &self,
        credentials: &Credentials,
        display_name: Option<&str>,
    ) -> Result<AuthSession> {
        let request = PasswordRequest {
            email: credentials.email(),
            password: credentials.password(),
            return_secure_token: true,
        };
        let mut account = self.call(SIGN_UP, &request).await?;

        if let Some(name) = display_name.map(str::trim).filter(|name| !name.is_empty()) {
            self.set_display_name(&account.id_token, name).await?;
            account.display_name = Some(name.to_string());
        }

        Ok(session_from(account, credentials.email()))
    }

    #[instrument(skip_all)]
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession> {
        let request = PasswordRequest {
            email: credentials.email(),
            password: credentials.password(),
            return_secure_token: true,
        };
        let account = self.call(SIGN_IN, &request).await?;
        Ok(session_from(account, credentials.email()))
    }
}

fn session_from(account: AccountResponse, fallback_email: &str) -> AuthSession {
    let email = account.email.unwrap_or_else(|| fallback_email.to_string());
    let display_name = account
        .display_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());

    let identity = Identity::new(account.local_id, display_name).with_email(email);
    AuthSession::new(identity, AccessToken::new(account.id_token))
}

/// Map an identity toolkit error code such as `EMAIL_EXISTS` or
/// `INVALID_PASSWORD : ...` onto an error.
fn classify(message: &str, status: u16) -> Error {
    let code = message.split([' ', ':']).next().unwrap_or(message);
    match code {
        "EMAIL_EXISTS" => AuthError::AccountExists(message.to_string()).into(),
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials(message.to_string()).into()
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            Error::remote(RemoteErrorKind::QuotaExceeded, message.to_string())
        }
        _ if status >= 500 => Error::remote(RemoteErrorKind::Unavailable, message.to_string()),
        _ => AuthError::Other(message.to_string()).into(),
    }
}
