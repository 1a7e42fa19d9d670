//! Store implementation over the REST API.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use memoria_core::{AccessToken, FieldPatch, Result, StoragePath, Store, StoreUrl};

use crate::client::RestClient;
use crate::subscription::RestSubscription;

/// A hosted realtime database.
///
/// Without a token every request is anonymous, which the database's security
/// rules normally reject.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: RestClient,
    token: Option<AccessToken>,
}

impl RestStore {
    /// Connect to the database at `db`.
    pub fn new(db: StoreUrl) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(db)?,
            token: None,
        })
    }

    /// Authenticate every request with `token`.
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &RestClient {
        &self.client
    }
}

#[async_trait]
impl Store for RestStore {
    type Subscription = RestSubscription;

    fn url(&self) -> &StoreUrl {
        self.client.db()
    }

    fn subscribe(&self, path: &StoragePath) -> Result<Self::Subscription> {
        Ok(RestSubscription::new(
            self.client.clone(),
            path.clone(),
            self.token.clone(),
        ))
    }

    #[instrument(skip(self, value))]
    async fn set(&self, path: &StoragePath, value: &Value) -> Result<()> {
        self.client.put(path, value, self.token.as_ref()).await
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, path: &StoragePath, patch: &FieldPatch) -> Result<()> {
        let body = patch.to_merge_body()?;
        self.client.patch(path, &body, self.token.as_ref()).await
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &StoragePath) -> Result<()> {
        self.client.delete(path, self.token.as_ref()).await
    }
}
