//! HTTP client for the database REST API.

use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use memoria_core::error::{Error, RemoteErrorKind};
use memoria_core::{AccessToken, Result, StoragePath, StoreUrl};

use crate::error::{status_error, transport_error};

/// HTTP client bound to one database.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    db: StoreUrl,
}

impl RestClient {
    /// Create a client for the database at `db`.
    pub fn new(db: StoreUrl) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("memoria/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::remote(RemoteErrorKind::Unavailable, e.to_string()))?;

        Ok(Self { client, db })
    }

    /// Returns the database URL.
    pub fn db(&self) -> &StoreUrl {
        &self.db
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &StoragePath,
        token: Option<&AccessToken>,
    ) -> reqwest::RequestBuilder {
        let url = self.db.rest_url(path);
        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.query(&[("auth", token.as_str())]);
        }
        request
    }

    /// Read the value at `path`; `null` when absent.
    #[instrument(skip(self, token), fields(db = %self.db))]
    pub async fn get(&self, path: &StoragePath, token: Option<&AccessToken>) -> Result<Value> {
        debug!("REST get");
        let response = self
            .request(reqwest::Method::GET, path, token)
            .send()
            .await
            .map_err(transport_error)?;

        let response = expect_success(response).await?;
        response.json().await.map_err(transport_error)
    }

    /// Replace the value at `path`.
    #[instrument(skip(self, value, token), fields(db = %self.db))]
    pub async fn put(
        &self,
        path: &StoragePath,
        value: &Value,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        debug!("REST put");
        let response = self
            .request(reqwest::Method::PUT, path, token)
            .query(&[("print", "silent")])
            .json(value)
            .send()
            .await
            .map_err(transport_error)?;

        expect_success(response).await.map(drop)
    }

    /// Merge the children of `body` into `path`. `null` children are deleted.
    #[instrument(skip(self, body, token), fields(db = %self.db))]
    pub async fn patch(
        &self,
        path: &StoragePath,
        body: &Value,
        token: Option<&AccessToken>,
    ) -> Result<()> {
        debug!("REST patch");
        trace!(%body, "patch body");
        let response = self
            .request(reqwest::Method::PATCH, path, token)
            .query(&[("print", "silent")])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        expect_success(response).await.map(drop)
    }

    /// Delete `path`.
    #[instrument(skip(self, token), fields(db = %self.db))]
    pub async fn delete(&self, path: &StoragePath, token: Option<&AccessToken>) -> Result<()> {
        debug!("REST delete");
        let response = self
            .request(reqwest::Method::DELETE, path, token)
            .send()
            .await
            .map_err(transport_error)?;

        expect_success(response).await.map(drop)
    }

    /// Open a server-sent event stream for `path`.
    pub(crate) async fn stream(
        &self,
        path: &StoragePath,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response> {
        debug!(db = %self.db, %path, "Opening event stream");
        let response = self
            .request(reqwest::Method::GET, path, token)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await
            .map_err(transport_error)?;

        expect_success(response).await
    }
}

async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    trace!(status = %status, "REST response");

    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let db = StoreUrl::new("https://memoria-default-rtdb.firebaseio.com").unwrap();
        let client = RestClient::new(db.clone()).unwrap();
        assert_eq!(client.db(), &db);
    }
}
