//! Store URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

use super::StoragePath;
use crate::error::{Error, InvalidArgumentError};

/// A validated store location.
///
/// Three kinds of store are addressed this way:
///
/// - `file:///path/to/store` selects the filesystem-backed store, handy for
///   local use and tests.
/// - `memory://<name>` names an in-process [`MemoryStore`](crate::MemoryStore).
/// - `https://<db>.firebaseio.com` (or `http://localhost:<port>`) selects the
///   hosted realtime database reached over its REST API.
///
/// # Example
///
/// ```
/// use memoria_core::{StoragePath, StoreUrl};
///
/// let db = StoreUrl::new("https://memoria-default-rtdb.firebaseio.com").unwrap();
/// let path = StoragePath::new("users/u1/ideas").unwrap();
/// assert_eq!(
///     db.rest_url(&path),
///     "https://memoria-default-rtdb.firebaseio.com/users/u1/ideas.json"
/// );
///
/// let local = StoreUrl::new("file:///tmp/memoria").unwrap();
/// assert!(local.is_local());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoreUrl(Url);

impl StoreUrl {
    /// Create a store URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgumentError::StoreUrl`] if the URL does not parse,
    /// uses an unsupported scheme, or is plain HTTP to a non-local host.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidArgumentError::StoreUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        let normalized = if url.path() == "/" && url.scheme() != "file" {
            let mut u = url.clone();
            u.set_path("");
            u
        } else {
            url
        };

        Ok(Self(normalized))
    }

    /// The URL of the default in-process store, `memory://local`.
    pub(crate) fn local_memory() -> Self {
        Self(Url::parse("memory://local").expect("static memory URL parses"))
    }

    /// REST endpoint for a path: `{base}/{path}.json`.
    pub fn rest_url(&self, path: &StoragePath) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}.json", base, path.as_str())
    }

    /// Returns the URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the inner URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns the URL scheme.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Returns true for a filesystem store (`file://`).
    pub fn is_local(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Returns true for a hosted store (`http://` or `https://`).
    pub fn is_network(&self) -> bool {
        let scheme = self.0.scheme();
        scheme == "http" || scheme == "https"
    }

    /// Returns true for an in-process store (`memory://`).
    pub fn is_memory(&self) -> bool {
        self.0.scheme() == "memory"
    }

    /// Returns the directory for `file://` URLs, `None` otherwise.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.is_local() {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() && url.scheme() != "memory" {
            return Err(InvalidArgumentError::StoreUrl {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        let scheme = url.scheme();

        if scheme == "memory" {
            return Ok(());
        }

        if scheme == "file" {
            if url.path().is_empty() || url.path() == "/" {
                return Err(InvalidArgumentError::StoreUrl {
                    value: original.to_string(),
                    reason: "file:// URL must name a directory".to_string(),
                }
                .into());
            }
            return Ok(());
        }

        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        if scheme != "https" && !(scheme == "http" && is_localhost) {
            return Err(InvalidArgumentError::StoreUrl {
                value: original.to_string(),
                reason: "must use HTTPS (HTTP allowed only for localhost) or file://"
                    .to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidArgumentError::StoreUrl {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for StoreUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoreUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for StoreUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for StoreUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        StoreUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<str> for StoreUrl {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}
