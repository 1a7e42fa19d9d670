//! Storage path resolution.
//!
//! A list binding is configured with a logical resource name and a
//! [`PathMode`]. The concrete path it subscribes to depends on who is signed
//! in, so it is recomputed every time the [`AuthState`] changes.

use crate::error::{ConfigurationError, Error};
use crate::identity::AuthState;
use crate::types::{ResourceName, StoragePath};

/// Where a resource's records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathMode {
    /// Under `users/{userId}/{resource}`; nobody else can reach them.
    #[default]
    UserScoped,
    /// At `{resource}`, shared by everyone; each record carries its creator.
    GlobalRoot,
}

/// Outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The identity is still loading; nothing may be read or written.
    Pending,
    /// Nobody is signed in, or there is nothing to subscribe to.
    Unauthenticated,
    /// The path to use.
    Ready(StoragePath),
}

impl Resolution {
    /// The resolved path, if any.
    pub fn path(&self) -> Option<&StoragePath> {
        match self {
            Resolution::Ready(path) => Some(path),
            _ => None,
        }
    }
}

/// Computes storage paths for one resource in one mode.
///
/// # Example
///
/// ```
/// use memoria_core::{AuthState, Identity, PathMode, PathResolver, Resolution};
///
/// let resolver = PathResolver::new("ideas", PathMode::UserScoped).unwrap();
///
/// assert_eq!(resolver.resolve(&AuthState::loading()).unwrap(), Resolution::Pending);
///
/// let auth = AuthState::signed_in(Identity::new("u1", "Alice"));
/// let path = resolver.resolve(&auth).unwrap();
/// assert_eq!(path.path().unwrap().as_str(), "users/u1/ideas");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    resource: Option<ResourceName>,
    mode: PathMode,
}

impl PathResolver {
    /// Create a resolver.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::EmptyResource`] for an empty name in
    /// [`PathMode::UserScoped`], [`ConfigurationError::InvalidResource`] for a
    /// name that is not a valid path. An empty name in [`PathMode::GlobalRoot`]
    /// is accepted and never resolves to a path.
    pub fn new(resource: &str, mode: PathMode) -> Result<Self, Error> {
        let trimmed = resource.trim_matches('/');

        if trimmed.is_empty() {
            return match mode {
                PathMode::UserScoped => Err(ConfigurationError::EmptyResource.into()),
                PathMode::GlobalRoot => Ok(Self {
                    resource: None,
                    mode,
                }),
            };
        }

        let resource = ResourceName::new(trimmed).map_err(|e| {
            Error::Configuration(ConfigurationError::InvalidResource {
                value: resource.to_string(),
                reason: e.to_string(),
            })
        })?;

        Ok(Self {
            resource: Some(resource),
            mode,
        })
    }

    /// The configured mode.
    pub fn mode(&self) -> PathMode {
        self.mode
    }

    /// The configured resource name, `None` when empty.
    pub fn resource(&self) -> Option<&ResourceName> {
        self.resource.as_ref()
    }

    /// Resolve against the current auth state.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidArgument` when a user-scoped path is requested for a
    /// user id that is not a valid path segment.
    pub fn resolve(&self, auth: &AuthState) -> Result<Resolution, Error> {
        if auth.loading {
            return Ok(Resolution::Pending);
        }

        let Some(identity) = &auth.identity else {
            return Ok(Resolution::Unauthenticated);
        };

        let Some(resource) = &self.resource else {
            return Ok(Resolution::Unauthenticated);
        };

        let path = match self.mode {
            PathMode::UserScoped => StoragePath::user_scoped(&identity.user_id, resource)?,
            PathMode::GlobalRoot => resource.to_root_path(),
        };

        Ok(Resolution::Ready(path))
    }
}
