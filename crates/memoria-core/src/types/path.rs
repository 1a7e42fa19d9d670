//! Storage path and resource name types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{RecordId, validate_key};
use crate::error::{Error, InvalidArgumentError};

/// Root segment under which user-scoped resources live.
pub const USERS_ROOT: &str = "users";

/// A validated, slash-separated path in the store.
///
/// Leading and trailing slashes are stripped; every segment must be a valid key.
///
/// # Example
///
/// ```
/// use memoria_core::{RecordId, StoragePath};
///
/// let ideas = StoragePath::new("users/u1/ideas").unwrap();
/// let id = RecordId::new("abc").unwrap();
/// assert_eq!(ideas.child(&id).as_str(), "users/u1/ideas/abc");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoragePath(String);

impl StoragePath {
    /// Create a path from a string, validating every segment.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgumentError::Path`] for an empty path or a bad segment.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let original = s.as_ref();
        let trimmed = original.trim_matches('/');

        if trimmed.is_empty() {
            return Err(InvalidArgumentError::Path {
                value: original.to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        for segment in trimmed.split('/') {
            validate_key(segment).map_err(|reason| InvalidArgumentError::Path {
                value: original.to_string(),
                reason: format!("segment '{}' {}", segment, reason),
            })?;
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The user-scoped path `users/{user_id}/{resource}`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgumentError::Other`] unless `user_id` is a single
    /// valid key.
    pub fn user_scoped(user_id: &str, resource: &ResourceName) -> Result<Self, Error> {
        validate_key(user_id).map_err(|reason| InvalidArgumentError::Other {
            message: format!("user id '{}' {}", user_id, reason),
        })?;
        Ok(Self(format!("{}/{}/{}", USERS_ROOT, user_id, resource.as_str())))
    }

    /// The path of a record inside this collection.
    pub fn child(&self, id: &RecordId) -> Self {
        Self(format!("{}/{}", self.0, id.as_str()))
    }

    /// The parent path, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// The last segment.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Iterate over the segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Returns true if `other` is this path or lies below it.
    pub fn contains(&self, other: &StoragePath) -> bool {
        other.0 == self.0
            || (other.0.starts_with(&self.0) && other.0.as_bytes().get(self.0.len()) == Some(&b'/'))
    }

    /// Returns true if this path or `other` contains the other one.
    pub fn overlaps(&self, other: &StoragePath) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The owning user id if this is a `users/{uid}/...` path.
    pub fn owner(&self) -> Option<&str> {
        let mut segments = self.segments();
        match (segments.next(), segments.next()) {
            (Some(USERS_ROOT), Some(uid)) => Some(uid),
            _ => None,
        }
    }

    /// Returns the path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoragePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for StoragePath {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<StoragePath> for String {
    fn from(path: StoragePath) -> Self {
        path.0
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated logical resource name such as `ideas` or `commonNotes`.
///
/// May span several segments (`diary/notes`); each must be a valid key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a resource name, validating it as a relative path.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let path = StoragePath::new(s)?;
        Ok(Self(path.0))
    }

    /// Returns the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path of this resource at the store root.
    pub fn to_root_path(&self) -> StoragePath {
        StoragePath(self.0.clone())
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_surrounding_slashes() {
        let path = StoragePath::new("/commonNotes/").unwrap();
        assert_eq!(path.as_str(), "commonNotes");
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(StoragePath::new("users//ideas").is_err());
        assert!(StoragePath::new("").is_err());
        assert!(StoragePath::new("/").is_err());
    }

    #[test]
    fn rejects_reserved_characters() {
        assert!(StoragePath::new("users/a.b/ideas").is_err());
    }

    #[test]
    fn user_scoped_layout() {
        let resource = ResourceName::new("ideas").unwrap();
        let path = StoragePath::user_scoped("u1", &resource).unwrap();
        assert_eq!(path.as_str(), "users/u1/ideas");
        assert_eq!(path.owner(), Some("u1"));
    }

    #[test]
    fn user_id_must_be_one_segment() {
        let ideas = ResourceName::new("ideas").unwrap();
        let nested = ResourceName::new("notes/ideas").unwrap();

        assert!(StoragePath::user_scoped("u1/notes", &ideas).is_err());
        assert!(StoragePath::user_scoped("", &ideas).is_err());
        assert!(StoragePath::user_scoped("u.1", &ideas).is_err());
        assert_eq!(
            StoragePath::user_scoped("u1", &nested).unwrap().owner(),
            Some("u1")
        );
    }

    #[test]
    fn parent_and_last_segment() {
        let path = StoragePath::new("users/u1/ideas/abc").unwrap();
        assert_eq!(path.last_segment(), "abc");
        assert_eq!(path.parent().unwrap().as_str(), "users/u1/ideas");
        assert!(StoragePath::new("ideas").unwrap().parent().is_none());
    }

    #[test]
    fn contains_respects_segment_boundaries() {
        let ideas = StoragePath::new("users/u1/ideas").unwrap();
        assert!(ideas.contains(&StoragePath::new("users/u1/ideas/x").unwrap()));
        assert!(ideas.contains(&ideas));
        assert!(!ideas.contains(&StoragePath::new("users/u1/ideasArchive").unwrap()));
        assert!(ideas.overlaps(&StoragePath::new("users/u1").unwrap()));
    }

    #[test]
    fn global_paths_have_no_owner() {
        assert_eq!(StoragePath::new("commonNotes").unwrap().owner(), None);
    }
}
