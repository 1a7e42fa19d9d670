//! Record id type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::{Error, InvalidArgumentError};

/// Longest key the store accepts, in bytes.
const MAX_KEY_LEN: usize = 768;

/// Characters the store reserves in keys.
const RESERVED: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Check a single key (record id or path segment) against the store's rules.
pub(crate) fn validate_key(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("cannot be empty".to_string());
    }

    if s.len() > MAX_KEY_LEN {
        return Err(format!("exceeds maximum length of {} bytes", MAX_KEY_LEN));
    }

    for c in s.chars() {
        if RESERVED.contains(&c) {
            return Err(format!("contains reserved character '{}'", c));
        }
        if c.is_ascii_control() {
            return Err("contains a control character".to_string());
        }
    }

    Ok(())
}

/// A validated record id.
///
/// Ids are assigned by the client when a record is created and never change.
///
/// # Example
///
/// ```
/// use memoria_core::RecordId;
///
/// let id = RecordId::new("2f1c0a9e-5d1b-4e0f-9a55-0c6a3d7f1b22").unwrap();
/// assert_eq!(id.as_str(), "2f1c0a9e-5d1b-4e0f-9a55-0c6a3d7f1b22");
///
/// assert!(RecordId::new("").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgumentError::RecordId`] if the id is empty or
    /// contains characters the store does not allow in keys.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        validate_key(&s).map_err(|reason| InvalidArgumentError::RecordId {
            value: s.clone(),
            reason,
        })?;
        Ok(Self(s))
    }

    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
