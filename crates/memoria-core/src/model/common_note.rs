use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Timestamped, timestamp};
use crate::identity::Identity;

/// A note shared with everyone.
///
/// The creator fields are filled in by the list binding when the note is
/// added; whatever the caller puts there is overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonNote {
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_uid: String,
    #[serde(default)]
    pub creator_display_name: String,
}

impl CommonNote {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
            updated_at: None,
            created_by_uid: String::new(),
            creator_display_name: String::new(),
        }
    }

    /// Only the creator may edit or delete a shared note.
    pub fn can_modify(&self, identity: &Identity) -> bool {
        !self.created_by_uid.is_empty() && self.created_by_uid == identity.user_id
    }

    /// True if the note changed after it was created.
    pub fn is_edited(&self) -> bool {
        self.updated_at.is_some_and(|t| t != self.created_at)
    }
}

impl Timestamped for CommonNote {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_creator_can_modify() {
        let mut note = CommonNote::new("hello");
        let alice = Identity::new("u1", "Alice");
        assert!(!note.can_modify(&alice));

        note.created_by_uid = "u1".into();
        assert!(note.can_modify(&alice));
        assert!(!note.can_modify(&Identity::new("u2", "Bob")));
    }

    #[test]
    fn edited_only_when_updated_later() {
        let mut note = CommonNote::new("hello");
        assert!(!note.is_edited());
        note.updated_at = Some(note.created_at);
        assert!(!note.is_edited());
        note.updated_at = Some(note.created_at + chrono::Duration::minutes(5));
        assert!(note.is_edited());
    }
}
