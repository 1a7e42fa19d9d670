//! Record types for the Memoria features.
//!
//! Each feature is one collection. Field names on the wire are camelCase
//! and timestamps are RFC 3339 strings in UTC.

mod common_note;
mod diary;
mod family;
mod idea;
mod reminder;
mod timestamp;

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{Error, InvalidArgumentError};
use crate::record::Record;
use crate::resolver::PathMode;

pub use common_note::CommonNote;
pub use diary::DiaryNote;
pub use family::FamilyMember;
pub use idea::{Idea, IdeaFilter, IdeaStatus};
pub use reminder::{Reminder, ReminderFilter, ReminderStatus, sort_by_due};

/// A Memoria feature and the collection backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Ideas,
    FamilyMembers,
    DiaryNotes,
    CommonNotes,
    Reminders,
}

impl Feature {
    /// Every feature.
    pub const ALL: [Feature; 5] = [
        Feature::Ideas,
        Feature::FamilyMembers,
        Feature::DiaryNotes,
        Feature::CommonNotes,
        Feature::Reminders,
    ];

    /// Resource name of the collection.
    pub fn resource(self) -> &'static str {
        match self {
            Feature::Ideas => "ideas",
            Feature::FamilyMembers => "familyMembers",
            Feature::DiaryNotes => "diaryNotes",
            Feature::CommonNotes => "commonNotes",
            Feature::Reminders => "reminders",
        }
    }

    /// Whether the collection is private to each user or shared.
    pub fn mode(self) -> PathMode {
        match self {
            Feature::CommonNotes => PathMode::GlobalRoot,
            _ => PathMode::UserScoped,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

impl FromStr for Feature {
    type Err = Error;

    /// Accepts the resource name or a kebab-case alias (`family-members`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        Feature::ALL
            .into_iter()
            .find(|feature| feature.resource().to_lowercase() == normalized)
            .ok_or_else(|| {
                InvalidArgumentError::Other {
                    message: format!("unknown feature '{s}'"),
                }
                .into()
            })
    }
}

/// Display order by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            _ => Err(InvalidArgumentError::Other {
                message: format!("unknown sort order '{s}', expected newest or oldest"),
            }
            .into()),
        }
    }
}

/// Records that carry a creation time.
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

/// Sort records by creation time. Ties keep their id order.
pub fn sort_by_created<T: Timestamped>(items: &mut [Record<T>], order: SortOrder) {
    items.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    match order {
        SortOrder::Newest => items.sort_by_key(|r| Reverse(r.fields.created_at())),
        SortOrder::Oldest => items.sort_by_key(|r| r.fields.created_at()),
    }
}
