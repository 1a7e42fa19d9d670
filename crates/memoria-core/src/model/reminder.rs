use std::cmp::Reverse;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Timestamped, timestamp};
use crate::error::{Error, InvalidArgumentError};
use crate::record::Record;

/// A dated reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub text: String,
    /// Start of the due day, in UTC.
    #[serde(with = "timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub is_complete: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    /// An open reminder due on `due`.
    pub fn new(text: impl Into<String>, due: NaiveDate) -> Self {
        Self {
            text: text.into(),
            due_date: due.and_time(chrono::NaiveTime::MIN).and_utc(),
            is_complete: false,
            created_at: Utc::now(),
        }
    }

    /// Open and due before the day of `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_complete && self.due_date.date_naive() < now.date_naive()
    }

    /// Open and due on `day`.
    pub fn is_due_on(&self, day: NaiveDate) -> bool {
        !self.is_complete && self.due_date.date_naive() == day
    }
}

impl Timestamped for Reminder {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Which reminders to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderStatus {
    Pending,
    Completed,
    /// Pending and past its due day.
    Overdue,
}

impl FromStr for ReminderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(ReminderStatus::Pending),
            "completed" | "complete" | "done" => Ok(ReminderStatus::Completed),
            "overdue" => Ok(ReminderStatus::Overdue),
            _ => Err(InvalidArgumentError::Other {
                message: format!(
                    "unknown reminder status '{s}', expected pending, completed or overdue"
                ),
            }
            .into()),
        }
    }
}

/// Narrows a list of reminders. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderFilter {
    pub status: Option<ReminderStatus>,
    /// Open reminders due on this day.
    pub due_on: Option<NaiveDate>,
    /// Case-insensitive substring of the text.
    pub search: Option<String>,
}

impl ReminderFilter {
    pub fn matches(&self, reminder: &Reminder, now: DateTime<Utc>) -> bool {
        let status = match self.status {
            None => true,
            Some(ReminderStatus::Pending) => !reminder.is_complete,
            Some(ReminderStatus::Completed) => reminder.is_complete,
            Some(ReminderStatus::Overdue) => reminder.is_overdue(now),
        };
        if !status {
            return false;
        }
        if self.due_on.is_some_and(|day| !reminder.is_due_on(day)) {
            return false;
        }
        match &self.search {
            Some(term) if !term.trim().is_empty() => reminder
                .text
                .to_lowercase()
                .contains(&term.trim().to_lowercase()),
            _ => true,
        }
    }
}

/// Sort reminders by due day, soonest first unless `latest_first`. Ties
/// keep their id order.
pub fn sort_by_due(items: &mut [Record<Reminder>], latest_first: bool) {
    items.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    if latest_first {
        items.sort_by_key(|r| Reverse(r.fields.due_date));
    } else {
        items.sort_by_key(|r| r.fields.due_date);
    }
}
