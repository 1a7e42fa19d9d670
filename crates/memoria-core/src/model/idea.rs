use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Timestamped, timestamp};
use crate::error::{Error, InvalidArgumentError};

/// Whether an idea has been acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
    #[default]
    Pending,
    Done,
}

impl FromStr for IdeaStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(IdeaStatus::Pending),
            "done" => Ok(IdeaStatus::Done),
            _ => Err(InvalidArgumentError::Other {
                message: format!("unknown idea status '{s}', expected pending or done"),
            }
            .into()),
        }
    }
}

/// A private idea, filed under a free-text category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: IdeaStatus,
    #[serde(default)]
    pub category: String,
}

impl Idea {
    /// A pending idea created now.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
            status: IdeaStatus::Pending,
            category: category.into(),
        }
    }
}

impl Timestamped for Idea {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Narrows a list of ideas. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaFilter {
    pub status: Option<IdeaStatus>,
    pub category: Option<String>,
    /// Case-insensitive substring of the text or category.
    pub search: Option<String>,
}

impl IdeaFilter {
    pub fn matches(&self, idea: &Idea) -> bool {
        if self.status.is_some_and(|status| status != idea.status) {
            return false;
        }
        if let Some(category) = &self.category
            && !idea.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        match &self.search {
            Some(term) if !term.trim().is_empty() => {
                let term = term.trim().to_lowercase();
                idea.text.to_lowercase().contains(&term)
                    || idea.category.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_is_camel_case() {
        let idea: Idea = serde_json::from_value(json!({
            "text": "garden",
            "createdAt": "2024-05-01T09:30:00.000Z",
            "status": "done",
            "category": "Home"
        }))
        .unwrap();
        assert_eq!(idea.status, IdeaStatus::Done);

        let value = serde_json::to_value(&idea).unwrap();
        assert_eq!(value["createdAt"], "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn filter_by_status_category_and_text() {
        let mut done = Idea::new("Paint the fence", "Home");
        done.status = IdeaStatus::Done;
        let pending = Idea::new("Call the bank", "Errands");

        let filter = IdeaFilter {
            status: Some(IdeaStatus::Pending),
            ..Default::default()
        };
        assert!(filter.matches(&pending));
        assert!(!filter.matches(&done));

        let filter = IdeaFilter {
            category: Some("home".into()),
            ..Default::default()
        };
        assert!(filter.matches(&done));

        let filter = IdeaFilter {
            search: Some("BANK".into()),
            ..Default::default()
        };
        assert!(filter.matches(&pending));
        assert!(!filter.matches(&done));
    }
}
