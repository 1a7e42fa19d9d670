use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Timestamped, timestamp};
use crate::record::Record;

/// A diary entry about one family member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryNote {
    pub family_member_id: String,
    pub note_text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl DiaryNote {
    pub fn new(family_member_id: impl Into<String>, note_text: impl Into<String>) -> Self {
        Self {
            family_member_id: family_member_id.into(),
            note_text: note_text.into(),
            created_at: Utc::now(),
        }
    }

    /// The notes in `items` about `family_member_id`.
    pub fn about<'a>(
        items: &'a [Record<DiaryNote>],
        family_member_id: &'a str,
    ) -> impl Iterator<Item = &'a Record<DiaryNote>> {
        items
            .iter()
            .filter(move |r| r.fields.family_member_id == family_member_id)
    }
}

impl Timestamped for DiaryNote {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    #[test]
    fn notes_about_one_member() {
        let items = vec![
            Record::new(RecordId::new("n1").unwrap(), DiaryNote::new("m1", "first steps")),
            Record::new(RecordId::new("n2").unwrap(), DiaryNote::new("m2", "lost a tooth")),
            Record::new(RecordId::new("n3").unwrap(), DiaryNote::new("m1", "said hello")),
        ];
        let ids: Vec<_> = DiaryNote::about(&items, "m1").map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["n1", "n3"]);
    }
}
