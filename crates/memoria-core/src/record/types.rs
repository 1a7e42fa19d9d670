//! Record and snapshot types.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::{RecordId, StoragePath};

/// A record of a collection.
///
/// The id is the record's key in the store and is not part of the stored
/// value. Serialization flattens the fields next to `id`, matching how
/// records are shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    /// The key of this record in its collection.
    pub id: RecordId,

    /// The record's fields.
    #[serde(flatten)]
    pub fields: T,
}

impl<T> Record<T> {
    /// Create a record from an id and its fields.
    pub fn new(id: RecordId, fields: T) -> Self {
        Self { id, fields }
    }
}

/// Everything stored at a collection path at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StoragePath,
    entries: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Snapshot of an empty (or absent) collection.
    pub fn empty(path: StoragePath) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// Snapshot from the raw value at `path`.
    ///
    /// Anything other than a JSON object means the collection holds no records.
    pub fn from_value(path: StoragePath, value: Value) -> Self {
        let entries = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self { path, entries }
    }

    /// Snapshot from already-collected entries.
    pub fn from_entries(path: StoragePath, entries: BTreeMap<String, Value>) -> Self {
        Self { path, entries }
    }

    /// The collection path this snapshot belongs to.
    pub fn path(&self) -> &StoragePath {
        &self.path
    }

    /// Raw entries keyed by record id.
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    /// Returns the raw value of one record.
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.entries.get(id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the collection holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decode every entry into a typed record.
    ///
    /// Entries with an invalid key or a value that does not decode into `T`
    /// are skipped and logged.
    pub fn decode<T: DeserializeOwned>(&self) -> Vec<Record<T>> {
        self.entries
            .iter()
            .filter_map(|(key, value)| {
                let id = match RecordId::new(key.as_str()) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(path = %self.path, key = %key, error = %e, "Skipping entry with invalid key");
                        return None;
                    }
                };
                match serde_json::from_value::<T>(value.clone()) {
                    Ok(fields) => Some(Record::new(id, fields)),
                    Err(e) => {
                        warn!(path = %self.path, id = %id, error = %e, "Skipping undecodable record");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
    }

    fn path() -> StoragePath {
        StoragePath::new("commonNotes").unwrap()
    }

    #[test]
    fn record_serializes_flat() {
        let record = Record::new(
            RecordId::new("n1").unwrap(),
            Note {
                text: "hello".into(),
            },
        );
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"id": "n1", "text": "hello"})
        );
    }

    #[test]
    fn null_value_is_empty_snapshot() {
        let snapshot = Snapshot::from_value(path(), Value::Null);
        assert!(snapshot.is_empty());
        assert!(snapshot.decode::<Note>().is_empty());
    }

    #[test]
    fn decode_skips_bad_entries() {
        let snapshot = Snapshot::from_value(
            path(),
            json!({
                "a": {"text": "first"},
                "b": {"wrong": true},
                "c": 42
            }),
        );
        let records = snapshot.decode::<Note>();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "a");
        assert_eq!(records[0].fields.text, "first");
    }
}
