//! Partial updates.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{Error, InvalidArgumentError};
use crate::types::validate_key;

/// What a partial update does to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Write this value. `Set(Value::Null)` stores an explicit null where the
    /// backend can hold one.
    Set(Value),
    /// Delete the field.
    Remove,
}

/// A partial update: fields not named here are left untouched.
///
/// # Example
///
/// ```
/// use memoria_core::{FieldPatch, FieldUpdate};
/// use serde_json::json;
///
/// let patch = FieldPatch::new()
///     .set("status", "done")
///     .remove("customName");
///
/// let mut record = json!({"status": "pending", "customName": "Gran", "text": "x"});
/// patch.apply_to(record.as_object_mut().unwrap());
/// assert_eq!(record, json!({"status": "done", "text": "x"}));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    fields: BTreeMap<String, FieldUpdate>,
}

impl FieldPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields
            .insert(field.into(), FieldUpdate::Set(value.into()));
        self
    }

    /// Remove a field.
    pub fn remove(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into(), FieldUpdate::Remove);
        self
    }

    /// Insert an update for a field, replacing any earlier one.
    pub fn insert(&mut self, field: impl Into<String>, update: FieldUpdate) {
        self.fields.insert(field.into(), update);
    }

    /// Returns the update for a field.
    pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
        self.fields.get(field)
    }

    /// True if the patch names this field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterate over the field updates.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldUpdate)> {
        self.fields.iter()
    }

    /// Number of fields touched.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the patch touches nothing.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every field name against the store's key rules.
    pub fn validate(&self) -> Result<(), Error> {
        for field in self.fields.keys() {
            validate_key(field).map_err(|reason| InvalidArgumentError::Other {
                message: format!("invalid field name '{}': {}", field, reason),
            })?;
        }
        Ok(())
    }

    /// Merge this patch into a record's fields.
    pub fn apply_to(&self, target: &mut Map<String, Value>) {
        for (field, update) in &self.fields {
            match update {
                FieldUpdate::Set(value) => {
                    target.insert(field.clone(), value.clone());
                }
                FieldUpdate::Remove => {
                    target.remove(field);
                }
            }
        }
    }

    /// Encode as a REST merge body, where `null` deletes a field.
    ///
    /// # Errors
    ///
    /// `Set(Value::Null)` has no encoding in that format and is rejected.
    pub fn to_merge_body(&self) -> Result<Value, Error> {
        let mut body = Map::new();
        for (field, update) in &self.fields {
            let value = match update {
                FieldUpdate::Set(Value::Null) => {
                    return Err(InvalidArgumentError::Other {
                        message: format!(
                            "field '{}' cannot be set to null; use FieldUpdate::Remove",
                            field
                        ),
                    }
                    .into());
                }
                FieldUpdate::Set(value) => value.clone(),
                FieldUpdate::Remove => Value::Null,
            };
            body.insert(field.clone(), value);
        }
        Ok(Value::Object(body))
    }
}

impl FromIterator<(String, FieldUpdate)> for FieldPatch {
    fn from_iter<I: IntoIterator<Item = (String, FieldUpdate)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_null_and_remove_are_distinct() {
        let patch = FieldPatch::new().set("a", Value::Null).remove("b");
        let mut target = json!({"a": 1, "b": 2, "c": 3});
        patch.apply_to(target.as_object_mut().unwrap());
        assert_eq!(target, json!({"a": null, "c": 3}));
    }

    #[test]
    fn merge_body_encodes_remove_as_null() {
        let patch = FieldPatch::new().set("status", "done").remove("customName");
        assert_eq!(
            patch.to_merge_body().unwrap(),
            json!({"status": "done", "customName": null})
        );
    }

    #[test]
    fn merge_body_rejects_explicit_null() {
        let patch = FieldPatch::new().set("customName", Value::Null);
        assert!(matches!(
            patch.to_merge_body(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn later_update_for_same_field_wins() {
        let patch = FieldPatch::new().set("x", 1).remove("x");
        assert_eq!(patch.get("x"), Some(&FieldUpdate::Remove));
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn validate_rejects_bad_field_names() {
        assert!(FieldPatch::new().set("a.b", 1).validate().is_err());
        assert!(FieldPatch::new().set("", 1).validate().is_err());
        assert!(FieldPatch::new().set("status", 1).validate().is_ok());
    }
}
