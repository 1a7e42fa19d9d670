use serde::{Deserialize, Serialize};

/// Someone the diary notes are about.
///
/// `custom_name` is a nickname shown instead of the real name; it is cleared
/// by removing the field rather than writing an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub real_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
}

impl FamilyMember {
    pub fn new(real_name: impl Into<String>) -> Self {
        Self {
            real_name: real_name.into(),
            custom_name: None,
            avatar_url: String::new(),
        }
    }

    /// The nickname if set, the real name otherwise.
    pub fn display_name(&self) -> &str {
        match self.custom_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.real_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_name_prefers_nickname() {
        let mut member = FamilyMember::new("Margaret");
        assert_eq!(member.display_name(), "Margaret");
        member.custom_name = Some("Gran".into());
        assert_eq!(member.display_name(), "Gran");
    }

    #[test]
    fn null_custom_name_reads_as_none() {
        let member: FamilyMember =
            serde_json::from_value(json!({"realName": "Tom", "customName": null})).unwrap();
        assert_eq!(member.custom_name, None);
        assert!(serde_json::to_value(&member).unwrap().get("customName").is_none());
    }
}
