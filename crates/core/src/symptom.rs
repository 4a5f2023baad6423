//! The symptom value type.

use crate::TriageResult;
use serde::{Deserialize, Serialize};
use triage_types::{NonEmptyText, Severity};

/// A reported symptom.
///
/// Identity is the `id`: two symptoms with the same id are the same symptom regardless of name
/// or severity. Values are immutable once built; the `with_*` methods consume and return a new
/// value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symptom {
    id: NonEmptyText,
    name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
}

impl Symptom {
    /// # Errors
    ///
    /// Returns [`TriageError::Text`](crate::TriageError::Text) if `id` or `name` is blank.
    pub fn new(id: impl AsRef<str>, name: impl AsRef<str>) -> TriageResult<Self> {
        Ok(Self {
            id: NonEmptyText::new(id)?,
            name: NonEmptyText::new(name)?,
            description: None,
            severity: None,
            duration: None,
        })
    }

    /// # Errors
    ///
    /// Returns [`TriageError::Range`](crate::TriageError::Range) if `severity` exceeds 10.
    pub fn with_severity(self, severity: u8) -> TriageResult<Self> {
        Ok(Self {
            severity: Some(Severity::new(severity)?),
            ..self
        })
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..self
        }
    }

    pub fn with_duration(self, duration: impl Into<String>) -> Self {
        Self {
            duration: Some(duration.into()),
            ..self
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    /// Severity used for scoring: the reported value, or the scale midpoint when absent.
    pub fn effective_severity(&self) -> Severity {
        self.severity.unwrap_or(Severity::DEFAULT)
    }

    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    /// Case-insensitive substring match against the symptom name.
    pub fn name_contains(&self, token: &str) -> bool {
        self.name
            .as_str()
            .to_lowercase()
            .contains(&token.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriageError;

    #[test]
    fn test_new_rejects_blank_name() {
        let err = Symptom::new("s1", "   ").expect_err("blank name should be rejected");
        assert!(matches!(err, TriageError::Text(_)));
    }

    #[test]
    fn test_with_severity_rejects_out_of_range() {
        let err = Symptom::new("s1", "Headache")
            .unwrap()
            .with_severity(11)
            .expect_err("severity 11 should be rejected");
        assert!(matches!(err, TriageError::Range(_)));
    }

    #[test]
    fn test_effective_severity_defaults_to_midpoint() {
        let symptom = Symptom::new("s1", "Headache").unwrap();
        assert_eq!(symptom.effective_severity().value(), 5);

        let severe = symptom.with_severity(9).unwrap();
        assert_eq!(severe.effective_severity().value(), 9);
    }

    #[test]
    fn test_name_contains_is_case_insensitive() {
        let symptom = Symptom::new("s9", "Chest Pain").unwrap();
        assert!(symptom.name_contains("chest"));
        assert!(symptom.name_contains("PAIN"));
        assert!(!symptom.name_contains("breath"));
    }

    #[test]
    fn test_serializes_camel_case_and_skips_absent_fields() {
        let symptom = Symptom::new("s2", "Fever")
            .unwrap()
            .with_severity(6)
            .unwrap();
        let json = serde_json::to_value(&symptom).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "id": "s2", "name": "Fever", "severity": 6 })
        );
    }
}
