//! Validated primitive types shared across the triage workspace.
//!
//! Each type here guarantees its invariant once constructed, so the engine never has to
//! re-check a prompt for emptiness or a severity for range after loading.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors that can occur when creating bounded numeric types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RangeError {
    #[error("severity must be between 0 and {max}, got {value}")]
    Severity { value: u8, max: u8 },
    #[error("weight must be a finite number between 0 and 1, got {0}")]
    Weight(f64),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Patient-reported symptom severity on a 0–10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(u8);

impl Severity {
    pub const MAX: u8 = 10;

    /// Severity assumed for a symptom reported without one.
    pub const DEFAULT: Severity = Severity(5);

    pub fn new(value: u8) -> Result<Self, RangeError> {
        if value > Self::MAX {
            return Err(RangeError::Severity {
                value,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl serde::Serialize for Severity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Severity::new(value).map_err(serde::de::Error::custom)
    }
}

/// Relative weight of an answer option, within `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Weight(f64);

impl Weight {
    pub fn new(value: f64) -> Result<Self, RangeError> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(RangeError::Weight(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Weight {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Weight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Weight::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Headache  ").unwrap();
        assert_eq!(text.as_str(), "Headache");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        let err = NonEmptyText::new(" \t ").expect_err("whitespace should be rejected");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_empty() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_severity_bounds() {
        assert_eq!(Severity::new(0).unwrap().value(), 0);
        assert_eq!(Severity::new(10).unwrap().value(), 10);
        assert_eq!(
            Severity::new(11),
            Err(RangeError::Severity { value: 11, max: 10 })
        );
    }

    #[test]
    fn test_severity_deserialize_rejects_out_of_range() {
        let ok: Severity = serde_json::from_str("8").unwrap();
        assert_eq!(ok.value(), 8);

        let err = serde_json::from_str::<Severity>("12").expect_err("12 is out of range");
        assert!(err.to_string().contains("between 0 and 10"));
    }

    #[test]
    fn test_weight_rejects_out_of_range_and_nan() {
        assert!(Weight::new(0.0).is_ok());
        assert!(Weight::new(1.0).is_ok());
        assert!(Weight::new(1.01).is_err());
        assert!(Weight::new(-0.1).is_err());
        assert!(Weight::new(f64::NAN).is_err());
    }
}
