//! Internal implementation of UUID services.
//!
//! This module contains the implementation details for canonical UUIDs and the
//! timestamp-prefixed identifiers used for reports.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical UUID representation (32 lowercase hex characters, no hyphens).
///
/// This wrapper type guarantees that once constructed, the contained UUID is in canonical
/// format, so identifiers round-trip unchanged through CLI arguments, URLs and JSON.
///
/// # Construction
/// - [`UuidService::new`] generates a new canonical UUID (for new sessions).
/// - [`UuidService::parse`] validates an externally supplied identifier.
///
/// # Errors
/// [`UuidService::parse`] returns [`UuidError::InvalidInput`] if the input is not already
/// canonical.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UuidService(Uuid);

impl Default for UuidService {
    fn default() -> Self {
        Self::new()
    }
}

impl UuidService {
    /// Generates a new random (v4) UUID in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses a UUID string that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example, hyphenated or uppercase).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid UUID '{}': {}", input, e)))
    }

    /// Returns a copy of the inner `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical UUID form.
    ///
    /// This is a purely syntactic check: exactly 32 bytes, only `0-9` and `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for UuidService {
    /// Formats the UUID in canonical form (32 lowercase hex characters, no hyphens).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for UuidService {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UuidService::parse(s)
    }
}

/// A time-prefixed unique identifier.
///
/// Format:
/// `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Example:
/// `20260111T143522.045Z-550e8400e29b41d4a716446655440000`
///
/// Ordering compares the timestamp first, so a list of identifiers sorts by creation time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimestampUuid {
    timestamp: DateTime<Utc>,
    uuid: UuidService,
}

impl TimestampUuid {
    /// Generate a new identifier.
    ///
    /// The timestamp is truncated to the millisecond, the precision of the string form. If
    /// `last` is provided, the timestamp is guaranteed to be strictly greater than the last one
    /// (by at least 1 ms).
    pub fn generate(last: Option<&TimestampUuid>) -> Self {
        let now = Utc::now().trunc_subsecs(3);

        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: UuidService::new(),
        }
    }

    /// Returns the timestamp component.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the UUID component.
    pub fn uuid(&self) -> &UuidService {
        &self.uuid
    }
}

impl FromStr for TimestampUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s.split_once('-').ok_or_else(|| {
            UuidError::InvalidInput(format!("Invalid timestamp UID format: '{}'", s))
        })?;

        let ts_no_z = ts_str.strip_suffix('Z').ok_or_else(|| {
            UuidError::InvalidInput(format!("Timestamp must end with 'Z': '{}'", ts_str))
        })?;

        let naive =
            chrono::NaiveDateTime::parse_from_str(ts_no_z, "%Y%m%dT%H%M%S%.3f").map_err(|e| {
                UuidError::InvalidInput(format!("Invalid timestamp format '{}': {}", ts_str, e))
            })?;

        let timestamp = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
        let uuid = UuidService::parse(uuid_str)?;

        Ok(Self { timestamp, uuid })
    }
}

impl fmt::Display for TimestampUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.timestamp.format("%Y%m%dT%H%M%S%.3fZ"),
            self.uuid
        )
    }
}

/// Hands out [`TimestampUuid`]s that are strictly increasing for this generator.
#[derive(Clone, Debug, Default)]
pub struct TimestampUuidGenerator {
    last: Option<TimestampUuid>,
}

impl TimestampUuidGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next identifier, later than every identifier this generator returned before.
    pub fn next_id(&mut self) -> TimestampUuid {
        let id = TimestampUuid::generate(self.last.as_ref());
        self.last = Some(id.clone());
        id
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{TimestampUuid, UuidService};
    use std::str::FromStr;

    impl serde::Serialize for UuidService {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> serde::Deserialize<'de> for UuidService {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            UuidService::parse(&s).map_err(serde::de::Error::custom)
        }
    }

    impl serde::Serialize for TimestampUuid {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> serde::Deserialize<'de> for TimestampUuid {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            TimestampUuid::from_str(&s).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_valid_uuid() {
        let canonical = UuidService::new().to_string();

        assert_eq!(canonical.len(), 32);
        assert!(UuidService::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let canonical = "550e8400e29b41d4a716446655440000";
        let parsed = UuidService::parse(canonical).expect("canonical UUID should parse");

        assert_eq!(parsed.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let result = UuidService::parse("550e8400-e29b-41d4-a716-446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_is_canonical_invalid() {
        assert!(!UuidService::is_canonical(
            "550E8400E29B41D4A716446655440000"
        ));
        assert!(!UuidService::is_canonical(
            "550e8400e29b41d4a71644665544000"
        ));
        assert!(!UuidService::is_canonical(
            "550e8400e29b41d4a716446655440zzz"
        ));
        assert!(!UuidService::is_canonical(""));
    }

    #[test]
    fn test_timestamp_uid_generate_monotonic_same_instant() {
        let uid1 = TimestampUuid::generate(None);
        let uid2 = TimestampUuid::generate(Some(&uid1));

        assert!(uid2.timestamp() > uid1.timestamp());
        assert!(uid2 > uid1);
    }

    #[test]
    fn test_generator_ids_are_strictly_increasing_and_distinct() {
        let mut generator = TimestampUuidGenerator::new();
        let ids: Vec<TimestampUuid> = (0..50).map(|_| generator.next_id()).collect();

        for pair in ids.windows(2) {
            assert!(pair[1].timestamp() > pair[0].timestamp());
            assert_ne!(pair[1].uuid(), pair[0].uuid());
        }
    }

    #[test]
    fn test_timestamp_uid_round_trip() {
        let original_str = "20260111T143522.045Z-550e8400e29b41d4a716446655440000";
        let original = TimestampUuid::from_str(original_str).unwrap();
        let as_string = original.to_string();

        assert_eq!(as_string, original_str);
        assert_eq!(TimestampUuid::from_str(&as_string).unwrap(), original);
    }

    #[test]
    fn test_timestamp_uid_parse_missing_z_suffix() {
        let result = TimestampUuid::from_str("20260111T143522.045-550e8400e29b41d4a716446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("must end with 'Z'")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_timestamp_uid_parse_invalid_timestamp() {
        let result = TimestampUuid::from_str("20260199T143522.045Z-550e8400e29b41d4a716446655440000");

        match result {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("Invalid timestamp format")),
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_generated_id_survives_string_round_trip() {
        let id = TimestampUuid::generate(None);
        let parsed = TimestampUuid::from_str(&id.to_string()).unwrap();

        assert_eq!(parsed, id);
    }

    #[test]
    fn test_serde_uses_display_form() {
        let id = TimestampUuid::from_str("20260111T143522.045Z-550e8400e29b41d4a716446655440000")
            .unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"20260111T143522.045Z-550e8400e29b41d4a716446655440000\"");
        let back: TimestampUuid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
