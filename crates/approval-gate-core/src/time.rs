// crates/approval-gate-core/src/time.rs
// ============================================================================
// Module: Approval Gate Time Model
// Description: Canonical timestamp representation for approval records.
// Purpose: Provide deterministic, replayable, ISO-8601 timestamps.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Approval Gate represents every durable timestamp as an ISO-8601 string in
//! UTC, matching the wire format required by `§6 Persistent state layout`.
//! Callers supply the evaluation instant explicitly to state-machine
//! operations; nothing in this module reads the wall clock on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical UTC timestamp used throughout approval and chain records.
///
/// # Invariants
/// - Always serializes as an RFC 3339 string with a `Z` offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(#[serde(with = "rfc3339")] OffsetDateTime);

impl Timestamp {
    /// Wraps an [`OffsetDateTime`] as a canonical timestamp.
    #[must_use]
    pub const fn new(value: OffsetDateTime) -> Self {
        Self(value)
    }

    /// Returns the current wall-clock time.
    ///
    /// This is the single sanctioned source of "now" for the store and HTTP
    /// layers; the core state-machine functions always take `now` as an
    /// explicit parameter instead.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Returns the timestamp shifted forward by the given number of seconds.
    #[must_use]
    pub const fn plus_seconds(self, seconds: i64) -> Self {
        Self(self.0.saturating_add(time::Duration::seconds(seconds)))
    }

    /// Returns the wrapped [`OffsetDateTime`].
    #[must_use]
    pub const fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Formats the timestamp as an RFC 3339 string.
    ///
    /// # Panics
    ///
    /// Panics only if the underlying `time` formatting fails, which does not
    /// happen for valid `OffsetDateTime` values produced by this module.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        #[allow(clippy::unwrap_used, reason = "OffsetDateTime -> Rfc3339 cannot fail for values produced by this module")]
        self.0.format(&Rfc3339).unwrap()
    }

    /// Parses an RFC 3339 string into a timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error when `value` is not a valid RFC 3339 timestamp.
    pub fn parse(value: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(value, &Rfc3339).map(Self)
    }
}

impl PartialEq<Timestamp> for &Timestamp {
    fn eq(&self, other: &Timestamp) -> bool {
        self.0 == other.0
    }
}

/// Serde helper serializing an [`OffsetDateTime`] as an RFC 3339 string.
mod rfc3339 {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;

    /// Serializes `value` as an RFC 3339 string.
    pub(super) fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rendered = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&rendered)
    }

    /// Deserializes an RFC 3339 string into an [`OffsetDateTime`].
    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&raw, &Rfc3339).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::Timestamp;

    #[test]
    fn round_trips_through_rfc3339() {
        let ts = Timestamp::now();
        let rendered = ts.to_rfc3339();
        let parsed = Timestamp::parse(&rendered).expect("parse");
        assert_eq!(ts, parsed);
    }

    #[test]
    fn plus_seconds_advances_forward() {
        let ts = Timestamp::now();
        let later = ts.plus_seconds(3600);
        assert!(later > ts);
    }

    #[test]
    fn serializes_as_json_string() {
        let ts = Timestamp::parse("2026-01-01T00:00:00Z").expect("parse");
        let json = serde_json::to_string(&ts).expect("serialize");
        assert_eq!(json, "\"2026-01-01T00:00:00Z\"");
    }
}
