use chrono::{TimeZone, Utc};
use std::fmt;
use std::time::Duration;

pub const USEC_PER_MSEC: i64 = 1_000;
pub const USEC_PER_SEC: i64 = 1_000_000;

/// Wall-clock instant, microseconds since the Unix epoch.
///
/// Monotonic spans are `std::time::Instant`/`Duration` throughout the crate;
/// this type exists for the wire (cell timestamps, `x-ots-date`) where an
/// absolute clock is required. All arithmetic is overflow-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTime {
    usec: i64,
}

impl UtcTime {
    pub fn from_usec(usec: i64) -> Self {
        Self { usec }
    }

    pub fn from_msec(msec: i64) -> Self {
        Self { usec: msec.saturating_mul(USEC_PER_MSEC) }
    }

    pub fn from_sec(sec: i64) -> Self {
        Self { usec: sec.saturating_mul(USEC_PER_SEC) }
    }

    pub fn now() -> Self {
        Self { usec: Utc::now().timestamp_micros() }
    }

    pub fn to_usec(self) -> i64 {
        self.usec
    }

    pub fn to_msec(self) -> i64 {
        self.usec / USEC_PER_MSEC
    }

    pub fn to_sec(self) -> i64 {
        self.usec / USEC_PER_SEC
    }

    /// Whether the instant falls on a whole millisecond. Cell timestamps on
    /// the wire carry millisecond precision only.
    pub fn is_whole_msec(self) -> bool {
        self.usec % USEC_PER_MSEC == 0
    }

    pub fn checked_add(self, delta: Duration) -> Option<Self> {
        let delta = i64::try_from(delta.as_micros()).ok()?;
        self.usec.checked_add(delta).map(|usec| Self { usec })
    }

    pub fn checked_sub(self, delta: Duration) -> Option<Self> {
        let delta = i64::try_from(delta.as_micros()).ok()?;
        self.usec.checked_sub(delta).map(|usec| Self { usec })
    }

    /// ISO-8601 with microsecond precision and a literal `Z` suffix, e.g.
    /// `2016-01-02T03:04:05.678901Z`. This is the exact form the signed
    /// `x-ots-date` header carries.
    pub fn to_iso8601(self) -> String {
        match Utc.timestamp_micros(self.usec) {
            chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            _ => String::from("0000-00-00T00:00:00.000000Z"),
        }
    }
}

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}
