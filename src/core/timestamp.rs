//! Layer 0: Time primitives
//!
//! Series timestamps are either naive (no utc offset attached) or
//! zone-aware. A series fixes its awareness at first insertion and never
//! mixes the two, so cross-variant comparison only matters for total
//! ordering inside containers; there, naive instants are read at UTC.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use super::error::CoreError;

/// Whether timestamps carry a utc offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Awareness {
    Naive,
    Zoned,
}

impl Awareness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Zoned => "timezone-aware",
        }
    }
}

impl fmt::Display for Awareness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point on a series' time index.
#[derive(Clone, Copy, Debug)]
pub enum Timestamp {
    Naive(PrimitiveDateTime),
    Zoned(OffsetDateTime),
}

const NAIVE_FULL: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_SPACED: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const NAIVE_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

impl Timestamp {
    pub fn awareness(&self) -> Awareness {
        match self {
            Self::Naive(_) => Awareness::Naive,
            Self::Zoned(_) => Awareness::Zoned,
        }
    }

    /// Instant in unix nanoseconds; naive timestamps are read at UTC.
    pub fn instant(&self) -> i128 {
        match self {
            Self::Naive(dt) => dt.assume_utc().unix_timestamp_nanos(),
            Self::Zoned(dt) => dt.unix_timestamp_nanos(),
        }
    }

    /// Coerce to the given awareness; naive timestamps are assumed UTC
    /// and zone-aware ones are flattened at UTC. Bounds coming from a
    /// caller must match a series' awareness before any range work.
    pub fn coerce(self, awareness: Awareness) -> Timestamp {
        match (self, awareness) {
            (Self::Naive(dt), Awareness::Zoned) => Self::Zoned(dt.assume_utc()),
            (Self::Zoned(dt), Awareness::Naive) => {
                let utc = dt.to_offset(UtcOffset::UTC);
                Self::Naive(PrimitiveDateTime::new(utc.date(), utc.time()))
            }
            (ts, _) => ts,
        }
    }

    pub fn checked_add(self, step: Duration) -> Option<Timestamp> {
        match self {
            Self::Naive(dt) => dt.checked_add(step).map(Self::Naive),
            Self::Zoned(dt) => dt.checked_add(step).map(Self::Zoned),
        }
    }

    pub fn checked_sub(self, step: Duration) -> Option<Timestamp> {
        match self {
            Self::Naive(dt) => dt.checked_sub(step).map(Self::Naive),
            Self::Zoned(dt) => dt.checked_sub(step).map(Self::Zoned),
        }
    }

    /// Re-express a zone-aware timestamp at a display offset. Naive
    /// timestamps have no offset to shift and are returned unchanged.
    pub fn at_offset(self, offset: UtcOffset) -> Timestamp {
        match self {
            Self::Zoned(dt) => Self::Zoned(dt.to_offset(offset)),
            naive => naive,
        }
    }

    pub fn parse(raw: &str) -> Result<Timestamp, CoreError> {
        raw.parse()
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.awareness() == other.awareness() && self.instant() == other.instant()
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant()
            .cmp(&other.instant())
            .then_with(|| naive_first(self.awareness()).cmp(&naive_first(other.awareness())))
    }
}

fn naive_first(awareness: Awareness) -> u8 {
    match awareness {
        Awareness::Naive => 0,
        Awareness::Zoned => 1,
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive(dt) => {
                let rendered = dt.format(NAIVE_FULL).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
            Self::Zoned(dt) => {
                let rendered = dt.format(&Rfc3339).map_err(|_| fmt::Error)?;
                f.write_str(&rendered)
            }
        }
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Ok(Self::Zoned(dt));
        }
        for desc in [NAIVE_FULL, NAIVE_SPACED] {
            if let Ok(dt) = PrimitiveDateTime::parse(raw, desc) {
                return Ok(Self::Naive(dt));
            }
        }
        if let Ok(date) = time::Date::parse(raw, NAIVE_DATE) {
            return Ok(Self::Naive(PrimitiveDateTime::new(date, time::Time::MIDNIGHT)));
        }
        Err(CoreError::BadTimestamp {
            raw: raw.to_string(),
        })
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(dt: OffsetDateTime) -> Self {
        Self::Zoned(dt)
    }
}

impl From<PrimitiveDateTime> for Timestamp {
    fn from(dt: PrimitiveDateTime) -> Self {
        Self::Naive(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn parse_accepts_naive_and_zoned_forms() {
        assert_eq!(
            Timestamp::parse("2020-01-02T03:04:05").unwrap(),
            Timestamp::Naive(datetime!(2020-01-02 03:04:05)),
        );
        assert_eq!(
            Timestamp::parse("2020-01-02").unwrap(),
            Timestamp::Naive(datetime!(2020-01-02 00:00:00)),
        );
        assert_eq!(
            Timestamp::parse("2020-01-02T03:04:05+01:00").unwrap(),
            Timestamp::Zoned(datetime!(2020-01-02 03:04:05 +01:00)),
        );
    }

    #[test]
    fn display_roundtrips() {
        for raw in ["2020-01-02T03:04:05", "2020-01-02T03:04:05Z"] {
            let ts = Timestamp::parse(raw).unwrap();
            assert_eq!(ts.to_string().parse::<Timestamp>().unwrap(), ts);
        }
    }

    #[test]
    fn ordering_is_by_instant() {
        let a = Timestamp::Zoned(datetime!(2020-01-02 03:00:00 +01:00));
        let b = Timestamp::Zoned(datetime!(2020-01-02 02:30:00 UTC));
        assert!(a < b);
        assert_eq!(a, Timestamp::Zoned(datetime!(2020-01-02 02:00:00 UTC)));
    }

    #[test]
    fn coercion_flattens_at_utc() {
        let zoned = Timestamp::Zoned(datetime!(2020-01-02 03:00:00 +01:00));
        assert_eq!(
            zoned.coerce(Awareness::Naive),
            Timestamp::Naive(datetime!(2020-01-02 02:00:00)),
        );
        let naive = Timestamp::Naive(datetime!(2020-01-02 02:00:00));
        assert_eq!(
            naive.coerce(Awareness::Zoned),
            Timestamp::Zoned(datetime!(2020-01-02 02:00:00 UTC)),
        );
    }
}
