//! Shared series builders for the integration suites.

#![allow(dead_code)]

use tidemark::config::BranchConfig;
use tidemark::{Mask, MemoryStore, Scalar, Supervisor, TimeSeries, Timestamp};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

/// Fresh overlay over an empty store with the default branch names.
pub fn fresh() -> Supervisor {
    let store = MemoryStore::new();
    Supervisor::new(&store, &BranchConfig::default())
}

/// Naive daily grid, day 1 = 2010-01-01.
pub fn day(d: i64) -> Timestamp {
    Timestamp::Naive(datetime!(2010-01-01 00:00:00) + Duration::days(d - 1))
}

/// Zone-aware daily grid, day 1 = 2023-01-01 UTC.
pub fn utc_day(d: i64) -> Timestamp {
    Timestamp::Zoned(datetime!(2023-01-01 00:00:00 UTC) + Duration::days(d - 1))
}

/// Halfway between `utc_day(d)` and the next day.
pub fn utc_mid(d: i64) -> Timestamp {
    Timestamp::Zoned(
        datetime!(2023-01-01 00:00:00 UTC) + Duration::days(d - 1) + Duration::hours(12),
    )
}

/// Monotonic insertion stamps.
pub fn stamp(n: i64) -> OffsetDateTime {
    datetime!(2010-06-01 00:00:00 UTC) + Duration::hours(n)
}

pub fn floats(pairs: &[(i64, f64)]) -> TimeSeries {
    TimeSeries::from_pairs(
        pairs
            .iter()
            .map(|(d, value)| (day(*d), Some(Scalar::Float(*value)))),
    )
    .expect("well-formed series")
}

pub fn floats_opt(pairs: &[(i64, Option<f64>)]) -> TimeSeries {
    TimeSeries::from_pairs(
        pairs
            .iter()
            .map(|(d, value)| (day(*d), value.map(Scalar::Float))),
    )
    .expect("well-formed series")
}

pub fn utc_floats(pairs: &[(i64, f64)]) -> TimeSeries {
    TimeSeries::from_pairs(
        pairs
            .iter()
            .map(|(d, value)| (utc_day(*d), Some(Scalar::Float(*value)))),
    )
    .expect("well-formed series")
}

pub fn texts(pairs: &[(i64, &str)]) -> TimeSeries {
    TimeSeries::from_pairs(
        pairs
            .iter()
            .map(|(d, value)| (day(*d), Some(Scalar::Text(value.to_string())))),
    )
    .expect("well-formed series")
}

pub fn float_at(series: &TimeSeries, at: Timestamp) -> Option<f64> {
    match series.get(&at) {
        Some(Some(Scalar::Float(f))) => Some(*f),
        _ => None,
    }
}

pub fn assert_series(series: &TimeSeries, expected: &[(Timestamp, Option<f64>)]) {
    let got: Vec<(Timestamp, Option<f64>)> = series
        .iter()
        .map(|(at, value)| {
            let float = match value {
                Some(Scalar::Float(f)) => Some(*f),
                Some(Scalar::Text(_)) => panic!("expected a float series"),
                None => None,
            };
            (*at, float)
        })
        .collect();
    assert_eq!(got, expected);
}

pub fn assert_mask(mask: &Mask, expected: &[(Timestamp, bool)]) {
    let got: Vec<(Timestamp, bool)> = mask.iter().map(|(at, flag)| (*at, *flag)).collect();
    assert_eq!(got, expected);
}
