//! Regular-grid projection for display.
//!
//! Estimates the dominant sampling interval of a reconciled series and
//! reindexes it (and its mask) onto a regular grid spanning the
//! requested window, turning silent holes into explicit missing slots.
//! The grid is phase-anchored on the series itself, never on the
//! window bounds: a bound that falls off-phase must not shift every
//! grid point with it.

use std::collections::BTreeMap;

use time::Duration;

use crate::core::{Mask, TimeSeries, Timestamp};

/// Dominant interval between consecutive timestamps. Needs at least
/// three points (two observed gaps); ties break toward the smaller
/// interval.
pub fn infer_step(series: &TimeSeries) -> Option<Duration> {
    if series.len() < 3 {
        return None;
    }
    let instants: Vec<i128> = series.timestamps().map(Timestamp::instant).collect();
    let mut counts: BTreeMap<Duration, usize> = BTreeMap::new();
    for pair in instants.windows(2) {
        let nanos = match i64::try_from(pair[1] - pair[0]) {
            Ok(nanos) => nanos,
            Err(_) => continue,
        };
        *counts.entry(Duration::nanoseconds(nanos)).or_default() += 1;
    }
    let mut best: Option<(Duration, usize)> = None;
    for (step, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((step, count));
        }
    }
    best.map(|(step, _)| step)
}

/// Reindex `(series, mask)` onto the inferred regular grid over the
/// requested window. Grid-introduced positions carry a missing value
/// and a `false` marker: an inferred gap is never an override. Series
/// too short to estimate a step pass through unchanged.
pub fn regrid(
    series: &TimeSeries,
    mask: &Mask,
    from: Option<Timestamp>,
    to: Option<Timestamp>,
) -> (TimeSeries, Mask) {
    let step = match infer_step(series) {
        Some(step) => step,
        None => return (series.clone(), mask.clone()),
    };
    let (first, last, awareness) = match (
        series.first_timestamp(),
        series.last_timestamp(),
        series.awareness(),
    ) {
        (Some(first), Some(last), Some(awareness)) => (first, last, awareness),
        _ => return (series.clone(), mask.clone()),
    };
    // bounds and series must agree on awareness before any range math
    let from = from.map(|bound| bound.coerce(awareness));
    let to = to.map(|bound| bound.coerce(awareness));

    let grid = match (from, to) {
        (None, None) => forward(first, last, step),
        (None, Some(hi)) => forward(first, hi, step),
        (Some(lo), None) => backward(last, lo, step),
        (Some(lo), Some(hi)) => {
            // both legs stay phase-aligned with the series; their union
            // covers a window wider than the series' own span
            let mut grid = forward(first, hi, step);
            grid.extend(backward(last, lo, step));
            grid.sort();
            grid.dedup();
            grid
        }
    };

    (series.reindex(grid.iter(), None), mask.reindex(grid.iter(), false))
}

/// Grid points from `start` up to the bound, inclusive.
fn forward(start: Timestamp, bound: Timestamp, step: Duration) -> Vec<Timestamp> {
    let mut grid = Vec::new();
    let mut at = start;
    while at <= bound {
        grid.push(at);
        at = match at.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    grid
}

/// Grid points from `end` down toward the bound, ascending on return.
/// Keeps stepping while a point still covers the bound, so an
/// off-phase bound yields one grid slot just beyond it.
fn backward(end: Timestamp, bound: Timestamp, step: Duration) -> Vec<Timestamp> {
    let mut grid = Vec::new();
    let mut at = end;
    while at.checked_add(step).map_or(false, |above| above > bound) {
        grid.push(at);
        at = match at.checked_sub(step) {
            Some(next) => next,
            None => break,
        };
    }
    grid.reverse();
    grid
}
