//! Layer 3: Time-indexed series
//!
//! `Series<V>` is an ordered timestamp->value map with uniform
//! timezone-awareness across its index. The two instantiations that
//! matter are `TimeSeries` (values with explicit missing slots) and
//! `Mask` (the boolean override markers reconstructed on read).
//!
//! The elementwise difference used everywhere (insert diffs, override
//! reconstruction) is missing-aware: two missing values are equal, a
//! present value differing from a missing one or from another present
//! value is a difference.

use std::collections::BTreeMap;

use super::error::CoreError;
use super::scalar::{Scalar, ScalarKind};
use super::timestamp::{Awareness, Timestamp};

#[derive(Clone, Debug, PartialEq)]
pub struct Series<V> {
    points: BTreeMap<Timestamp, V>,
}

pub type TimeSeries = Series<Option<Scalar>>;

pub type Mask = Series<bool>;

impl<V> Default for Series<V> {
    fn default() -> Self {
        Self {
            points: BTreeMap::new(),
        }
    }
}

impl<V> Series<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn awareness(&self) -> Option<Awareness> {
        self.points.keys().next().map(Timestamp::awareness)
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.points.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.points.keys().next_back().copied()
    }

    pub fn contains(&self, at: &Timestamp) -> bool {
        self.points.contains_key(at)
    }

    pub fn get(&self, at: &Timestamp) -> Option<&V> {
        self.points.get(at)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Timestamp, &V)> {
        self.points.iter()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = &Timestamp> {
        self.points.keys()
    }

    pub fn from_points<I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Timestamp, V)>,
    {
        let mut series = Self::new();
        for (at, value) in pairs {
            series.insert_point(at, value)?;
        }
        Ok(series)
    }

    /// Insert one point, refusing to mix naive and zone-aware indices.
    pub fn insert_point(&mut self, at: Timestamp, value: V) -> Result<(), CoreError> {
        if let Some(awareness) = self.awareness() {
            if at.awareness() != awareness {
                return Err(CoreError::MixedAwareness);
            }
        }
        self.points.insert(at, value);
        Ok(())
    }

    /// Project onto a new index; positions this series has no value
    /// for get `fill`.
    pub fn reindex<'a, I>(&self, index: I, fill: V) -> Self
    where
        V: Clone,
        I: IntoIterator<Item = &'a Timestamp>,
    {
        let points = index
            .into_iter()
            .map(|at| (*at, self.points.get(at).cloned().unwrap_or_else(|| fill.clone())))
            .collect();
        Self { points }
    }

    /// Rewrite the index, e.g. to re-express zone-aware timestamps at a
    /// display offset.
    pub fn map_index(&self, f: impl Fn(Timestamp) -> Timestamp) -> Self
    where
        V: Clone,
    {
        let points = self
            .points
            .iter()
            .map(|(at, value)| (f(*at), value.clone()))
            .collect();
        Self { points }
    }

    /// Restrict to a `[from, to]` value-date window (both ends
    /// inclusive). Bounds are coerced to the series' awareness first.
    pub fn window(&self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self
    where
        V: Clone,
    {
        let awareness = match self.awareness() {
            Some(awareness) => awareness,
            None => return Self::new(),
        };
        let from = from.map(|b| b.coerce(awareness));
        let to = to.map(|b| b.coerce(awareness));
        let points = self
            .points
            .iter()
            .filter(|(at, _)| {
                from.map_or(true, |lo| **at >= lo) && to.map_or(true, |hi| **at <= hi)
            })
            .map(|(at, value)| (*at, value.clone()))
            .collect();
        Self { points }
    }
}

impl TimeSeries {
    pub fn from_pairs<I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Timestamp, Option<Scalar>)>,
    {
        let mut series = Self::new();
        for (at, value) in pairs {
            series.set(at, value)?;
        }
        Ok(series)
    }

    /// Insert one observation: normalizes the NaN missing sentinel and
    /// refuses mixed value kinds on top of the index checks.
    pub fn set(&mut self, at: Timestamp, value: Option<Scalar>) -> Result<(), CoreError> {
        let value = value.filter(|scalar| !scalar.is_missing_sentinel());
        if let (Some(kind), Some(scalar)) = (self.value_kind(), value.as_ref()) {
            if scalar.kind() != kind {
                return Err(CoreError::MixedValueKinds);
            }
        }
        self.insert_point(at, value)
    }

    /// Kind of the stored values, None while the series holds no
    /// present value.
    pub fn value_kind(&self) -> Option<ScalarKind> {
        self.points
            .values()
            .find_map(|value| value.as_ref().map(Scalar::kind))
    }

    /// Entries of `self` whose value differs, missing-aware, from
    /// `base` at the same timestamp. An absent base entry counts as
    /// missing, so a missing incoming value over a hole is no change
    /// while a missing incoming value over a present one is an erasure.
    pub fn diff_from(&self, base: &TimeSeries) -> TimeSeries {
        let points = self
            .points
            .iter()
            .filter(|(at, value)| {
                let prior = base.points.get(at).and_then(Option::as_ref);
                !missing_aware_eq(prior, value.as_ref())
            })
            .map(|(at, value)| (*at, value.clone()))
            .collect();
        Self { points }
    }

    /// Apply a diff on top of this state: every diff entry replaces
    /// (or introduces) the point at its timestamp, explicit missing
    /// entries erase.
    pub fn patch(&self, diff: &TimeSeries) -> TimeSeries {
        let mut points = self.points.clone();
        for (at, value) in &diff.points {
            points.insert(*at, value.clone());
        }
        Self { points }
    }

    /// Diff that turns this state into exactly `incoming`: the entries
    /// of `incoming` that differ, plus erasures for present points that
    /// `incoming` no longer carries.
    pub fn replace_diff(&self, incoming: &TimeSeries) -> TimeSeries {
        let mut diff = incoming.diff_from(self);
        for (at, value) in &self.points {
            if value.is_some() && !incoming.points.contains_key(at) {
                diff.points.insert(*at, None);
            }
        }
        diff
    }

    pub fn drop_missing(&self) -> TimeSeries {
        let points = self
            .points
            .iter()
            .filter(|(_, value)| value.is_some())
            .map(|(at, value)| (*at, value.clone()))
            .collect();
        Self { points }
    }
}

impl Mask {
    /// Constant mask over a given index.
    pub fn constant<'a, I>(index: I, value: bool) -> Self
    where
        I: IntoIterator<Item = &'a Timestamp>,
    {
        let points = index.into_iter().map(|at| (*at, value)).collect();
        Self { points }
    }

    pub fn mark(&mut self, at: Timestamp) {
        self.points.insert(at, true);
    }

    pub fn any(&self) -> bool {
        self.points.values().any(|flag| *flag)
    }
}

fn missing_aware_eq(a: Option<&Scalar>, b: Option<&Scalar>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Union of two optional time indices, tolerant of absence. Yields
/// None only when both sides are absent.
pub fn join_index<A, B>(a: Option<&Series<A>>, b: Option<&Series<B>>) -> Option<Vec<Timestamp>> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.timestamps().copied().collect()),
        (None, Some(b)) => Some(b.timestamps().copied().collect()),
        (Some(a), Some(b)) => {
            let mut index: Vec<Timestamp> = a.timestamps().chain(b.timestamps()).copied().collect();
            index.sort();
            index.dedup();
            Some(index)
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn day(d: u8) -> Timestamp {
        Timestamp::Naive(datetime!(2010-01-01 00:00:00) + time::Duration::days(d as i64 - 1))
    }

    fn floats(pairs: &[(u8, Option<f64>)]) -> TimeSeries {
        TimeSeries::from_pairs(
            pairs
                .iter()
                .map(|(d, value)| (day(*d), value.map(Scalar::Float))),
        )
        .unwrap()
    }

    #[test]
    fn nan_normalizes_to_missing() {
        let series = floats(&[(1, Some(1.0)), (2, Some(f64::NAN))]);
        assert_eq!(series.get(&day(2)), Some(&None));
        assert_eq!(series.drop_missing().len(), 1);
    }

    #[test]
    fn mixed_awareness_is_refused() {
        let mut series = TimeSeries::new();
        series.set(day(1), Some(Scalar::Float(1.0))).unwrap();
        let zoned = Timestamp::Zoned(datetime!(2010-01-05 00:00:00 UTC));
        assert!(matches!(
            series.set(zoned, Some(Scalar::Float(2.0))),
            Err(CoreError::MixedAwareness)
        ));
    }

    #[test]
    fn mixed_kinds_are_refused() {
        let mut series = TimeSeries::new();
        series.set(day(1), Some(Scalar::Float(1.0))).unwrap();
        assert!(matches!(
            series.set(day(2), Some(Scalar::Text("x".into()))),
            Err(CoreError::MixedValueKinds)
        ));
    }

    #[test]
    fn diff_is_missing_aware() {
        let base = floats(&[(1, Some(1.0)), (2, None), (3, Some(3.0))]);
        let incoming = floats(&[(1, Some(1.0)), (2, None), (3, None), (4, Some(4.0))]);
        let diff = incoming.diff_from(&base);
        // unchanged value and missing-over-missing drop out; the erasure
        // at day 3 and the new day 4 remain
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get(&day(3)), Some(&None));
        assert_eq!(diff.get(&day(4)), Some(&Some(Scalar::Float(4.0))));
    }

    #[test]
    fn patch_applies_erasures() {
        let base = floats(&[(1, Some(1.0)), (2, Some(2.0))]);
        let diff = floats(&[(2, None), (3, Some(3.0))]);
        let patched = base.patch(&diff);
        assert_eq!(patched.len(), 3);
        assert_eq!(patched.get(&day(2)), Some(&None));
        assert_eq!(patched.drop_missing().len(), 2);
    }

    #[test]
    fn window_is_inclusive() {
        let series = floats(&[(1, Some(1.0)), (2, Some(2.0)), (3, Some(3.0))]);
        let windowed = series.window(Some(day(2)), Some(day(3)));
        assert_eq!(windowed.len(), 2);
        assert_eq!(series.window(None, Some(day(1))).len(), 1);
    }

    #[test]
    fn join_index_tolerates_absence() {
        let a = floats(&[(1, Some(1.0)), (2, Some(2.0))]);
        let b = floats(&[(2, Some(2.0)), (3, Some(3.0))]);
        assert_eq!(join_index::<Option<Scalar>, Option<Scalar>>(None, None), None);
        assert_eq!(join_index(Some(&a), None::<&Series<Option<Scalar>>>).unwrap().len(), 2);
        let union = join_index(Some(&a), Some(&b)).unwrap();
        assert_eq!(union, vec![day(1), day(2), day(3)]);
    }
}
