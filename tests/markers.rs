//! Read-path reconstruction: masks, windows, as-of revisions.

mod fixtures;

use fixtures::series::{assert_mask, assert_series, day, floats, fresh, stamp};
use tidemark::{ReadQuery, Timestamp, Update};

#[test]
fn unknown_series_reads_as_nothing() {
    let tsh = fresh();
    assert!(tsh.edited("unknown", &ReadQuery::latest()).unwrap().is_none());
    assert!(tsh.overrides("unknown", &ReadQuery::latest()).unwrap().is_none());
}

#[test]
fn revision_before_first_insertion_reads_as_nothing() {
    let tsh = fresh();
    tsh.update(Update::automatic("ts", &floats(&[(1, 0.0)]), "babar").at(stamp(10)))
        .unwrap();
    let early = tsh.edited("ts", &ReadQuery::as_of(stamp(0))).unwrap();
    assert!(early.is_none());
}

#[test]
fn fresh_automatic_series_has_an_all_false_mask() {
    let tsh = fresh();
    tsh.update(Update::automatic("ts", &floats(&[(1, 2.0), (2, 2.0)]), "babar").at(stamp(0)))
        .unwrap();
    let (_, mask) = tsh.edited("ts", &ReadQuery::latest()).unwrap().unwrap();
    assert!(!mask.any());
    assert_mask(&mask, &[(day(1), false), (day(2), false)]);
}

#[test]
fn as_of_reads_reconstruct_both_branches() {
    let tsh = fresh();
    tsh.update(
        Update::automatic("ts", &floats(&[(1, 1.0), (2, 2.0), (3, 3.0)]), "scraper").at(stamp(0)),
    )
    .unwrap();
    tsh.update(Update::manual("ts", &floats(&[(2, 9.0)]), "celeste").at(stamp(2)))
        .unwrap();
    tsh.update(Update::automatic("ts", &floats(&[(2, 5.0)]), "scraper").at(stamp(4)))
        .unwrap();

    // at the end: upstream fixed day 2, the override is gone
    let (now, mask_now) = tsh.edited("ts", &ReadQuery::latest()).unwrap().unwrap();
    assert_series(
        &now,
        &[(day(1), Some(1.0)), (day(2), Some(5.0)), (day(3), Some(3.0))],
    );
    assert!(!mask_now.any());

    // between the edit and the upstream fix: the override shows
    let (then, mask_then) = tsh.edited("ts", &ReadQuery::as_of(stamp(3))).unwrap().unwrap();
    assert_series(
        &then,
        &[(day(1), Some(1.0)), (day(2), Some(9.0)), (day(3), Some(3.0))],
    );
    assert_mask(
        &mask_then,
        &[(day(1), false), (day(2), true), (day(3), false)],
    );
}

#[test]
fn pre_baseline_revisions_read_every_point_as_manual() {
    let tsh = fresh();
    tsh.update(Update::automatic("ts", &floats(&[(1, 1.0), (2, 2.0)]), "scraper").at(stamp(0)))
        .unwrap();
    tsh.update(Update::manual("ts", &floats(&[(1, 7.0)]), "celeste").at(stamp(5)))
        .unwrap();

    // the baseline only exists from stamp(5) on; before that the
    // upstream branch has no state to diff against and the whole
    // edited series reads as manual
    let (series, mask) = tsh.edited("ts", &ReadQuery::as_of(stamp(1))).unwrap().unwrap();
    assert_series(&series, &[(day(1), Some(1.0)), (day(2), Some(2.0))]);
    assert_mask(&mask, &[(day(1), true), (day(2), true)]);
}

#[test]
fn value_date_window_restricts_series_and_mask() {
    let tsh = fresh();
    tsh.update(
        Update::automatic(
            "ts",
            &floats(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]),
            "scraper",
        )
        .at(stamp(0)),
    )
    .unwrap();
    tsh.update(Update::manual("ts", &floats(&[(2, 9.0), (4, 9.0)]), "celeste").at(stamp(1)))
        .unwrap();

    let query = ReadQuery::latest().between(Some(day(2)), Some(day(3)));
    let (series, mask) = tsh.edited("ts", &query).unwrap().unwrap();
    assert_series(&series, &[(day(2), Some(9.0)), (day(3), Some(3.0))]);
    assert_mask(&mask, &[(day(2), true), (day(3), false)]);

    let manual = tsh.overrides("ts", &query).unwrap().unwrap();
    assert_series(&manual, &[(day(2), Some(9.0))]);
}

#[test]
fn window_bounds_tolerate_other_awareness() {
    let tsh = fresh();
    tsh.update(
        Update::automatic("ts", &floats(&[(1, 1.0), (2, 2.0), (3, 3.0)]), "scraper").at(stamp(0)),
    )
    .unwrap();
    // zone-aware bounds against a naive series: coerced at UTC
    let from = Timestamp::parse("2010-01-02T00:00:00Z").unwrap();
    let query = ReadQuery::latest().between(Some(from), None);
    let (series, _) = tsh.edited("ts", &query).unwrap().unwrap();
    assert_series(&series, &[(day(2), Some(2.0)), (day(3), Some(3.0))]);
}

#[test]
fn keep_missing_retains_placeholders() {
    let tsh = fresh();
    tsh.update(Update::automatic("ts", &floats(&[(1, 1.0), (2, 2.0)]), "scraper").at(stamp(0)))
        .unwrap();
    tsh.update(
        Update::manual(
            "ts",
            &fixtures::series::floats_opt(&[(2, None)]),
            "celeste",
        )
        .at(stamp(1)),
    )
    .unwrap();

    let (dropped, _) = tsh.edited("ts", &ReadQuery::latest()).unwrap().unwrap();
    assert_eq!(dropped.len(), 1);

    let (kept, mask) = tsh
        .edited("ts", &ReadQuery::latest().retain_missing())
        .unwrap()
        .unwrap();
    assert_series(&kept, &[(day(1), Some(1.0)), (day(2), None)]);
    assert_mask(&mask, &[(day(1), false), (day(2), true)]);
}

#[test]
fn handcrafted_overrides_are_the_whole_series() {
    let tsh = fresh();
    tsh.update(Update::manual("ts", &floats(&[(1, 1.0), (2, 2.0)]), "babar").at(stamp(0)))
        .unwrap();
    let manual = tsh.overrides("ts", &ReadQuery::latest()).unwrap().unwrap();
    assert_series(&manual, &[(day(1), Some(1.0)), (day(2), Some(2.0))]);
}
