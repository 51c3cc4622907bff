//! Override-marker reconstruction.
//!
//! Nothing here is persisted: given the two branches at an as-of
//! revision and window, the mask is recomputed from scratch. For a
//! supervised series the marker index is the union of the upstream
//! index and the diff index, so an erased (missing) manual point still
//! shows up as overridden even though the value itself is gone.

use crate::core::{join_index, Mask, SupervisionStatus, TimeSeries};
use crate::store::{ReadQuery, Shelf};

use super::{read_status, SupervisionError};

pub(crate) fn edited_with_markers(
    shelf: &Shelf,
    upstream_branch: &str,
    edited_branch: &str,
    name: &str,
    query: &ReadQuery,
) -> Result<Option<(TimeSeries, Mask)>, SupervisionError> {
    let full = ReadQuery {
        keep_missing: true,
        ..query.clone()
    };
    let edited = match shelf.get(edited_branch, name, &full)? {
        Some(series) => series,
        // unknown name, or the revision date predates the series
        None => return Ok(None),
    };

    let status = read_status(shelf, edited_branch, name)?;
    let (edited, mask) = match status {
        // no branch divergence to compute: the whole series carries the
        // status
        SupervisionStatus::Unsupervised | SupervisionStatus::Handcrafted => {
            let mask = Mask::constant(
                edited.timestamps(),
                status == SupervisionStatus::Handcrafted,
            );
            (edited, mask)
        }
        SupervisionStatus::Supervised => {
            let upstream = shelf.get(upstream_branch, name, &full)?;
            let base = upstream.clone().unwrap_or_default();
            let manual = edited.diff_from(&base);
            let index = join_index(upstream.as_ref(), Some(&manual)).unwrap_or_default();
            let mut mask = Mask::constant(index.iter(), false);
            for at in manual.timestamps() {
                mask.mark(*at);
            }
            (edited, mask)
        }
    };

    let edited = if query.keep_missing {
        edited
    } else {
        edited.drop_missing()
    };
    Ok(Some((edited, mask)))
}

/// The manual corrections currently in effect. For a handcrafted
/// series that is the whole series; for an unsupervised one, nothing.
pub(crate) fn overrides(
    shelf: &Shelf,
    upstream_branch: &str,
    edited_branch: &str,
    name: &str,
    query: &ReadQuery,
) -> Result<Option<TimeSeries>, SupervisionError> {
    let full = ReadQuery {
        keep_missing: true,
        ..query.clone()
    };
    let edited = match shelf.get(edited_branch, name, &full)? {
        Some(series) => series,
        None => return Ok(None),
    };

    let manual = match read_status(shelf, edited_branch, name)? {
        SupervisionStatus::Unsupervised => TimeSeries::new(),
        SupervisionStatus::Handcrafted => edited,
        SupervisionStatus::Supervised => {
            let base = shelf
                .get(upstream_branch, name, &full)?
                .unwrap_or_default();
            edited.diff_from(&base)
        }
    };
    Ok(Some(manual.drop_missing()))
}
