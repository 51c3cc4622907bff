//! The shared shelf behind every branch handle.
//!
//! All methods take `&self`/`&mut self` under a caller-held lock; a
//! compound operation spanning branches runs against one guard, which
//! is the store's transaction boundary.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::core::{Awareness, ScalarKind, TimeSeries};

use super::{ReadQuery, RevisionId, RevisionInfo, StoreError};

#[derive(Clone, Debug)]
struct Revision {
    author: String,
    stamp: OffsetDateTime,
    metadata: BTreeMap<String, String>,
    diff: TimeSeries,
}

#[derive(Clone, Debug)]
struct SeriesRecord {
    kind: ScalarKind,
    awareness: Awareness,
    metadata: BTreeMap<String, String>,
    revisions: Vec<Revision>,
}

impl SeriesRecord {
    /// Fold diffs up to the given insertion date. None when no revision
    /// qualifies: the series did not exist yet at that date.
    fn state_upto(&self, revision_date: Option<&OffsetDateTime>) -> Option<TimeSeries> {
        let mut state = TimeSeries::new();
        let mut seen = false;
        for revision in &self.revisions {
            if let Some(cut) = revision_date {
                if revision.stamp > *cut {
                    break;
                }
            }
            state = state.patch(&revision.diff);
            seen = true;
        }
        seen.then_some(state)
    }

    fn head(&self) -> TimeSeries {
        self.state_upto(None).unwrap_or_default()
    }
}

#[derive(Default)]
pub(crate) struct Shelf {
    branches: BTreeMap<String, BTreeMap<String, SeriesRecord>>,
}

impl Shelf {
    fn record(&self, branch: &str, name: &str) -> Option<&SeriesRecord> {
        self.branches.get(branch).and_then(|series| series.get(name))
    }

    pub(crate) fn exists(&self, branch: &str, name: &str) -> bool {
        self.record(branch, name).is_some()
    }

    pub(crate) fn get(
        &self,
        branch: &str,
        name: &str,
        query: &ReadQuery,
    ) -> Result<Option<TimeSeries>, StoreError> {
        let record = match self.record(branch, name) {
            Some(record) => record,
            None => return Ok(None),
        };
        let state = match record.state_upto(query.revision_date.as_ref()) {
            Some(state) => state,
            None => return Ok(None),
        };
        let windowed = state.window(query.from_value_date, query.to_value_date);
        if query.keep_missing {
            Ok(Some(windowed))
        } else {
            Ok(Some(windowed.drop_missing()))
        }
    }

    /// Validate an incoming series against the record's settled value
    /// kind and index awareness, mutating nothing. Compound writes call
    /// this up front so later steps cannot fail halfway through.
    pub(crate) fn check_compatible(
        &self,
        branch: &str,
        name: &str,
        series: &TimeSeries,
    ) -> Result<(), StoreError> {
        let record = match self.record(branch, name) {
            Some(record) => record,
            None => return Ok(()),
        };
        if let Some(new) = series.value_kind() {
            if new != record.kind {
                return Err(StoreError::TypeMismatch {
                    name: name.to_string(),
                    new,
                    base: record.kind,
                });
            }
        }
        if let Some(new) = series.awareness() {
            if new != record.awareness {
                return Err(StoreError::AwarenessMismatch {
                    name: name.to_string(),
                    new,
                    base: record.awareness,
                });
            }
        }
        Ok(())
    }

    /// Append the diff of `series` against the current head. An empty
    /// diff appends nothing and returns empty. Insertion dates are
    /// expected monotonic per series; the host feeding the store owns
    /// that discipline.
    pub(crate) fn insert(
        &mut self,
        branch: &str,
        name: &str,
        series: &TimeSeries,
        author: &str,
        metadata: BTreeMap<String, String>,
        stamp: OffsetDateTime,
    ) -> Result<TimeSeries, StoreError> {
        self.check_compatible(branch, name, series)?;
        let state = self
            .record(branch, name)
            .map(SeriesRecord::head)
            .unwrap_or_default();
        let diff = series.diff_from(&state);
        self.append(branch, name, diff, author, metadata, stamp)
    }

    /// Like insert, but the incoming series replaces the whole state:
    /// head points absent from it are erased.
    pub(crate) fn replace(
        &mut self,
        branch: &str,
        name: &str,
        series: &TimeSeries,
        author: &str,
        metadata: BTreeMap<String, String>,
        stamp: OffsetDateTime,
    ) -> Result<TimeSeries, StoreError> {
        self.check_compatible(branch, name, series)?;
        let state = self
            .record(branch, name)
            .map(SeriesRecord::head)
            .unwrap_or_default();
        let diff = state.replace_diff(series);
        self.append(branch, name, diff, author, metadata, stamp)
    }

    fn append(
        &mut self,
        branch: &str,
        name: &str,
        diff: TimeSeries,
        author: &str,
        metadata: BTreeMap<String, String>,
        stamp: OffsetDateTime,
    ) -> Result<TimeSeries, StoreError> {
        if diff.is_empty() {
            return Ok(diff);
        }
        let series = self.branches.entry(branch.to_string()).or_default();
        let record = match series.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                // a non-empty first diff always carries a present value
                let (kind, awareness) = match (diff.value_kind(), diff.awareness()) {
                    (Some(kind), Some(awareness)) => (kind, awareness),
                    _ => return Ok(TimeSeries::new()),
                };
                entry.insert(SeriesRecord {
                    kind,
                    awareness,
                    metadata: BTreeMap::new(),
                    revisions: Vec::new(),
                })
            }
        };
        tracing::debug!(
            branch,
            series = name,
            points = diff.len(),
            revision = record.revisions.len() as u64 + 1,
            "append revision"
        );
        record.revisions.push(Revision {
            author: author.to_string(),
            stamp,
            metadata,
            diff: diff.clone(),
        });
        Ok(diff)
    }

    pub(crate) fn delete(&mut self, branch: &str, name: &str) -> Result<(), StoreError> {
        let removed = self
            .branches
            .get_mut(branch)
            .and_then(|series| series.remove(name));
        match removed {
            Some(_) => {
                tracing::debug!(branch, series = name, "delete series");
                Ok(())
            }
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    pub(crate) fn rename(&mut self, branch: &str, old: &str, new: &str) -> Result<(), StoreError> {
        if self.exists(branch, new) {
            return Err(StoreError::AlreadyExists(new.to_string()));
        }
        let series = self
            .branches
            .get_mut(branch)
            .ok_or_else(|| StoreError::NotFound(old.to_string()))?;
        let record = series
            .remove(old)
            .ok_or_else(|| StoreError::NotFound(old.to_string()))?;
        series.insert(new.to_string(), record);
        Ok(())
    }

    /// Drop the given revision and everything after it. A fully
    /// stripped series no longer resolves to any value.
    pub(crate) fn strip(
        &mut self,
        branch: &str,
        name: &str,
        revision: RevisionId,
    ) -> Result<(), StoreError> {
        let record = self
            .branches
            .get_mut(branch)
            .and_then(|series| series.get_mut(name))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let count = record.revisions.len() as u64;
        if revision == 0 || revision > count {
            return Err(StoreError::UnknownRevision {
                name: name.to_string(),
                revision,
            });
        }
        record.revisions.truncate(revision as usize - 1);
        tracing::debug!(branch, series = name, revision, "strip revisions");
        Ok(())
    }

    pub(crate) fn internal_metadata(
        &self,
        branch: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        self.record(branch, name)
            .map(|record| record.metadata.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub(crate) fn update_internal_metadata(
        &mut self,
        branch: &str,
        name: &str,
        patch: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let record = self
            .branches
            .get_mut(branch)
            .and_then(|series| series.get_mut(name))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        record.metadata.extend(patch);
        Ok(())
    }

    pub(crate) fn log(&self, branch: &str, name: &str) -> Result<Vec<RevisionInfo>, StoreError> {
        let record = self
            .record(branch, name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(record
            .revisions
            .iter()
            .enumerate()
            .map(|(idx, revision)| RevisionInfo {
                id: idx as RevisionId + 1,
                author: revision.author.clone(),
                stamp: revision.stamp,
                metadata: revision.metadata.clone(),
            })
            .collect())
    }
}
