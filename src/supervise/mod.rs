//! Supervision overlay: two branches, one status machine.
//!
//! Series live twice in the store: the upstream branch records what the
//! automatic feed sent, the edited branch records the synthesis of feed
//! plus human corrections. The workflow mirrors a two-branch DVCS: feed
//! writes land on upstream and only their effective diff is merged onto
//! the edited branch, so a manual fix survives a feed resending stale
//! values, while a genuinely new feed value supersedes the fix.
//!
//! Which route a write takes depends on the per-series supervision
//! status; see `core::status` for the (one-way) transition rules.

pub(crate) mod marker;
pub mod regrid;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use time::OffsetDateTime;

use crate::config::BranchConfig;
use crate::core::{CoreError, Mask, SupervisionStatus, TimeSeries};
use crate::error::{Effect, Transience};
use crate::store::{Branch, MemoryStore, ReadQuery, RevisionId, Shelf, StoreError};

/// Revision metadata key flagging a human write.
const EDITED_KEY: &str = "edited";
/// Internal metadata key carrying the supervision status.
const STATUS_KEY: &str = "supervision_status";

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum SupervisionError {
    #[error("cannot strip `{name}`: series is supervised")]
    StripSupervised { name: String },

    #[error("upstream and edited handles must come from the same store")]
    DisjointStores,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SupervisionError {
    pub fn transience(&self) -> Transience {
        match self {
            Self::Store(e) => e.transience(),
            Self::Core(e) => e.transience(),
            _ => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        match self {
            Self::Store(e) => e.effect(),
            Self::Core(e) => e.effect(),
            _ => Effect::None,
        }
    }
}

/// One incoming write.
#[derive(Clone, Debug)]
pub struct Update<'a> {
    pub name: &'a str,
    pub series: &'a TimeSeries,
    pub author: &'a str,
    pub manual: bool,
    pub metadata: BTreeMap<String, String>,
    pub insertion_date: Option<OffsetDateTime>,
}

impl<'a> Update<'a> {
    pub fn automatic(name: &'a str, series: &'a TimeSeries, author: &'a str) -> Self {
        Self {
            name,
            series,
            author,
            manual: false,
            metadata: BTreeMap::new(),
            insertion_date: None,
        }
    }

    pub fn manual(name: &'a str, series: &'a TimeSeries, author: &'a str) -> Self {
        Self {
            manual: true,
            ..Self::automatic(name, series, author)
        }
    }

    pub fn at(mut self, insertion_date: OffsetDateTime) -> Self {
        self.insertion_date = Some(insertion_date);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One revision of a supervised series' audit trail.
#[derive(Clone, Debug)]
pub struct SupervisedRevision {
    pub id: RevisionId,
    pub author: String,
    pub stamp: OffsetDateTime,
    pub manual: bool,
}

/// The overlay. Holds the two branch handles explicitly; nothing is
/// derived from naming conventions.
#[derive(Clone)]
pub struct Supervisor {
    shelf: Arc<RwLock<Shelf>>,
    upstream: String,
    edited: String,
}

impl Supervisor {
    pub fn new(store: &MemoryStore, branches: &BranchConfig) -> Self {
        Self {
            shelf: Arc::clone(store.shelf()),
            upstream: branches.upstream.clone(),
            edited: branches.edited.clone(),
        }
    }

    /// Build from two pre-scoped handles; they must share a store, or
    /// writes could not span both branches atomically.
    pub fn with_branches(upstream: Branch, edited: Branch) -> Result<Self, SupervisionError> {
        if !Arc::ptr_eq(upstream.shelf(), edited.shelf()) {
            return Err(SupervisionError::DisjointStores);
        }
        Ok(Self {
            shelf: Arc::clone(upstream.shelf()),
            upstream: upstream.name().to_string(),
            edited: edited.name().to_string(),
        })
    }

    /// Route one write through the status machine. Returns the diff
    /// actually merged into the edited branch, empty for a no-op.
    pub fn update(&self, update: Update<'_>) -> Result<TimeSeries, SupervisionError> {
        let mut shelf = self.shelf.write().expect("store lock poisoned");
        let stamp = update.insertion_date.unwrap_or_else(OffsetDateTime::now_utc);
        let name = update.name;

        let mut metadata = update.metadata;
        if update.manual {
            metadata.insert(EDITED_KEY.to_string(), "true".to_string());
        }

        // validate up front: nothing below may fail once branches start
        // being written
        shelf.check_compatible(&self.edited, name, update.series)?;
        shelf.check_compatible(&self.upstream, name, update.series)?;

        if !shelf.exists(&self.edited, name) {
            let diff = shelf.insert(
                &self.edited,
                name,
                update.series,
                update.author,
                metadata,
                stamp,
            )?;
            if diff.is_empty() {
                // all-missing input on a nonexistent series: no record,
                // no status
                return Ok(diff);
            }
            let status = SupervisionStatus::initial(update.manual);
            self.set_status(&mut shelf, name, status)?;
            tracing::debug!(series = name, status = %status, "series created");
            return Ok(diff);
        }

        let status = read_status(&shelf, &self.edited, name)?;
        match status {
            SupervisionStatus::Unsupervised => {
                if update.manual {
                    // first human touch: freeze the current edited value
                    // as the upstream baseline, then diff against it
                    let baseline = shelf
                        .get(&self.edited, name, &ReadQuery::latest().retain_missing())?
                        .unwrap_or_default();
                    shelf.insert(
                        &self.upstream,
                        name,
                        &baseline,
                        update.author,
                        metadata.clone(),
                        stamp,
                    )?;
                    self.set_status(&mut shelf, name, SupervisionStatus::Supervised)?;
                    tracing::info!(series = name, "series is now supervised");
                }
                // while unsupervised the edited branch mirrors the feed:
                // write straight through
                Ok(shelf.insert(
                    &self.edited,
                    name,
                    update.series,
                    update.author,
                    metadata,
                    stamp,
                )?)
            }
            SupervisionStatus::Supervised | SupervisionStatus::Handcrafted => {
                let merged;
                let to_merge = if update.manual {
                    update.series
                } else {
                    let upstream_diff = shelf.insert(
                        &self.upstream,
                        name,
                        update.series,
                        update.author,
                        metadata.clone(),
                        stamp,
                    )?;
                    if upstream_diff.is_empty() {
                        // the feed resent what it already sent: the
                        // edited branch keeps its corrections
                        return Ok(upstream_diff);
                    }
                    if status == SupervisionStatus::Handcrafted {
                        self.set_status(&mut shelf, name, SupervisionStatus::Supervised)?;
                        tracing::info!(series = name, "series is now supervised");
                    }
                    merged = upstream_diff;
                    &merged
                };
                Ok(shelf.insert(
                    &self.edited,
                    name,
                    to_merge,
                    update.author,
                    metadata,
                    stamp,
                )?)
            }
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.read().exists(&self.edited, name)
    }

    /// The edited branch is "the" series when no supervision
    /// distinction is requested.
    pub fn get(&self, name: &str, query: &ReadQuery) -> Result<Option<TimeSeries>, SupervisionError> {
        Ok(self.read().get(&self.edited, name, query)?)
    }

    pub fn supervision_status(&self, name: &str) -> Result<SupervisionStatus, SupervisionError> {
        read_status(&self.read(), &self.edited, name)
    }

    /// Edited series plus its override mask; None for an unknown name
    /// or a revision date predating the series.
    pub fn edited(
        &self,
        name: &str,
        query: &ReadQuery,
    ) -> Result<Option<(TimeSeries, Mask)>, SupervisionError> {
        marker::edited_with_markers(&self.read(), &self.upstream, &self.edited, name, query)
    }

    /// The manual corrections currently in effect, as a series.
    pub fn overrides(
        &self,
        name: &str,
        query: &ReadQuery,
    ) -> Result<Option<TimeSeries>, SupervisionError> {
        marker::overrides(&self.read(), &self.upstream, &self.edited, name, query)
    }

    /// Remove a series from both branches.
    pub fn delete(&self, name: &str) -> Result<(), SupervisionError> {
        let mut shelf = self.shelf.write().expect("store lock poisoned");
        shelf.delete(&self.edited, name)?;
        if shelf.exists(&self.upstream, name) {
            shelf.delete(&self.upstream, name)?;
        }
        tracing::info!(series = name, "series deleted");
        Ok(())
    }

    /// Rename a series on both branches.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), SupervisionError> {
        let mut shelf = self.shelf.write().expect("store lock poisoned");
        if !shelf.exists(&self.edited, old) {
            return Err(StoreError::NotFound(old.to_string()).into());
        }
        if shelf.exists(&self.edited, new) || shelf.exists(&self.upstream, new) {
            return Err(StoreError::AlreadyExists(new.to_string()).into());
        }
        shelf.rename(&self.edited, old, new)?;
        if shelf.exists(&self.upstream, old) {
            shelf.rename(&self.upstream, old, new)?;
        }
        tracing::info!(series = old, renamed = new, "series renamed");
        Ok(())
    }

    /// Drop a revision (and everything after it) from the edited
    /// branch. Refused while supervised: the branches' revision runs
    /// would desynchronize.
    pub fn strip(&self, name: &str, revision: RevisionId) -> Result<(), SupervisionError> {
        let mut shelf = self.shelf.write().expect("store lock poisoned");
        let status = read_status(&shelf, &self.edited, name)?;
        if status == SupervisionStatus::Supervised {
            tracing::warn!(series = name, revision, "strip refused on supervised series");
            return Err(SupervisionError::StripSupervised {
                name: name.to_string(),
            });
        }
        Ok(shelf.strip(&self.edited, name, revision)?)
    }

    /// Insertion audit trail of the edited branch, with the manual
    /// flag folded out of revision metadata.
    pub fn log(&self, name: &str) -> Result<Vec<SupervisedRevision>, SupervisionError> {
        let revisions = self.read().log(&self.edited, name)?;
        Ok(revisions
            .into_iter()
            .map(|revision| SupervisedRevision {
                id: revision.id,
                author: revision.author,
                stamp: revision.stamp,
                manual: revision.metadata.get(EDITED_KEY).map(String::as_str) == Some("true"),
            })
            .collect())
    }

    pub fn upstream_branch(&self) -> Branch {
        Branch::from_parts(Arc::clone(&self.shelf), self.upstream.clone())
    }

    pub fn edited_branch(&self) -> Branch {
        Branch::from_parts(Arc::clone(&self.shelf), self.edited.clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Shelf> {
        self.shelf.read().expect("store lock poisoned")
    }

    fn set_status(
        &self,
        shelf: &mut Shelf,
        name: &str,
        status: SupervisionStatus,
    ) -> Result<(), SupervisionError> {
        let mut patch = BTreeMap::new();
        patch.insert(STATUS_KEY.to_string(), status.as_str().to_string());
        Ok(shelf.update_internal_metadata(&self.edited, name, patch)?)
    }
}

/// Status from internal metadata, validated on every read. Absent
/// metadata (including an unknown series) means unsupervised.
pub(crate) fn read_status(
    shelf: &Shelf,
    edited: &str,
    name: &str,
) -> Result<SupervisionStatus, SupervisionError> {
    if !shelf.exists(edited, name) {
        return Ok(SupervisionStatus::default());
    }
    match shelf.internal_metadata(edited, name)?.get(STATUS_KEY) {
        Some(raw) => Ok(SupervisionStatus::parse(raw)?),
        None => Ok(SupervisionStatus::default()),
    }
}
