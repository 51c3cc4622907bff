//! Branch handles over the shared shelf.
//!
//! A `Branch` scopes the store API to one branch name. Handles are
//! cheap clones; every public method takes the lock once, which makes
//! each call one transaction. Compound operations that must span
//! branches atomically (the supervision write path) hold the guard
//! themselves and go through the shelf directly.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::OffsetDateTime;

use crate::core::TimeSeries;

use super::{ReadQuery, RevisionId, RevisionInfo, Shelf, StoreError};

/// The in-memory store engine.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shelf: Arc<RwLock<Shelf>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(&self, name: impl Into<String>) -> Branch {
        Branch {
            shelf: Arc::clone(&self.shelf),
            branch: name.into(),
        }
    }

    pub(crate) fn shelf(&self) -> &Arc<RwLock<Shelf>> {
        &self.shelf
    }
}

/// A store handle scoped to one branch.
#[derive(Clone)]
pub struct Branch {
    shelf: Arc<RwLock<Shelf>>,
    branch: String,
}

impl Branch {
    pub(crate) fn from_parts(shelf: Arc<RwLock<Shelf>>, branch: String) -> Self {
        Self { shelf, branch }
    }

    pub fn name(&self) -> &str {
        &self.branch
    }

    pub(crate) fn shelf(&self) -> &Arc<RwLock<Shelf>> {
        &self.shelf
    }

    fn read(&self) -> RwLockReadGuard<'_, Shelf> {
        self.shelf.read().expect("store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Shelf> {
        self.shelf.write().expect("store lock poisoned")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.read().exists(&self.branch, name)
    }

    pub fn get(&self, name: &str, query: &ReadQuery) -> Result<Option<TimeSeries>, StoreError> {
        self.read().get(&self.branch, name, query)
    }

    /// Append `series` as a diff against the current head; returns the
    /// stored diff, empty when the write changes nothing.
    pub fn insert(
        &self,
        name: &str,
        series: &TimeSeries,
        author: &str,
        insertion_date: Option<OffsetDateTime>,
    ) -> Result<TimeSeries, StoreError> {
        let stamp = insertion_date.unwrap_or_else(OffsetDateTime::now_utc);
        self.write()
            .insert(&self.branch, name, series, author, BTreeMap::new(), stamp)
    }

    /// Replace the whole series state; head points absent from the
    /// incoming series are erased.
    pub fn replace(
        &self,
        name: &str,
        series: &TimeSeries,
        author: &str,
        insertion_date: Option<OffsetDateTime>,
    ) -> Result<TimeSeries, StoreError> {
        let stamp = insertion_date.unwrap_or_else(OffsetDateTime::now_utc);
        self.write()
            .replace(&self.branch, name, series, author, BTreeMap::new(), stamp)
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.write().delete(&self.branch, name)
    }

    pub fn rename(&self, old: &str, new: &str) -> Result<(), StoreError> {
        self.write().rename(&self.branch, old, new)
    }

    pub fn strip(&self, name: &str, revision: RevisionId) -> Result<(), StoreError> {
        self.write().strip(&self.branch, name, revision)
    }

    pub fn internal_metadata(&self, name: &str) -> Result<BTreeMap<String, String>, StoreError> {
        self.read().internal_metadata(&self.branch, name)
    }

    pub fn update_internal_metadata(
        &self,
        name: &str,
        patch: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.write().update_internal_metadata(&self.branch, name, patch)
    }

    pub fn log(&self, name: &str) -> Result<Vec<RevisionInfo>, StoreError> {
        self.read().log(&self.branch, name)
    }
}
