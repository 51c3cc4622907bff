//! Append-only revisioned series store.
//!
//! One shelf holds every branch; a `Branch` is a cheap handle scoped to
//! one branch name. Each series is an ordered run of revisions, every
//! revision carrying the minimal diff against the prior head. Reads
//! materialize by folding diffs, optionally stopping at an as-of
//! insertion date and restricting to a value-date window.

mod branch;
mod shelf;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::core::{Awareness, ScalarKind, Timestamp};
use crate::error::{Effect, Transience};

pub use branch::{Branch, MemoryStore};
pub(crate) use shelf::Shelf;

/// 1-based position of a revision in a series' insertion history.
pub type RevisionId = u64;

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no series named `{0}`")]
    NotFound(String),

    #[error("series `{0}` already exists")]
    AlreadyExists(String),

    #[error("type error when inserting `{name}`: new type is {new}, type in base is {base}")]
    TypeMismatch {
        name: String,
        new: ScalarKind,
        base: ScalarKind,
    },

    #[error("series `{name}` is {base} but the incoming data is {new}")]
    AwarenessMismatch {
        name: String,
        new: Awareness,
        base: Awareness,
    },

    #[error("series `{name}` has no revision {revision}")]
    UnknownRevision { name: String, revision: RevisionId },
}

impl StoreError {
    pub fn transience(&self) -> Transience {
        // Input/state refusals; retrying without changing inputs never helps.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        // Every operation validates before mutating.
        Effect::None
    }
}

/// Parameters of a read: as-of revision, value-date window, and whether
/// explicit missing slots survive into the result.
#[derive(Clone, Debug, Default)]
pub struct ReadQuery {
    pub revision_date: Option<OffsetDateTime>,
    pub from_value_date: Option<Timestamp>,
    pub to_value_date: Option<Timestamp>,
    pub keep_missing: bool,
}

impl ReadQuery {
    pub fn latest() -> Self {
        Self::default()
    }

    pub fn as_of(revision_date: OffsetDateTime) -> Self {
        Self {
            revision_date: Some(revision_date),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        self.from_value_date = from;
        self.to_value_date = to;
        self
    }

    pub fn retain_missing(mut self) -> Self {
        self.keep_missing = true;
        self
    }
}

/// One entry of a series' insertion audit trail.
#[derive(Clone, Debug, Serialize)]
pub struct RevisionInfo {
    pub id: RevisionId,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub stamp: OffsetDateTime,
    pub metadata: BTreeMap<String, String>,
}
