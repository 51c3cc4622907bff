#![forbid(unsafe_code)]

//! Supervised time series.
//!
//! Automatic feeds and human corrections write to the same named
//! series; the overlay keeps them on two store branches so a fix
//! survives a stale refetch, a genuinely new upstream value supersedes
//! the fix, and a read can always say which points are currently
//! human-authored.

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod store;
pub mod supervise;
pub mod telemetry;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the working set at crate root for convenience
pub use crate::api::{EditedQuery, EditedReply, QuerySurface};
pub use crate::config::{BranchConfig, Config};
pub use crate::core::{
    Awareness, Mask, Scalar, ScalarKind, Series, SupervisionStatus, TimeSeries, Timestamp,
};
pub use crate::store::{Branch, MemoryStore, ReadQuery, RevisionId};
pub use crate::supervise::{Supervisor, Update};
