//! Core capability errors (parsing, series construction).
//!
//! Bounded and stable: these represent domain refusal states, not
//! library implementation details.

use thiserror::Error;

use crate::error::{Effect, Transience};

#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error("timestamp `{raw}` is not a recognized date or datetime")]
    BadTimestamp { raw: String },

    #[error("series mixes naive and timezone-aware timestamps")]
    MixedAwareness,

    #[error("series mixes float and text values")]
    MixedValueKinds,

    #[error("supervision status `{raw}` is invalid")]
    BadStatus { raw: String },

    #[error("utc offset `{raw}` is invalid (expected UTC, Z or +HH:MM)")]
    BadOffset { raw: String },
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Pure input failures.
        Transience::Permanent
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}
