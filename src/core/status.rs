//! Layer 2: Supervision status
//!
//! Three-state lifecycle of a series with respect to human corrections.
//! Transitions are one-way: unsupervised -> supervised on the first
//! manual write, handcrafted -> supervised on the first automatic one.
//! Nothing ever demotes a supervised series.

use serde::{Deserialize, Serialize};

use super::error::CoreError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisionStatus {
    /// Only ever fed automatically; no upstream branch exists, the
    /// edited branch mirrors the feed exactly.
    Unsupervised,
    /// Both feed history and manual edits coexist; the upstream branch
    /// holds the full feed history the edited branch is diffed against.
    Supervised,
    /// Born from manual input; no diverging automatic data seen yet.
    Handcrafted,
}

impl SupervisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsupervised => "unsupervised",
            Self::Supervised => "supervised",
            Self::Handcrafted => "handcrafted",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "unsupervised" => Ok(Self::Unsupervised),
            "supervised" => Ok(Self::Supervised),
            "handcrafted" => Ok(Self::Handcrafted),
            _ => Err(CoreError::BadStatus {
                raw: raw.to_string(),
            }),
        }
    }

    /// Status assigned to a brand-new series. A supervised series can
    /// never be created directly.
    pub fn initial(manual: bool) -> Self {
        if manual {
            Self::Handcrafted
        } else {
            Self::Unsupervised
        }
    }
}

impl Default for SupervisionStatus {
    fn default() -> Self {
        Self::Unsupervised
    }
}

impl std::fmt::Display for SupervisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
