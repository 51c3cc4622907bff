//! Layer 1: Series values
//!
//! A series carries either floats or text, fixed at first insertion.
//! NaN floats are the upstream world's way of spelling "no value"; they
//! are normalized to an explicit missing slot at the series boundary, so
//! stored scalars always compare with plain equality.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value kind of a series, settled by the first typed write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Float,
    Text,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single series value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Float(_) => ScalarKind::Float,
            Self::Text(_) => ScalarKind::Text,
        }
    }

    /// NaN spells "missing", not a value.
    pub fn is_missing_sentinel(&self) -> bool {
        matches!(self, Self::Float(f) if f.is_nan())
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_a_missing_sentinel_and_selfequal() {
        let nan = Scalar::Float(f64::NAN);
        assert!(nan.is_missing_sentinel());
        assert_eq!(nan, Scalar::Float(f64::NAN));
        assert!(!Scalar::Float(1.0).is_missing_sentinel());
    }

    #[test]
    fn kinds_never_compare_equal() {
        assert_ne!(Scalar::Float(1.0), Scalar::Text("1.0".into()));
    }
}
