//! The one read endpoint, transport-free.
//!
//! An HTTP (or any other) adapter parses its request into an
//! `EditedQuery` and renders the `EditedReply`. Everything in between
//! (horizon resolution, marker reconstruction, grid inference, display
//! offset, output shaping) happens here against the supervisor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::core::{Awareness, CoreError, Mask, SupervisionStatus, TimeSeries, Timestamp};
use crate::error::{Effect, Transience};
use crate::store::ReadQuery;
use crate::supervise::{regrid, Supervisor, SupervisionError};

use super::pack::{pack_pair, PackError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryError {
    #[error("`{0}` does not exist")]
    NotFound(String),

    #[error("`{0}` is not a stored series")]
    Unstored(String),

    #[error("invalid query for `{name}`: {reason}")]
    BadRequest { name: String, reason: String },

    #[error(transparent)]
    Supervision(#[from] SupervisionError),

    #[error(transparent)]
    Pack(#[from] PackError),
}

impl QueryError {
    /// Whether an HTTP adapter should answer 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unstored(_))
    }

    pub fn transience(&self) -> Transience {
        match self {
            Self::Supervision(e) => e.transience(),
            _ => Transience::Permanent,
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::None
    }
}

/// Relative window: bounds derived from a pivot date, resolved before
/// the core is consulted. Overrides explicit from/to bounds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Horizon {
    pub date: Timestamp,
    #[serde(default)]
    pub past: Delta,
    #[serde(default)]
    pub future: Delta,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Delta {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl Delta {
    pub fn days(days: i64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn to_duration(self) -> Duration {
        Duration::days(self.days) + Duration::hours(self.hours) + Duration::minutes(self.minutes)
    }
}

impl Horizon {
    /// `(from, to)` around the pivot; `past` is typically negative.
    pub fn bounds(&self) -> Option<(Timestamp, Timestamp)> {
        let from = self.date.checked_add(self.past.to_duration())?;
        let to = self.date.checked_add(self.future.to_duration())?;
        Some((from, to))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyFormat {
    #[default]
    Json,
    Pack,
}

/// Parameters of the read endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EditedQuery {
    pub name: String,
    /// As-of revision.
    #[serde(default)]
    pub insertion_date: Option<Timestamp>,
    #[serde(default)]
    pub from_value_date: Option<Timestamp>,
    #[serde(default)]
    pub to_value_date: Option<Timestamp>,
    #[serde(default)]
    pub horizon: Option<Horizon>,
    #[serde(default)]
    pub inferred_freq: bool,
    /// Display offset for zone-aware series: `UTC`, `Z` or `+HH:MM`.
    #[serde(default)]
    pub tzone: Option<String>,
    #[serde(default, rename = "_keep_nans")]
    pub keep_nans: bool,
    #[serde(default)]
    pub format: ReplyFormat,
}

impl EditedQuery {
    pub fn for_series(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            insertion_date: None,
            from_value_date: None,
            to_value_date: None,
            horizon: None,
            inferred_freq: false,
            tzone: None,
            keep_nans: false,
            format: ReplyFormat::Json,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditedReply {
    /// Mapping from canonical timestamp to `{series, markers}` rows;
    /// `Value::Null` when the requested revision predates the series.
    Json(Value),
    Packed(Vec<u8>),
}

#[derive(Serialize)]
struct Row {
    series: Value,
    markers: bool,
}

/// The query boundary over a supervisor. An embedder whose namespace
/// also resolves computed (non-stored) series plugs in a filter so
/// those names answer not-found instead of leaking edited-branch data.
pub struct QuerySurface {
    supervisor: Supervisor,
    unstored: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl QuerySurface {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor,
            unstored: None,
        }
    }

    pub fn with_unstored_filter(
        mut self,
        filter: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.unstored = Some(Box::new(filter));
        self
    }

    pub fn supervision_status(&self, name: &str) -> Result<SupervisionStatus, QueryError> {
        if !self.supervisor.exists(name) {
            return Err(QueryError::NotFound(name.to_string()));
        }
        Ok(self.supervisor.supervision_status(name)?)
    }

    pub fn edited(&self, query: &EditedQuery) -> Result<EditedReply, QueryError> {
        let name = query.name.as_str();
        if !self.supervisor.exists(name) {
            return Err(QueryError::NotFound(name.to_string()));
        }
        if let Some(unstored) = &self.unstored {
            if unstored(name) {
                return Err(QueryError::Unstored(name.to_string()));
            }
        }

        let (from, to) = match &query.horizon {
            Some(horizon) => {
                let (from, to) = horizon.bounds().ok_or_else(|| QueryError::BadRequest {
                    name: name.to_string(),
                    reason: "horizon bounds out of range".to_string(),
                })?;
                (Some(from), Some(to))
            }
            None => (query.from_value_date, query.to_value_date),
        };

        let read = ReadQuery {
            revision_date: query.insertion_date.map(as_insertion_date),
            from_value_date: from,
            to_value_date: to,
            keep_missing: query.keep_nans,
        };
        tracing::debug!(series = name, inferred_freq = query.inferred_freq, "edited query");

        let Some((mut series, mut markers)) = self.supervisor.edited(name, &read)? else {
            // known name, but the as-of revision predates it
            return Ok(match query.format {
                ReplyFormat::Json => EditedReply::Json(Value::Null),
                ReplyFormat::Pack => {
                    EditedReply::Packed(pack_pair(name, &TimeSeries::new(), &Mask::new())?)
                }
            });
        };

        if query.inferred_freq {
            (series, markers) = regrid::regrid(&series, &markers, from, to);
        }

        if let Some(tzone) = &query.tzone {
            let offset = parse_utc_offset(tzone).map_err(|e| QueryError::BadRequest {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            if series.awareness() == Some(Awareness::Naive) {
                return Err(QueryError::BadRequest {
                    name: name.to_string(),
                    reason: "cannot shift a naive series to a display offset".to_string(),
                });
            }
            series = series.map_index(|at| at.at_offset(offset));
            markers = markers.map_index(|at| at.at_offset(offset));
        }

        match query.format {
            ReplyFormat::Pack => Ok(EditedReply::Packed(pack_pair(name, &series, &markers)?)),
            ReplyFormat::Json => {
                let mut rows = serde_json::Map::new();
                let index: Vec<Timestamp> =
                    crate::core::join_index(Some(&series), Some(&markers)).unwrap_or_default();
                for at in index {
                    let value = series
                        .get(&at)
                        .and_then(Option::as_ref)
                        .map(|scalar| scalar.to_json())
                        .unwrap_or(Value::Null);
                    let row = Row {
                        series: value,
                        markers: markers.get(&at).copied().unwrap_or(false),
                    };
                    rows.insert(
                        at.to_string(),
                        serde_json::to_value(row).unwrap_or(Value::Null),
                    );
                }
                Ok(EditedReply::Json(Value::Object(rows)))
            }
        }
    }
}

fn as_insertion_date(at: Timestamp) -> OffsetDateTime {
    match at {
        Timestamp::Zoned(dt) => dt,
        Timestamp::Naive(dt) => dt.assume_utc(),
    }
}

/// Fixed display offsets only; named zones would need a tz database.
fn parse_utc_offset(raw: &str) -> Result<UtcOffset, CoreError> {
    let bad = || CoreError::BadOffset {
        raw: raw.to_string(),
    };
    match raw {
        "UTC" | "utc" | "Z" | "z" => return Ok(UtcOffset::UTC),
        _ => {}
    }
    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1i8, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1i8, rest)
    } else {
        return Err(bad());
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None => (rest, "0"),
    };
    let hours: i8 = hours.parse().map_err(|_| bad())?;
    let minutes: i8 = minutes.parse().map_err(|_| bad())?;
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_offset_forms() {
        assert_eq!(parse_utc_offset("UTC").unwrap(), UtcOffset::UTC);
        assert_eq!(parse_utc_offset("Z").unwrap(), UtcOffset::UTC);
        assert_eq!(
            parse_utc_offset("+02:00").unwrap(),
            UtcOffset::from_hms(2, 0, 0).unwrap()
        );
        assert_eq!(
            parse_utc_offset("-05:30").unwrap(),
            UtcOffset::from_hms(-5, -30, 0).unwrap()
        );
        assert!(parse_utc_offset("Europe/Paris").is_err());
    }

    #[test]
    fn horizon_resolves_around_the_pivot() {
        let horizon = Horizon {
            date: Timestamp::parse("2023-02-01").unwrap(),
            past: Delta::days(-2),
            future: Delta::days(1),
        };
        let (from, to) = horizon.bounds().unwrap();
        assert_eq!(from, Timestamp::parse("2023-01-30").unwrap());
        assert_eq!(to, Timestamp::parse("2023-02-02").unwrap());
    }
}
