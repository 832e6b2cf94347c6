//! Persisted document for one finalized logpose, and the timestamp key it is stored under.

use std::fmt;

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::ParameterBag;

pub const SESSION_SECTION: &str = "session";
pub const ROUTES_SECTION: &str = "subunits";
pub const DESCRIPTION_KEY: &str = "description";
pub const TIME_KEY: &str = "time";

/// `session` section: name, description and total seconds over all routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub description: String,
    pub time: f64,
}

/// A finalized logpose as written to disk. Route order is the order routes were opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub session: SessionSummary,
    #[serde(rename = "subunits", alias = "routes")]
    pub routes: IndexMap<String, ParameterBag>,
}

impl Record {
    /// Parses a document, requiring both top-level sections. The error is a human-readable reason.
    pub fn from_document(document: Value) -> Result<Self, String> {
        let Value::Object(sections) = &document else {
            return Err("document is not an object".into());
        };
        for section in [SESSION_SECTION, ROUTES_SECTION] {
            if !sections.contains_key(section) {
                return Err(format!("missing `{section}` section"));
            }
        }
        serde_json::from_value(document).map_err(|e| e.to_string())
    }

    pub fn route_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn route(&self, name: &str) -> Option<&ParameterBag> {
        self.routes.get(name)
    }

    /// Recorded seconds for `name`, if the route was timed.
    pub fn route_time(&self, name: &str) -> Option<f64> {
        self.routes.get(name)?.get(TIME_KEY)?.as_f64()
    }
}

const KEY_STAMP_LEN: usize = "YYYYMMDD_HHMMSSffffff".len();

/// Storage key `YYYYMMDD_HHMMSSffffff`, optionally followed by `_<n>` when a key collided.
/// Lexicographic order is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self(at.format("%Y%m%d_%H%M%S%6f").to_string())
    }

    /// Validates `raw` as a key: a stamp with an optional `_<n>` suffix.
    pub fn parse(raw: &str) -> Option<Self> {
        let stamp = raw.get(..KEY_STAMP_LEN)?;
        let well_formed = stamp
            .char_indices()
            .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() });
        if !well_formed {
            return None;
        }
        match &raw[KEY_STAMP_LEN..] {
            "" => {}
            suffix => {
                let n = suffix.strip_prefix('_')?;
                if n.is_empty() || !n.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
            }
        }
        Some(Self(raw.to_string()))
    }

    /// Same instant with a collision disambiguator.
    pub fn with_suffix(&self, n: u32) -> Self {
        Self(format!("{}_{n}", self.stamp()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn stamp(&self) -> &str {
        &self.0[..KEY_STAMP_LEN.min(self.0.len())]
    }

    /// Local wall-clock time encoded in the key.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let stamp = self.stamp();
        let seconds = NaiveDateTime::parse_from_str(stamp.get(..15)?, "%Y%m%d_%H%M%S").ok()?;
        let micros: i64 = stamp.get(15..)?.parse().ok()?;
        Some(seconds + ChronoDuration::microseconds(micros))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
