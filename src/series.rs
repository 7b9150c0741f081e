//! The normalized hourly series every weather source adapter produces, and the bag of sources
//! collected for one location.
//!
//! A series is a `time` axis of local time strings plus named parameter arrays aligned to it.
//! Missing values are `null`, absent parameters are absent keys.
use crate::{
    error::{Result, TriageError},
    keys::Model,
    thermals::CapturedPayload,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, str::FromStr};
use tracing::warn;

pub mod stats;

/// Hourly parameter arrays on a shared local time axis.
///
/// Keys holding anything but an array, like `utc_offset_seconds` or `units`, are response
/// metadata and are skipped when decoding.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct HourlySeries {
    /// Local times, `YYYY-MM-DDTHH:MM`, optionally with seconds, or a bare `HH:MM`.
    pub time: Vec<String>,
    /// Optional per-slot provenance tag, for blended series that mix models over time.
    #[serde(rename = "_src", default, skip_serializing_if = "Option::is_none")]
    pub slot_sources: Option<Vec<Option<String>>>,
    /// Parameter arrays keyed by name.
    #[serde(flatten)]
    pub params: BTreeMap<String, Vec<Option<f64>>>,
}

/// A series as it arrives, before the parameter arrays are checked.
#[derive(Deserialize)]
struct RawSeries {
    time: Vec<String>,
    #[serde(rename = "_src", default)]
    slot_sources: Option<Vec<Option<String>>>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl TryFrom<RawSeries> for HourlySeries {
    type Error = TriageError;

    fn try_from(raw: RawSeries) -> Result<Self> {
        let mut params = BTreeMap::new();

        for (key, value) in raw.fields {
            let vals = match value {
                Value::Array(vals) => vals,
                _ => continue,
            };

            let vals = vals
                .into_iter()
                .enumerate()
                .map(|(slot, v)| match v {
                    Value::Null => Ok(None),
                    Value::Number(n) => Ok(n.as_f64()),
                    _ => Err(TriageError::MalformedValue {
                        param: key.clone(),
                        slot,
                    }),
                })
                .collect::<Result<Vec<_>>>()?;

            params.insert(key, vals);
        }

        Ok(HourlySeries {
            time: raw.time,
            slot_sources: raw.slot_sources,
            params,
        })
    }
}

/// Parse a time slot into an optional date and the hour of day.
fn parse_slot(slot: &str) -> Option<(Option<NaiveDate>, u32)> {
    let slot = slot.trim();

    for fmt in &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(slot, fmt) {
            return Some((Some(dt.date()), dt.hour()));
        }
    }

    NaiveTime::parse_from_str(slot, "%H:%M")
        .ok()
        .map(|t| (None, t.hour()))
}

impl HourlySeries {
    /// Create an empty series on a time axis.
    pub fn new(time: Vec<String>) -> Self {
        HourlySeries {
            time,
            ..Default::default()
        }
    }

    /// Add a parameter array.
    pub fn with_param<S: Into<String>>(mut self, key: S, values: Vec<Option<f64>>) -> Self {
        self.params.insert(key.into(), values);
        self
    }

    /// Attach per-slot provenance tags.
    pub fn with_slot_sources(mut self, tags: Vec<Option<String>>) -> Self {
        self.slot_sources = Some(tags);
        self
    }

    /// Check that every array lines up with the time axis.
    pub fn validate(&self) -> Result<()> {
        let expected = self.time.len();

        for (key, vals) in self.params.iter() {
            if vals.len() != expected {
                return Err(TriageError::MalformedSeries {
                    param: key.clone(),
                    expected,
                    found: vals.len(),
                });
            }
        }

        if let Some(tags) = &self.slot_sources {
            if tags.len() != expected {
                return Err(TriageError::MalformedSeries {
                    param: "_src".to_owned(),
                    expected,
                    found: tags.len(),
                });
            }
        }

        Ok(())
    }

    /// Index of the slot for a local date and hour.
    ///
    /// A bare `HH:MM` slot carries no date and matches any date.
    pub fn hour_index(&self, date: NaiveDate, hour: u32) -> Option<usize> {
        self.time.iter().position(|slot| match parse_slot(slot) {
            Some((Some(d), h)) => d == date && h == hour,
            Some((None, h)) => h == hour,
            None => false,
        })
    }

    /// Raw value of any key, including ensemble percentile keys like `cape_p50`.
    pub fn value(&self, key: &str, idx: usize) -> Option<f64> {
        self.params
            .get(key)
            .and_then(|vals| vals.get(idx))
            .and_then(|v| *v)
    }

    /// Value of a key at a local date and hour.
    pub fn value_at(&self, key: &str, date: NaiveDate, hour: u32) -> Option<f64> {
        self.hour_index(date, hour)
            .and_then(|idx| self.value(key, idx))
    }

    /// Provenance tag of a slot, if the series carries one.
    pub fn slot_source(&self, idx: usize) -> Option<&str> {
        self.slot_sources
            .as_ref()
            .and_then(|tags| tags.get(idx))
            .and_then(|t| t.as_deref())
    }

    /// Whether the series covers the date and holds at least one real value.
    pub fn has_data_for(&self, date: NaiveDate) -> bool {
        let covers_date = self.time.iter().any(|slot| match parse_slot(slot) {
            Some((Some(d), _)) => d == date,
            Some((None, _)) => true,
            None => false,
        });

        covers_date
            && self
                .params
                .values()
                .any(|vals| vals.iter().any(Option::is_some))
    }

    /// Snapshot of every parameter at one local hour. Empty if the hour is not on the axis.
    pub fn snapshot(&self, date: NaiveDate, hour: u32) -> BTreeMap<String, Option<f64>> {
        match self.hour_index(date, hour) {
            Some(idx) => self
                .params
                .keys()
                .map(|k| (k.clone(), self.value(k, idx)))
                .collect(),
            None => BTreeMap::new(),
        }
    }
}

/// One entry of a source bag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceEntry {
    /// The fetch failed; the message is kept for the report.
    Failed {
        /// What went wrong.
        error: String,
    },
    /// Raw payloads captured from an external site.
    Captured {
        /// Captured API responses.
        captured_api: Vec<CapturedPayload>,
    },
    /// A normalized hourly series.
    Series(HourlySeries),
}

impl SourceEntry {
    /// Decode one entry of a bag.
    ///
    /// Series errors are reported as such rather than as a mismatch of every entry kind.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        if value.get("error").is_some() || value.get("captured_api").is_some() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(SourceEntry::Series)
        }
    }
}

/// Every source fetched for one location and date, keyed by source name.
///
/// Entries are decoded one at a time. An entry that cannot be decoded becomes a failure entry so
/// the rest of the bag stays usable.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SourceBag {
    entries: BTreeMap<String, SourceEntry>,
}

impl<'de> Deserialize<'de> for SourceBag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;

        let entries = raw
            .into_iter()
            .map(|(key, value)| {
                let entry = SourceEntry::from_value(value).unwrap_or_else(|err| {
                    warn!(source = key.as_str(), %err, "unreadable source");
                    SourceEntry::Failed {
                        error: format!("unreadable source: {}", err),
                    }
                });
                (key, entry)
            })
            .collect();

        Ok(SourceBag { entries })
    }
}

impl SourceBag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any entry with the same key.
    pub fn with_entry<S: Into<String>>(mut self, key: S, entry: SourceEntry) -> Self {
        self.entries.insert(key.into(), entry);
        self
    }

    /// Add a series for a model.
    pub fn with_series(self, model: Model, series: HourlySeries) -> Self {
        self.with_entry(model.as_ref(), SourceEntry::Series(series))
    }

    /// Insert an entry.
    pub fn insert<S: Into<String>>(&mut self, key: S, entry: SourceEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Look up an entry.
    pub fn entry(&self, key: &str) -> Option<&SourceEntry> {
        self.entries.get(key)
    }

    /// The series stored under a key, if that entry is a series.
    pub fn series(&self, key: &str) -> Option<&HourlySeries> {
        match self.entries.get(key) {
            Some(SourceEntry::Series(series)) => Some(series),
            _ => None,
        }
    }

    /// The series of a model.
    pub fn model_series(&self, model: Model) -> Option<&HourlySeries> {
        self.series(model.as_ref())
    }

    /// Replace the series of a model.
    pub fn replace_series(&mut self, model: Model, series: HourlySeries) {
        self.insert(model.as_ref(), SourceEntry::Series(series));
    }

    /// Captured payloads stored under a key.
    pub fn captured(&self, key: &str) -> Option<&[CapturedPayload]> {
        match self.entries.get(key) {
            Some(SourceEntry::Captured { captured_api }) => Some(captured_api),
            _ => None,
        }
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SourceEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over the series entries whose key names a known model.
    pub fn model_series_iter(&self) -> impl Iterator<Item = (Model, &HourlySeries)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            SourceEntry::Series(series) => Model::from_str(k).ok().map(|m| (m, series)),
            _ => None,
        })
    }

    /// Remove series that fail validation, returning the reasons.
    pub fn drop_malformed(&mut self) -> Vec<(String, TriageError)> {
        let bad: Vec<(String, TriageError)> = self
            .entries
            .iter()
            .filter_map(|(k, v)| match v {
                SourceEntry::Series(series) => series.validate().err().map(|e| (k.clone(), e)),
                _ => None,
            })
            .collect();

        for (key, _) in bad.iter() {
            self.entries.remove(key);
        }

        bad
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag holds nothing at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What an adapter delivered for one location: a bag, or a location level failure.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LocationSources {
    /// The whole location failed upstream.
    Failed {
        /// What went wrong.
        error: String,
    },
    /// The fetched sources.
    Bag(SourceBag),
}

impl FromStr for LocationSources {
    type Err = TriageError;

    fn from_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| TriageError::SourceBag {
            origin: "<json>".to_owned(),
            reason: err.to_string(),
        })
    }
}
