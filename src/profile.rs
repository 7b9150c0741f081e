//! The hourly profile: one record per analysis hour, merged from one or more model series.
//!
//! Raw fields hold whatever the sources supplied. Derived fields (cloud base, lapse rate, W*, gust
//! factor) are always recomputed from the merged raw values with [`HourRow::derive`].
use crate::{
    formulas::{cloud_base_msl, gust_factor, lapse_rate, wstar},
    keys::{Model, Param},
    utility::{hour_label, round_to},
};
use metfor::{Celsius, JpKg, Meters, MetersPSec, Quantity};
use optional::{Noned, Optioned};
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{collections::BTreeMap, fmt::Display, str::FromStr};

mod builder;
mod providers;

pub use self::builder::{FamilyChains, FamilySelection, MergeConfig, MergeMode, ProfileBuilder};
pub use self::providers::{PriorityList, Provider};

/// Where a merged value came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldSource {
    /// A single model.
    Model(Model),
    /// The straight average of two models.
    Averaged(Model, Model),
    /// A per-slot tag that does not name a known model.
    Tag(String),
}

impl FieldSource {
    /// Interpret a per-slot provenance tag.
    pub fn from_tag(tag: &str) -> Self {
        Model::from_str(tag)
            .map(FieldSource::Model)
            .unwrap_or_else(|_| FieldSource::Tag(tag.to_owned()))
    }
}

impl Display for FieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FieldSource::Model(m) => write!(f, "{}", m.as_ref()),
            FieldSource::Averaged(a, b) => write!(f, "avg({}+{})", a.as_ref(), b.as_ref()),
            FieldSource::Tag(tag) => write!(f, "{}", tag),
        }
    }
}

impl Serialize for FieldSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Provenance of one hour: the source of most fields plus the fields that came from elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Provenance {
    primary: Option<FieldSource>,
    overrides: BTreeMap<Param, FieldSource>,
}

impl Provenance {
    /// Build from the source of every field that has a value, in field order.
    ///
    /// The primary source is the one that contributed the most fields, the first seen wins a tie.
    pub fn from_field_sources(sources: &[(Param, FieldSource)]) -> Self {
        let mut counts: Vec<(&FieldSource, usize)> = vec![];
        for (_, src) in sources {
            match counts.iter_mut().find(|(s, _)| *s == src) {
                Some((_, n)) => *n += 1,
                None => counts.push((src, 1)),
            }
        }

        let mut primary: Option<(&FieldSource, usize)> = None;
        for (src, n) in counts {
            if primary.map(|(_, best)| n > best).unwrap_or(true) {
                primary = Some((src, n));
            }
        }
        let primary = primary.map(|(src, _)| src.clone());

        let overrides = sources
            .iter()
            .filter(|(_, src)| Some(src) != primary.as_ref())
            .cloned()
            .collect();

        Provenance { primary, overrides }
    }

    /// The majority source.
    pub fn primary(&self) -> Option<&FieldSource> {
        self.primary.as_ref()
    }

    /// Fields whose source differs from the primary one.
    pub fn overrides(&self) -> &BTreeMap<Param, FieldSource> {
        &self.overrides
    }

    /// The recorded source of a field.
    pub fn source_of(&self, param: Param) -> Option<&FieldSource> {
        self.overrides.get(&param).or(self.primary.as_ref())
    }
}

/// One hour of a profile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HourRow {
    /// Local hour of day.
    pub hour: u32,

    /// 2 m temperature
    pub temperature: Optioned<Celsius>,
    /// 2 m dew point
    pub dew_point: Optioned<Celsius>,
    /// Total cloud cover in percent
    pub cloud_cover: Optioned<f64>,
    /// Low cloud cover in percent
    pub cloud_low: Optioned<f64>,
    /// Mid cloud cover in percent
    pub cloud_mid: Optioned<f64>,
    /// High cloud cover in percent
    pub cloud_high: Optioned<f64>,
    /// Precipitation rate in mm/h
    pub precipitation: Optioned<f64>,
    /// 10 m wind speed
    pub wind_10m: Optioned<MetersPSec>,
    /// 10 m gusts
    pub gusts: Optioned<MetersPSec>,
    pub wind_850: Optioned<MetersPSec>,
    pub wind_700: Optioned<MetersPSec>,
    pub rh_850: Optioned<f64>,
    pub rh_700: Optioned<f64>,
    pub t850: Optioned<Celsius>,
    pub t700: Optioned<Celsius>,
    /// Boundary layer depth
    pub bl_height: Optioned<Meters>,
    pub cape: Optioned<JpKg>,
    pub cin: Optioned<JpKg>,
    pub lifted_index: Optioned<f64>,
    /// Shortwave radiation in W/m²
    pub shortwave: Optioned<f64>,
    /// Model native convective updraft
    pub updraft: Optioned<MetersPSec>,

    // Derived
    pub cloud_base: Optioned<Meters>,
    pub gust_factor: Optioned<MetersPSec>,
    /// Lapse rate 850-700 hPa in C/km
    pub lapse_rate: Optioned<f64>,
    pub wstar: Optioned<MetersPSec>,

    pub provenance: Provenance,
}

fn unpack<T>(val: Optioned<T>) -> Option<f64>
where
    T: Quantity + Noned + Copy,
{
    val.into_option().map(Quantity::unpack)
}

impl HourRow {
    /// Create an empty row for an hour.
    pub fn new(hour: u32) -> Self {
        HourRow {
            hour,
            ..Default::default()
        }
    }

    /// Raw value of a parameter, as named in the source series.
    pub fn raw(&self, param: Param) -> Option<f64> {
        use crate::keys::Param::*;

        match param {
            Temperature2m => unpack(self.temperature),
            DewPoint2m => unpack(self.dew_point),
            RelativeHumidity2m => None,
            CloudCover => self.cloud_cover.into_option(),
            CloudCoverLow => self.cloud_low.into_option(),
            CloudCoverMid => self.cloud_mid.into_option(),
            CloudCoverHigh => self.cloud_high.into_option(),
            Precipitation => self.precipitation.into_option(),
            WindSpeed10m => unpack(self.wind_10m),
            WindGusts10m => unpack(self.gusts),
            WindSpeed850 => unpack(self.wind_850),
            WindSpeed700 => unpack(self.wind_700),
            Temperature850 => unpack(self.t850),
            Temperature700 => unpack(self.t700),
            RelativeHumidity850 => self.rh_850.into_option(),
            RelativeHumidity700 => self.rh_700.into_option(),
            ShortwaveRadiation => self.shortwave.into_option(),
            Cape => unpack(self.cape),
            ConvectiveInhibition => unpack(self.cin),
            LiftedIndex => self.lifted_index.into_option(),
            BoundaryLayerHeight => unpack(self.bl_height),
            Updraft => unpack(self.updraft),
        }
    }

    /// Set the raw value of a parameter. Parameters the profile does not carry are ignored.
    pub fn set_raw(&mut self, param: Param, value: Option<f64>) {
        use crate::keys::Param::*;

        match param {
            Temperature2m => self.temperature = value.map(Celsius).into(),
            DewPoint2m => self.dew_point = value.map(Celsius).into(),
            RelativeHumidity2m => {}
            CloudCover => self.cloud_cover = value.into(),
            CloudCoverLow => self.cloud_low = value.into(),
            CloudCoverMid => self.cloud_mid = value.into(),
            CloudCoverHigh => self.cloud_high = value.into(),
            Precipitation => self.precipitation = value.into(),
            WindSpeed10m => self.wind_10m = value.map(MetersPSec).into(),
            WindGusts10m => self.gusts = value.map(MetersPSec).into(),
            WindSpeed850 => self.wind_850 = value.map(MetersPSec).into(),
            WindSpeed700 => self.wind_700 = value.map(MetersPSec).into(),
            Temperature850 => self.t850 = value.map(Celsius).into(),
            Temperature700 => self.t700 = value.map(Celsius).into(),
            RelativeHumidity850 => self.rh_850 = value.into(),
            RelativeHumidity700 => self.rh_700 = value.into(),
            ShortwaveRadiation => self.shortwave = value.into(),
            Cape => self.cape = value.map(JpKg).into(),
            ConvectiveInhibition => self.cin = value.map(JpKg).into(),
            LiftedIndex => self.lifted_index = value.into(),
            BoundaryLayerHeight => self.bl_height = value.map(Meters).into(),
            Updraft => {
                self.updraft = value.map(|v| MetersPSec(round_to(v, 2))).into();
            }
        }
    }

    /// Recompute every derived field from the raw values of this row.
    pub fn derive(&mut self, elevation: Meters) {
        let t = self.temperature.into_option();

        self.cloud_base = cloud_base_msl(t, self.dew_point.into_option(), elevation).into();
        self.lapse_rate = lapse_rate(self.t850.into_option(), self.t700.into_option()).into();
        self.wstar = wstar(
            self.bl_height.into_option(),
            self.shortwave.into_option(),
            t,
        )
        .into();
        self.gust_factor = gust_factor(self.gusts.into_option(), self.wind_10m.into_option()).into();
    }
}

impl Serialize for HourRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields: [(&str, Option<f64>); 25] = [
            ("temp_2m", unpack(self.temperature)),
            ("dewpoint", unpack(self.dew_point)),
            ("cloudbase_msl", unpack(self.cloud_base)),
            ("cloudcover", self.cloud_cover.into_option()),
            ("cloudcover_low", self.cloud_low.into_option()),
            ("cloudcover_mid", self.cloud_mid.into_option()),
            ("cloudcover_high", self.cloud_high.into_option()),
            ("precipitation", self.precipitation.into_option()),
            ("wind_10m", unpack(self.wind_10m)),
            ("gusts", unpack(self.gusts)),
            ("gust_factor", unpack(self.gust_factor)),
            ("wind_850", unpack(self.wind_850)),
            ("wind_700", unpack(self.wind_700)),
            ("rh_850", self.rh_850.into_option()),
            ("rh_700", self.rh_700.into_option()),
            ("t850", unpack(self.t850)),
            ("t700", unpack(self.t700)),
            ("lapse_rate", self.lapse_rate.into_option()),
            ("bl_height", unpack(self.bl_height)),
            ("cape", unpack(self.cape)),
            ("cin", unpack(self.cin)),
            ("lifted_index", self.lifted_index.into_option()),
            ("shortwave_radiation", self.shortwave.into_option()),
            ("updraft", unpack(self.updraft)),
            ("wstar", unpack(self.wstar)),
        ];

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("hour", &hour_label(self.hour))?;
        for (key, val) in fields.iter() {
            map.serialize_entry(key, val)?;
        }
        map.serialize_entry("_src", &self.provenance.primary())?;
        if self.provenance.overrides().is_empty() {
            map.serialize_entry("_src_overrides", &None::<()>)?;
        } else {
            map.serialize_entry("_src_overrides", self.provenance.overrides())?;
        }
        map.end()
    }
}

/// Chronological hourly records for one location and date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HourlyProfile {
    rows: Vec<HourRow>,
}

impl HourlyProfile {
    /// Create a profile from rows, sorted by hour.
    pub fn new(mut rows: Vec<HourRow>) -> Self {
        rows.sort_by_key(|row| row.hour);
        HourlyProfile { rows }
    }

    /// All rows in chronological order.
    pub fn rows(&self) -> &[HourRow] {
        &self.rows
    }

    /// Number of hours.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no hours at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The row of an hour.
    pub fn at(&self, hour: u32) -> Option<&HourRow> {
        self.rows.iter().find(|row| row.hour == hour)
    }

    /// Rows whose hour lies in the inclusive range.
    pub fn between(&self, start: u32, end: u32) -> impl Iterator<Item = &HourRow> {
        self.rows
            .iter()
            .filter(move |row| row.hour >= start && row.hour <= end)
    }

    /// Non-missing values of a field over an inclusive range of hours, in order.
    pub fn values_between<F>(&self, start: u32, end: u32, field: F) -> Vec<f64>
    where
        F: Fn(&HourRow) -> Option<f64>,
    {
        self.between(start, end).filter_map(field).collect()
    }
}

impl Serialize for HourlyProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.iter())
    }
}
