//! Per-source summaries: the value of every parameter at the reference hour and simple
//! statistics over the analysis window.
use super::HourlySeries;
use crate::{
    keys::Model,
    utility::{max, mean, min, round_to},
};
use chrono::NaiveDate;
use serde::Serialize;
use std::{collections::BTreeMap, str::FromStr};

/// Direction of change between the start and the end of the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Late values above 130% of early values.
    Rising,
    /// Late values below 70% of early values.
    Falling,
    /// Anything in between.
    Stable,
}

/// Statistics of one parameter over the analysis window.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParamStats {
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    /// Number of non-missing values.
    pub n: usize,
    /// First two values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub head: Vec<f64>,
    /// Last two values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tail: Vec<f64>,
    /// Only computed with at least four values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

/// Summary of one fetched source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceSummary {
    pub model_id: String,
    pub model_label: String,
    pub at_13_local: BTreeMap<String, Option<f64>>,
    pub thermal_window_stats: BTreeMap<String, ParamStats>,
}

fn trend(values: &[f64]) -> Option<Trend> {
    if values.len() < 4 {
        return None;
    }

    let early = mean(&values[..2])?;
    let late = mean(&values[values.len() - 2..])?;

    let trend = if early == 0.0 {
        if late == 0.0 {
            Trend::Stable
        } else {
            Trend::Rising
        }
    } else if late > early * 1.3 {
        Trend::Rising
    } else if late < early * 0.7 {
        Trend::Falling
    } else {
        Trend::Stable
    };

    Some(trend)
}

/// Compute window statistics of a list of values, missing values already removed.
pub fn param_stats(values: &[f64]) -> ParamStats {
    if values.is_empty() {
        return ParamStats::default();
    }

    let rnd = |v: f64| round_to(v, 2);
    let tail_start = values.len().saturating_sub(2);

    ParamStats {
        min: min(values).map(rnd),
        mean: mean(values).map(rnd),
        max: max(values).map(rnd),
        n: values.len(),
        head: values.iter().take(2).cloned().map(rnd).collect(),
        tail: values[tail_start..].iter().cloned().map(rnd).collect(),
        trend: trend(values),
    }
}

/// Summarize a series for a date.
///
/// # Arguments
///  - key is the bag key of the source, also used as its id.
///  - reference_hour is the local hour of the instantaneous snapshot.
///  - window is the inclusive range of local hours for the statistics.
pub fn summarize(
    key: &str,
    series: &HourlySeries,
    date: NaiveDate,
    reference_hour: u32,
    window: (u32, u32),
) -> SourceSummary {
    let idxs: Vec<usize> = (window.0..=window.1)
        .filter_map(|h| series.hour_index(date, h))
        .collect();

    let thermal_window_stats = if idxs.is_empty() {
        BTreeMap::new()
    } else {
        series
            .params
            .keys()
            .map(|k| {
                let vals: Vec<f64> = idxs.iter().filter_map(|&i| series.value(k, i)).collect();
                (k.clone(), param_stats(&vals))
            })
            .collect()
    };

    let model_label = Model::from_str(key)
        .map(|m| m.label().to_owned())
        .unwrap_or_else(|_| key.to_owned());

    SourceSummary {
        model_id: key.to_owned(),
        model_label,
        at_13_local: series.snapshot(date, reference_hour),
        thermal_window_stats,
    }
}
