//! Thermal forecasts captured from an external site, used to nudge an assessment.
//!
//! The payload holds a vertical profile of thermal strength for each hour:
//!
//! ```json
//! {"data": {"13:00": {"pblh": 2100, "ths": [0.4, 1.2, 0.8, 0.0], "z": [800, 1200, 1600, 2000]}}}
//! ```
use crate::{
    flags::{Flag, Tag},
    series::SourceBag,
    status::Status,
    utility::{hour_label, round_to},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One captured API response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapturedPayload {
    /// Content type, `json` for the responses this module reads.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ThermalPayload {
    #[serde(default)]
    data: BTreeMap<String, ThermalHour>,
}

#[derive(Debug, Default, Deserialize)]
struct ThermalHour {
    #[serde(default)]
    pblh: Option<f64>,
    /// Thermal strength per level, m/s.
    #[serde(default)]
    ths: Vec<Option<f64>>,
    /// Level heights, m.
    #[serde(default)]
    z: Vec<Option<f64>>,
}

/// Where to find the captured thermals and how to judge them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalThermalConfig {
    /// Source bag key of the captured payloads.
    pub source_key: String,
    /// Only responses whose URL contains this are read.
    pub url_marker: String,
    pub first_hour: u32,
    pub last_hour: u32,
    /// An hour with a maximum thermal at least this strong counts, m/s.
    pub active_thermal: f64,
    /// The thermal top is the highest level with a thermal above this, m/s.
    pub top_thermal: f64,
    pub strong_max: f64,
    pub strong_hours: u32,
    pub weak_max: f64,
    pub weak_hours: u32,
}

impl Default for ExternalThermalConfig {
    fn default() -> Self {
        ExternalThermalConfig {
            source_key: "meteo_parapente".to_owned(),
            url_marker: "data.php".to_owned(),
            first_hour: 9,
            last_hour: 17,
            active_thermal: 0.5,
            top_thermal: 0.05,
            strong_max: 1.5,
            strong_hours: 3,
            weak_max: 0.3,
            weak_hours: 1,
        }
    }
}

/// Thermal metrics over the configured hours.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExternalThermals {
    #[serde(rename = "mp_max_thermal_ms")]
    pub max_thermal: f64,
    #[serde(rename = "mp_thermal_top_m")]
    pub thermal_top: f64,
    #[serde(rename = "mp_thermal_hours")]
    pub thermal_hours: u32,
    #[serde(rename = "mp_pblh_max_m")]
    pub pblh_max: f64,
}

impl ExternalThermals {
    /// Read the thermal payload from a source bag, if there is one with data.
    pub fn from_bag(bag: &SourceBag, config: &ExternalThermalConfig) -> Option<Self> {
        let payload = bag
            .captured(&config.source_key)?
            .iter()
            .find(|p| {
                p.kind == "json"
                    && p.url
                        .as_deref()
                        .map(|url| url.contains(config.url_marker.as_str()))
                        .unwrap_or(false)
            })?
            .data
            .clone()?;

        let payload: ThermalPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(source = config.source_key.as_str(), %err, "unreadable thermal payload");
                return None;
            }
        };

        if payload.data.is_empty() {
            return None;
        }

        Some(Self::summarize(&payload, config))
    }

    fn summarize(payload: &ThermalPayload, config: &ExternalThermalConfig) -> Self {
        let mut summary = ExternalThermals::default();

        for hour in config.first_hour..=config.last_hour {
            let hd = match payload.data.get(&hour_label(hour)) {
                Some(hd) => hd,
                None => continue,
            };

            summary.pblh_max = summary.pblh_max.max(hd.pblh.unwrap_or(0.0));

            let strengths: Vec<f64> = hd.ths.iter().filter_map(|v| *v).collect();
            if strengths.is_empty() {
                continue;
            }

            let hour_max = strengths.iter().cloned().fold(f64::MIN, f64::max);
            summary.max_thermal = summary.max_thermal.max(hour_max);
            if hour_max >= config.active_thermal {
                summary.thermal_hours += 1;
            }

            let top = hd
                .ths
                .iter()
                .zip(hd.z.iter())
                .filter(|(th, _)| th.map(|t| t > config.top_thermal).unwrap_or(false))
                .filter_map(|(_, z)| *z)
                .last()
                .unwrap_or(0.0);
            summary.thermal_top = summary.thermal_top.max(top);
        }

        summary.max_thermal = round_to(summary.max_thermal, 2);
        summary
    }

    /// Add the strong or weak thermal indicator and adjust the score and status.
    pub fn apply(
        &self,
        config: &ExternalThermalConfig,
        flags: &mut Vec<Flag>,
        positives: &mut Vec<Flag>,
        score: &mut i32,
        status: &mut Status,
    ) {
        if self.max_thermal >= config.strong_max && self.thermal_hours >= config.strong_hours {
            positives.push(Flag::new(
                Tag::MpStrongThermals,
                format!(
                    "Meteo-Parapente: max {:.1} m/s, {}h, top {:.0}m",
                    self.max_thermal, self.thermal_hours, self.thermal_top
                ),
            ));
            *score += 1;
        } else if self.max_thermal < config.weak_max && self.thermal_hours <= config.weak_hours {
            flags.push(Flag::new(
                Tag::MpWeakThermals,
                format!(
                    "Meteo-Parapente: max {:.1} m/s — weak thermals",
                    self.max_thermal
                ),
            ));
            *score -= 1;
            if status.is_favourable() {
                *status = Status::Maybe;
            }
        }

        debug!(
            max_thermal = self.max_thermal,
            hours = self.thermal_hours,
            score = *score,
            "external thermals applied"
        );
    }
}
