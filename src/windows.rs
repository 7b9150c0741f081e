//! Thermal window and flyable window detection.
use crate::{
    location::Location,
    profile::{HourRow, HourlyProfile},
    utility::serialize_hour,
};
use metfor::Quantity;
use serde::{Deserialize, Serialize};

/// Thresholds an hour has to meet to count as a thermal hour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalCriteria {
    /// Earliest local hour considered.
    pub first_hour: u32,
    /// Minimum W* in m/s.
    pub min_wstar: f64,
    /// Maximum precipitation in mm/h.
    pub max_precip: f64,
    /// Minimum cloud base in m MSL.
    pub min_cloud_base: f64,
    /// Cloud cover must stay below this, percent.
    pub max_cloud_cover: f64,
    /// Optional minimum cloud base margin over the peaks in m.
    pub min_base_margin: Option<f64>,
}

impl Default for ThermalCriteria {
    fn default() -> Self {
        ThermalCriteria {
            first_hour: 9,
            min_wstar: 1.5,
            max_precip: 0.5,
            min_cloud_base: 1000.0,
            max_cloud_cover: 70.0,
            min_base_margin: None,
        }
    }
}

/// The hours with usable thermals.
///
/// `duration_h` is the number of qualifying hours. Gaps between `start` and `end` are not
/// checked, so with qualifying hours 10, 11 and 14 the duration is 3 although the span is 5 hours.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThermalWindow {
    #[serde(serialize_with = "serialize_hour")]
    pub start: Option<u32>,
    #[serde(serialize_with = "serialize_hour")]
    pub end: Option<u32>,
    #[serde(serialize_with = "serialize_hour")]
    pub peak_hour: Option<u32>,
    pub duration_h: u32,
    /// Lapse rate at the peak hour.
    pub peak_lapse: Option<f64>,
    /// CAPE at the peak hour.
    pub peak_cape: Option<f64>,
}

fn is_thermal_hour(row: &HourRow, location: &Location, criteria: &ThermalCriteria) -> bool {
    if row.hour < criteria.first_hour {
        return false;
    }

    let wstar_ok = row
        .wstar
        .into_option()
        .map(|w| w.unpack() >= criteria.min_wstar)
        .unwrap_or(false);
    let precip_ok = row
        .precipitation
        .into_option()
        .map(|p| p <= criteria.max_precip)
        .unwrap_or(true);
    let cloud_cover_ok = row
        .cloud_cover
        .into_option()
        .map(|cc| cc < criteria.max_cloud_cover)
        .unwrap_or(true);

    let base = row.cloud_base.into_option().map(|b| b.unpack());
    let base_ok = base.map(|b| b >= criteria.min_cloud_base).unwrap_or(true);
    let margin_ok = match (base, criteria.min_base_margin) {
        (Some(b), Some(margin)) => b - location.peak_elevation_m >= margin,
        _ => true,
    };

    wstar_ok && precip_ok && cloud_cover_ok && base_ok && margin_ok
}

/// Find the thermal window of a profile.
///
/// The peak is the qualifying hour with the steepest lapse rate, ties broken by the higher CAPE.
/// Missing values rank below every real value, so the first qualifying hour is the peak when
/// nothing better is found.
pub fn thermal_window(
    profile: &HourlyProfile,
    location: &Location,
    criteria: &ThermalCriteria,
) -> ThermalWindow {
    const SENTINEL: f64 = -999.0;

    let thermal_hours: Vec<&HourRow> = profile
        .rows()
        .iter()
        .filter(|row| is_thermal_hour(row, location, criteria))
        .collect();

    let (first, last) = match (thermal_hours.first(), thermal_hours.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return ThermalWindow::default(),
    };

    let mut best = (SENTINEL, SENTINEL, first.hour);
    for row in thermal_hours.iter() {
        let lr = row.lapse_rate.into_option().unwrap_or(SENTINEL);
        let cape = row
            .cape
            .into_option()
            .map(|c| c.unpack())
            .unwrap_or(SENTINEL);

        if lr > best.0 || (lr == best.0 && cape > best.1) {
            best = (lr, cape, row.hour);
        }
    }

    let (peak_lapse, peak_cape, peak_hour) = best;

    ThermalWindow {
        start: Some(first.hour),
        end: Some(last.hour),
        peak_hour: Some(peak_hour),
        duration_h: thermal_hours.len() as u32,
        peak_lapse: Some(peak_lapse).filter(|&v| v > SENTINEL),
        peak_cape: Some(peak_cape).filter(|&v| v > SENTINEL),
    }
}

/// Limits for an hour to count as flyable, regardless of thermals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyableCriteria {
    pub first_hour: u32,
    pub last_hour: u32,
    /// Maximum precipitation in mm/h.
    pub max_precip: f64,
    /// Maximum gusts in m/s.
    pub max_gust: f64,
    /// Maximum 10 m wind in m/s.
    pub max_wind: f64,
}

impl Default for FlyableCriteria {
    fn default() -> Self {
        FlyableCriteria {
            first_hour: 9,
            last_hour: 18,
            max_precip: 0.5,
            max_gust: 12.0,
            max_wind: 8.0,
        }
    }
}

/// The longest run of consecutive flyable hours.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FlyableWindow {
    #[serde(rename = "continuous_flyable_hours")]
    pub hours: u32,
    #[serde(rename = "flyable_start", serialize_with = "serialize_hour")]
    pub start: Option<u32>,
    #[serde(rename = "flyable_end", serialize_with = "serialize_hour")]
    pub end: Option<u32>,
}

fn is_flyable_hour(row: &HourRow, criteria: &FlyableCriteria) -> bool {
    let precip_ok = row
        .precipitation
        .into_option()
        .map(|p| p <= criteria.max_precip)
        .unwrap_or(true);
    let gust_ok = row
        .gusts
        .into_option()
        .map(|g| g.unpack() <= criteria.max_gust)
        .unwrap_or(true);
    let wind_ok = row
        .wind_10m
        .into_option()
        .map(|w| w.unpack() <= criteria.max_wind)
        .unwrap_or(true);

    precip_ok && gust_ok && wind_ok
}

/// Find the longest run of consecutive flyable hours. The first run wins a tie.
pub fn flyable_window(profile: &HourlyProfile, criteria: &FlyableCriteria) -> FlyableWindow {
    let mut best: Option<(u32, u32)> = None;
    let mut current: Option<(u32, u32)> = None;

    for row in profile.between(criteria.first_hour, criteria.last_hour) {
        if is_flyable_hour(row, criteria) {
            let (start, len) = current.unwrap_or((row.hour, 0));
            current = Some((start, len + 1));

            if best.map(|(_, best_len)| len + 1 > best_len).unwrap_or(true) {
                best = current;
            }
        } else {
            current = None;
        }
    }

    match best {
        Some((start, len)) => FlyableWindow {
            hours: len,
            start: Some(start),
            end: Some(start + len - 1),
        },
        None => FlyableWindow::default(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keys::Param;
    use metfor::{Meters, MetersPSec};

    fn profile_from<F>(hours: std::ops::RangeInclusive<u32>, f: F) -> HourlyProfile
    where
        F: Fn(u32, &mut HourRow),
    {
        HourlyProfile::new(
            hours
                .map(|h| {
                    let mut row = HourRow::new(h);
                    f(h, &mut row);
                    row
                })
                .collect(),
        )
    }

    #[test]
    fn test_thermal_window_counts_hours() {
        let loc = Location::new("test", 500.0, 1500.0);
        let qualifying = [10, 11, 14];
        let profile = profile_from(8..=18, |h, row| {
            let w = if qualifying.contains(&h) { 2.0 } else { 0.5 };
            row.wstar = MetersPSec(w).into();
        });

        let tw = thermal_window(&profile, &loc, &ThermalCriteria::default());
        assert_eq!(tw.start, Some(10));
        assert_eq!(tw.end, Some(14));
        assert_eq!(tw.duration_h, 3);
        assert_eq!(tw.peak_hour, Some(10));
        assert!(tw.peak_lapse.is_none());
        assert!(tw.peak_cape.is_none());
    }

    #[test]
    fn test_thermal_window_filters() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(8..=18, |h, row| {
            row.wstar = MetersPSec(2.0).into();
            match h {
                10 => row.set_raw(Param::Precipitation, Some(0.6)),
                11 => row.cloud_base = Meters(900.0).into(),
                12 => row.set_raw(Param::CloudCover, Some(70.0)),
                _ => {}
            }
        });

        let tw = thermal_window(&profile, &loc, &ThermalCriteria::default());
        // 08:00 is too early, 10 to 12 are excluded.
        assert_eq!(tw.start, Some(9));
        assert_eq!(tw.end, Some(18));
        assert_eq!(tw.duration_h, 7);

        let strict = ThermalCriteria {
            min_base_margin: Some(800.0),
            ..Default::default()
        };
        let profile = profile_from(8..=18, |h, row| {
            row.wstar = MetersPSec(2.0).into();
            let base = if h < 13 { 2000.0 } else { 2400.0 };
            row.cloud_base = Meters(base).into();
        });
        let tw = thermal_window(&profile, &loc, &strict);
        assert_eq!(tw.start, Some(13));
        assert_eq!(tw.duration_h, 6);
    }

    #[test]
    fn test_thermal_window_peak_tie_break() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(8..=18, |h, row| {
            row.wstar = MetersPSec(2.0).into();
            let lr = if h == 12 || h == 15 { 8.0 } else { 6.0 };
            row.lapse_rate = lr.into();
            let cape = if h == 15 { 500.0 } else { 200.0 };
            row.set_raw(Param::Cape, Some(cape));
        });

        let tw = thermal_window(&profile, &loc, &ThermalCriteria::default());
        assert_eq!(tw.peak_hour, Some(15));
        assert_eq!(tw.peak_lapse, Some(8.0));
        assert_eq!(tw.peak_cape, Some(500.0));
    }

    #[test]
    fn test_thermal_window_empty() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(8..=18, |_, _| {});
        assert_eq!(
            thermal_window(&profile, &loc, &ThermalCriteria::default()),
            ThermalWindow::default()
        );
    }

    #[test]
    fn test_flyable_window_longest_run() {
        // Index 0 is 09:00.
        let ok = [0, 1, 2, 5, 6, 7, 8];
        let profile = profile_from(9..=18, |h, row| {
            let wind = if ok.contains(&(h - 9)) { 3.0 } else { 9.0 };
            row.wind_10m = MetersPSec(wind).into();
        });

        let fw = flyable_window(&profile, &FlyableCriteria::default());
        assert_eq!(fw.hours, 4);
        assert_eq!(fw.start, Some(14));
        assert_eq!(fw.end, Some(17));
    }

    #[test]
    fn test_flyable_window_first_run_wins_tie() {
        let profile = profile_from(8..=18, |h, row| {
            let precip = if h == 12 || h == 16 { 2.0 } else { 0.0 };
            row.set_raw(Param::Precipitation, Some(precip));
        });

        let fw = flyable_window(&profile, &FlyableCriteria::default());
        // 09-11 and 13-15 both last three hours, 08:00 is outside the band.
        assert_eq!(fw.hours, 3);
        assert_eq!(fw.start, Some(9));
        assert_eq!(fw.end, Some(11));
    }

    #[test]
    fn test_flyable_window_none() {
        let profile = profile_from(8..=18, |_, row| {
            row.gusts = MetersPSec(15.0).into();
        });
        let fw = flyable_window(&profile, &FlyableCriteria::default());
        assert_eq!(fw, FlyableWindow::default());

        // Missing inputs pass.
        let profile = profile_from(8..=18, |_, _| {});
        assert_eq!(flyable_window(&profile, &FlyableCriteria::default()).hours, 10);
    }

    #[test]
    fn test_window_json() {
        let fw = FlyableWindow {
            hours: 2,
            start: Some(9),
            end: Some(10),
        };
        let json = serde_json::to_value(&fw).unwrap();
        assert_eq!(json["continuous_flyable_hours"], 2);
        assert_eq!(json["flyable_start"], "09:00");

        let json = serde_json::to_value(&ThermalWindow::default()).unwrap();
        assert!(json["start"].is_null());
        assert_eq!(json["duration_h"], 0);
    }
}
