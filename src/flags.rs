//! Warning flags and positive indicators computed over the analysis window.
//!
//! Every rule that needs a value silently skips when it is missing.
use crate::{
    keys::Param,
    location::Location,
    profile::HourlyProfile,
    utility::{max, mean, min},
    windows::{FlyableWindow, ThermalWindow},
};
use metfor::Quantity;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// The closed vocabulary of flag and positive tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Tag {
    // Critical
    #[strum(serialize = "SUSTAINED_WIND_700")]
    SustainedWind700,
    #[strum(serialize = "SUSTAINED_WIND_850")]
    SustainedWind850,
    GustsHigh,
    #[strum(serialize = "PRECIP_13")]
    Precip13,
    NoFlyableWindow,

    // Quality
    Overcast,
    Stable,
    ShortWindow,
    GustFactor,

    // Danger
    HighCape,
    VeryUnstable,
    CapeRising,

    LowBase,

    // Added by the status overrides
    LowBaseHard,
    ModelDisagree,
    LowConfidence,
    EnsWindSpread,
    EnsCapeSpread,

    // Positives
    StrongLapse,
    GoodCape,
    #[strum(serialize = "DEEP_BL")]
    DeepBl,
    VeryHighBase,
    HighBase,
    LongWindow,
    ClearSky,
    GoodWstar,
    StrongSun,
    MpStrongThermals,

    MpWeakThermals,
}

/// Scoring category of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Stop flags, heavy deduction.
    Critical,
    /// Flags reducing the quality of the day.
    Quality,
    /// Flags for thunderstorm hazards.
    Danger,
    /// Low cloud base margin over the peaks, scored on its own.
    LowBase,
    /// Flags appended by the hard overrides, never scored.
    Override,
    /// Positive indicators.
    Positive,
    /// Flags from auxiliary thermal data, scored by the integrator.
    Auxiliary,
}

impl Tag {
    /// The scoring category of this tag.
    pub fn category(self) -> Category {
        use self::Tag::*;

        match self {
            SustainedWind700 | SustainedWind850 | GustsHigh | Precip13 | NoFlyableWindow => {
                Category::Critical
            }
            Overcast | Stable | ShortWindow | GustFactor => Category::Quality,
            HighCape | VeryUnstable | CapeRising => Category::Danger,
            LowBase => Category::LowBase,
            LowBaseHard | ModelDisagree | LowConfidence | EnsWindSpread | EnsCapeSpread => {
                Category::Override
            }
            StrongLapse | GoodCape | DeepBl | VeryHighBase | HighBase | LongWindow | ClearSky
            | GoodWstar | StrongSun | MpStrongThermals => Category::Positive,
            MpWeakThermals => Category::Auxiliary,
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// A tag with its human readable justification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flag {
    pub tag: Tag,
    pub msg: String,
}

impl Flag {
    /// Create a flag.
    pub fn new<S: Into<String>>(tag: Tag, msg: S) -> Self {
        Flag {
            tag,
            msg: msg.into(),
        }
    }
}

/// Count the flags of a category.
pub fn count_category(flags: &[Flag], category: Category) -> usize {
    flags
        .iter()
        .filter(|f| f.tag.category() == category)
        .count()
}

/// Count the flags with a tag.
pub fn count_tag(flags: &[Flag], tag: Tag) -> usize {
    flags.iter().filter(|f| f.tag == tag).count()
}

/// Pressure level watched by the sustained wind rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindLevel {
    #[serde(rename = "700hPa")]
    Hpa700,
    #[serde(rename = "850hPa")]
    Hpa850,
}

impl Default for WindLevel {
    fn default() -> Self {
        WindLevel::Hpa700
    }
}

impl WindLevel {
    /// The flag raised for this level.
    pub fn tag(self) -> Tag {
        match self {
            WindLevel::Hpa700 => Tag::SustainedWind700,
            WindLevel::Hpa850 => Tag::SustainedWind850,
        }
    }

    /// Mean wind at this level over an inclusive range of hours.
    pub fn mean_wind(self, profile: &HourlyProfile, first_hour: u32, last_hour: u32) -> Option<f64> {
        let winds = profile.values_between(first_hour, last_hour, |row| {
            let wind = match self {
                WindLevel::Hpa700 => row.wind_700,
                WindLevel::Hpa850 => row.wind_850,
            };
            wind.into_option().map(|w| w.unpack())
        });
        mean(&winds)
    }
}

/// Statistic of the gusts used by the high gust rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GustStatistic {
    Mean,
    Max,
}

impl Default for GustStatistic {
    fn default() -> Self {
        GustStatistic::Mean
    }
}

/// Thresholds of every flag and positive rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    /// First local hour of the analysis window.
    pub first_hour: u32,
    /// Last local hour of the analysis window.
    pub last_hour: u32,
    /// Hour of the instantaneous checks.
    pub reference_hour: u32,

    pub wind_level: WindLevel,
    /// Mean wind at the watched level, m/s.
    pub sustained_wind: f64,
    pub gust_statistic: GustStatistic,
    /// Gusts, m/s.
    pub gusts: f64,
    /// Gust minus mean wind, m/s.
    pub gust_factor: f64,
    /// Thermal windows shorter than this are flagged, hours.
    pub short_window_h: u32,
    /// Minimum cloud base margin over the peaks, m.
    pub low_base_margin: f64,
    /// Precipitation at the reference hour, mm/h.
    pub precip: f64,
    /// Cloud cover at the reference hour, percent.
    pub overcast: f64,
    /// Mean lapse rate, C/km.
    pub stable_lapse: f64,
    /// CAPE, J/kg.
    pub high_cape: f64,
    pub cape_rising_ratio: f64,
    pub cape_rising_min: f64,
    /// Lifted index at the reference hour.
    pub very_unstable_li: f64,

    pub strong_lapse: f64,
    pub good_cape_min: f64,
    pub deep_bl: f64,
    pub very_high_base: f64,
    pub high_base_margin: f64,
    pub long_window_h: u32,
    pub clear_sky: f64,
    pub good_wstar: f64,
    pub strong_sun: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        FlagThresholds {
            first_hour: 9,
            last_hour: 18,
            reference_hour: 13,

            wind_level: WindLevel::default(),
            sustained_wind: 5.0,
            gust_statistic: GustStatistic::default(),
            gusts: 10.0,
            gust_factor: 7.0,
            short_window_h: 5,
            low_base_margin: 1000.0,
            precip: 0.5,
            overcast: 80.0,
            stable_lapse: 5.5,
            high_cape: 1500.0,
            cape_rising_ratio: 1.5,
            cape_rising_min: 800.0,
            very_unstable_li: -4.0,

            strong_lapse: 7.0,
            good_cape_min: 300.0,
            deep_bl: 1500.0,
            very_high_base: 3500.0,
            high_base_margin: 1500.0,
            long_window_h: 7,
            clear_sky: 30.0,
            good_wstar: 1.5,
            strong_sun: 600.0,
        }
    }
}

/// The flags and positives of one assessment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indicators {
    pub flags: Vec<Flag>,
    pub positives: Vec<Flag>,
}

/// Window aggregated values the rules are evaluated on.
struct WindowValues {
    gusts: Vec<f64>,
    bases: Vec<f64>,
    capes: Vec<f64>,
    lapse_rates: Vec<f64>,
    bl_heights: Vec<f64>,
    wstars: Vec<f64>,
    shortwave: Vec<f64>,
    gust_factors: Vec<f64>,
}

impl WindowValues {
    fn collect(profile: &HourlyProfile, first: u32, last: u32) -> Self {
        let raw = |param: Param| profile.values_between(first, last, |r| r.raw(param));

        WindowValues {
            gusts: raw(Param::WindGusts10m),
            bases: profile.values_between(first, last, |r| {
                r.cloud_base.into_option().map(|v| v.unpack())
            }),
            capes: raw(Param::Cape),
            lapse_rates: profile.values_between(first, last, |r| r.lapse_rate.into_option()),
            bl_heights: raw(Param::BoundaryLayerHeight),
            wstars: profile.values_between(first, last, |r| r.wstar.into_option().map(|v| v.unpack())),
            shortwave: raw(Param::ShortwaveRadiation),
            gust_factors: profile.values_between(first, last, |r| {
                r.gust_factor.into_option().map(|v| v.unpack())
            }),
        }
    }
}

/// Evaluates the flag and positive rules with a fixed set of thresholds.
#[derive(Debug, Clone, Default)]
pub struct FlagEngine {
    thresholds: FlagThresholds,
}

impl FlagEngine {
    /// Create an engine.
    pub fn new(thresholds: FlagThresholds) -> Self {
        FlagEngine { thresholds }
    }

    /// The thresholds in use.
    pub fn thresholds(&self) -> &FlagThresholds {
        &self.thresholds
    }

    /// Evaluate every rule over the analysis window of a profile.
    pub fn evaluate(
        &self,
        profile: &HourlyProfile,
        location: &Location,
        flyable: &FlyableWindow,
        thermal: &ThermalWindow,
    ) -> Indicators {
        let mut ind = Indicators::default();
        self.stop_flags(profile, location, flyable, thermal, &mut ind.flags);
        self.positive_indicators(profile, location, thermal, &mut ind.positives);
        ind
    }

    fn stop_flags(
        &self,
        profile: &HourlyProfile,
        location: &Location,
        flyable: &FlyableWindow,
        thermal: &ThermalWindow,
        flags: &mut Vec<Flag>,
    ) {
        let th = &self.thresholds;
        let vals = WindowValues::collect(profile, th.first_hour, th.last_hour);
        let peaks = location.peak_elevation_m;
        let at_ref = profile.at(th.reference_hour);

        if let Some(wind) = th
            .wind_level
            .mean_wind(profile, th.first_hour, th.last_hour)
            .filter(|&w| w > th.sustained_wind)
        {
            flags.push(Flag::new(
                th.wind_level.tag(),
                format!(
                    "mean {:.1} m/s over window > {:.1} (closed route threshold)",
                    wind, th.sustained_wind
                ),
            ));
        }

        let (gust_label, gust) = match th.gust_statistic {
            GustStatistic::Mean => ("mean", mean(&vals.gusts)),
            GustStatistic::Max => ("max", max(&vals.gusts)),
        };
        if let Some(gust) = gust.filter(|&g| g > th.gusts) {
            flags.push(Flag::new(
                Tag::GustsHigh,
                format!("{} {:.1} m/s > {:.1} in window", gust_label, gust, th.gusts),
            ));
        }

        if let Some(gf) = max(&vals.gust_factors).filter(|&gf| gf > th.gust_factor) {
            flags.push(Flag::new(
                Tag::GustFactor,
                format!("max gust−mean {:.1} m/s (turbulence risk)", gf),
            ));
        }

        if flyable.hours == 0 {
            flags.push(Flag::new(
                Tag::NoFlyableWindow,
                "no continuous flyable hour detected",
            ));
        }

        if thermal.duration_h > 0 && thermal.duration_h < th.short_window_h {
            flags.push(Flag::new(
                Tag::ShortWindow,
                format!(
                    "thermal window {}h < {}h",
                    thermal.duration_h, th.short_window_h
                ),
            ));
        }

        if let Some(cb_min) = min(&vals.bases) {
            let margin = cb_min - peaks;
            if margin < th.low_base_margin {
                flags.push(Flag::new(
                    Tag::LowBase,
                    format!(
                        "min base {:.0}m MSL, margin {:.0}m < {:.0}m over {:.0}m peaks",
                        cb_min, margin, th.low_base_margin, peaks
                    ),
                ));
            }
        }

        if let Some(p13) = at_ref
            .and_then(|r| r.precipitation.into_option())
            .filter(|&p| p > th.precip)
        {
            flags.push(Flag::new(
                Tag::Precip13,
                format!("{:.1} mm/h @{:02}:00", p13, th.reference_hour),
            ));
        }

        if let Some(cc13) = at_ref
            .and_then(|r| r.cloud_cover.into_option())
            .filter(|&cc| cc > th.overcast)
        {
            flags.push(Flag::new(
                Tag::Overcast,
                format!("{:.0}% @{:02}:00", cc13, th.reference_hour),
            ));
        }

        if let Some(lr) = mean(&vals.lapse_rates).filter(|&lr| lr < th.stable_lapse) {
            flags.push(Flag::new(
                Tag::Stable,
                format!(
                    "mean lapse {:.1}°C/km < {:.1} (weak thermals)",
                    lr, th.stable_lapse
                ),
            ));
        }

        if let Some(max_cape) = max(&vals.capes).filter(|&c| c > th.high_cape) {
            flags.push(Flag::new(
                Tag::HighCape,
                format!("max {:.0} J/kg — overdevelopment risk", max_cape),
            ));

            let n = vals.capes.len();
            if n >= 4 {
                let early = mean(&vals.capes[..2]).unwrap_or(0.0);
                let late = mean(&vals.capes[n - 2..]).unwrap_or(0.0);
                if late > early * th.cape_rising_ratio && late > th.cape_rising_min {
                    flags.push(Flag::new(
                        Tag::CapeRising,
                        format!("CAPE rising: {:.0}→{:.0} J/kg", early, late),
                    ));
                }
            }
        }

        if let Some(li) = at_ref
            .and_then(|r| r.lifted_index.into_option())
            .filter(|&li| li < th.very_unstable_li)
        {
            flags.push(Flag::new(
                Tag::VeryUnstable,
                format!("LI={:?} — storm risk", li),
            ));
        }
    }

    fn positive_indicators(
        &self,
        profile: &HourlyProfile,
        location: &Location,
        thermal: &ThermalWindow,
        positives: &mut Vec<Flag>,
    ) {
        let th = &self.thresholds;
        let vals = WindowValues::collect(profile, th.first_hour, th.last_hour);
        let peaks = location.peak_elevation_m;

        if let Some(lr) = max(&vals.lapse_rates).filter(|&lr| lr > th.strong_lapse) {
            positives.push(Flag::new(Tag::StrongLapse, format!("max {:.1}°C/km", lr)));
        }

        if let Some(cape) =
            max(&vals.capes).filter(|&c| c > th.good_cape_min && c < th.high_cape)
        {
            positives.push(Flag::new(Tag::GoodCape, format!("peak {:.0} J/kg", cape)));
        }

        if let Some(bl) = max(&vals.bl_heights).filter(|&bl| bl > th.deep_bl) {
            positives.push(Flag::new(Tag::DeepBl, format!("max {:.0}m", bl)));
        }

        if let Some(max_base) = max(&vals.bases) {
            let margin = max_base - peaks;
            let msg = format!("max {:.0}m MSL (+{:.0}m over peaks)", max_base, margin);
            if max_base > th.very_high_base {
                positives.push(Flag::new(Tag::VeryHighBase, msg));
            } else if margin > th.high_base_margin {
                positives.push(Flag::new(Tag::HighBase, msg));
            }
        }

        if thermal.duration_h >= th.long_window_h {
            positives.push(Flag::new(
                Tag::LongWindow,
                format!("{}h thermal window", thermal.duration_h),
            ));
        }

        if let Some(cc13) = profile
            .at(th.reference_hour)
            .and_then(|r| r.cloud_cover.into_option())
            .filter(|&cc| cc < th.clear_sky)
        {
            positives.push(Flag::new(
                Tag::ClearSky,
                format!("{:.0}% @{:02}:00", cc13, th.reference_hour),
            ));
        }

        if let Some(ws) = max(&vals.wstars).filter(|&ws| ws >= th.good_wstar) {
            positives.push(Flag::new(Tag::GoodWstar, format!("max W*={:.1} m/s", ws)));
        }

        if let Some(sw) = max(&vals.shortwave).filter(|&sw| sw > th.strong_sun) {
            positives.push(Flag::new(
                Tag::StrongSun,
                format!("max SW radiation {:.0} W/m²", sw),
            ));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::HourRow;
    use metfor::{Meters, MetersPSec};
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn profile_from<F>(f: F) -> HourlyProfile
    where
        F: Fn(u32, &mut HourRow),
    {
        HourlyProfile::new(
            (8..=18)
                .map(|h| {
                    let mut row = HourRow::new(h);
                    f(h, &mut row);
                    row
                })
                .collect(),
        )
    }

    fn flyable(hours: u32) -> FlyableWindow {
        FlyableWindow {
            hours,
            start: Some(9),
            end: Some(9 + hours.max(1) - 1),
        }
    }

    fn thermal(duration_h: u32) -> ThermalWindow {
        ThermalWindow {
            duration_h,
            ..Default::default()
        }
    }

    fn tags(flags: &[Flag]) -> Vec<Tag> {
        flags.iter().map(|f| f.tag).collect()
    }

    #[test]
    fn test_tag_names() {
        for tag in Tag::iter() {
            assert_eq!(Tag::from_str(tag.as_ref()).unwrap(), tag);
        }
        assert_eq!(Tag::SustainedWind700.as_ref(), "SUSTAINED_WIND_700");
        assert_eq!(Tag::Precip13.as_ref(), "PRECIP_13");
        assert_eq!(Tag::NoFlyableWindow.as_ref(), "NO_FLYABLE_WINDOW");
        assert_eq!(Tag::MpStrongThermals.as_ref(), "MP_STRONG_THERMALS");
        assert_eq!(Tag::GoodWstar.as_ref(), "GOOD_WSTAR");
        assert_eq!(Tag::EnsCapeSpread.as_ref(), "ENS_CAPE_SPREAD");
    }

    #[test]
    fn test_categories() {
        let critical: Vec<Tag> = Tag::iter()
            .filter(|t| t.category() == Category::Critical)
            .collect();
        assert_eq!(
            critical,
            vec![
                Tag::SustainedWind700,
                Tag::SustainedWind850,
                Tag::GustsHigh,
                Tag::Precip13,
                Tag::NoFlyableWindow
            ]
        );
        assert_eq!(Tag::LowBase.category(), Category::LowBase);
        assert_eq!(Tag::MpWeakThermals.category(), Category::Auxiliary);
        assert_eq!(Tag::MpStrongThermals.category(), Category::Positive);
    }

    #[test]
    fn test_empty_profile_fires_only_window_flags() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(|_, _| {});
        let engine = FlagEngine::default();

        let ind = engine.evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert!(ind.flags.is_empty());
        assert!(ind.positives.is_empty());

        let ind = engine.evaluate(&profile, &loc, &flyable(0), &thermal(3));
        assert_eq!(tags(&ind.flags), vec![Tag::NoFlyableWindow, Tag::ShortWindow]);
        assert_eq!(ind.flags[1].msg, "thermal window 3h < 5h");
    }

    #[test]
    fn test_wind_flags() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(|h, row| {
            row.wind_700 = MetersPSec(6.0).into();
            row.wind_850 = MetersPSec(4.0).into();
            row.wind_10m = MetersPSec(3.0).into();
            let gust = if h == 15 { 14.0 } else { 8.0 };
            row.gusts = MetersPSec(gust).into();
            row.gust_factor = MetersPSec(gust - 3.0).into();
        });

        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(tags(&ind.flags), vec![Tag::SustainedWind700, Tag::GustFactor]);
        assert_eq!(
            ind.flags[0].msg,
            "mean 6.0 m/s over window > 5.0 (closed route threshold)"
        );
        assert_eq!(ind.flags[1].msg, "max gust−mean 11.0 m/s (turbulence risk)");

        // The 850 hPa level is calmer; max gusts exceed the threshold, the mean does not.
        let engine = FlagEngine::new(FlagThresholds {
            wind_level: WindLevel::Hpa850,
            gust_statistic: GustStatistic::Max,
            gust_factor: 12.0,
            ..Default::default()
        });
        let ind = engine.evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(tags(&ind.flags), vec![Tag::GustsHigh]);
        assert_eq!(ind.flags[0].msg, "max 14.0 m/s > 10.0 in window");

        let engine = FlagEngine::new(FlagThresholds {
            sustained_wind: 3.5,
            wind_level: WindLevel::Hpa850,
            ..Default::default()
        });
        let ind = engine.evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(ind.flags[0].tag, Tag::SustainedWind850);
        assert_eq!(
            ind.flags[0].msg,
            "mean 4.0 m/s over window > 3.5 (closed route threshold)"
        );
    }

    #[test]
    fn test_reference_hour_flags() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(|h, row| {
            if h == 13 {
                row.set_raw(Param::Precipitation, Some(1.24));
                row.set_raw(Param::CloudCover, Some(90.0));
                row.set_raw(Param::LiftedIndex, Some(-4.5));
            }
        });

        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(
            tags(&ind.flags),
            vec![Tag::Precip13, Tag::Overcast, Tag::VeryUnstable]
        );
        assert_eq!(ind.flags[0].msg, "1.2 mm/h @13:00");
        assert_eq!(ind.flags[1].msg, "90% @13:00");
        assert_eq!(ind.flags[2].msg, "LI=-4.5 — storm risk");
    }

    #[test]
    fn test_cape_flags() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(|h, row| {
            let cape = match h {
                9 | 10 => 300.0,
                17 => 1600.0,
                18 => 1400.0,
                _ => 900.0,
            };
            row.set_raw(Param::Cape, Some(cape));
        });

        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(tags(&ind.flags), vec![Tag::HighCape, Tag::CapeRising]);
        assert_eq!(ind.flags[1].msg, "CAPE rising: 300→1500 J/kg");
        // Peak CAPE too high to count as good.
        assert!(ind.positives.is_empty());
    }

    #[test]
    fn test_base_flags_and_positives() {
        let loc = Location::new("test", 500.0, 1800.0);
        let profile = profile_from(|h, row| {
            let base = if h < 12 { 2500.0 } else { 3600.0 };
            row.cloud_base = Meters(base).into();
        });

        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(tags(&ind.flags), vec![Tag::LowBase]);
        assert_eq!(
            ind.flags[0].msg,
            "min base 2500m MSL, margin 700m < 1000m over 1800m peaks"
        );
        assert_eq!(tags(&ind.positives), vec![Tag::VeryHighBase]);
        assert_eq!(ind.positives[0].msg, "max 3600m MSL (+1800m over peaks)");

        let profile = profile_from(|_, row| row.cloud_base = Meters(3400.0).into());
        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert!(ind.flags.is_empty());
        assert_eq!(tags(&ind.positives), vec![Tag::HighBase]);
    }

    #[test]
    fn test_positives() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(|_, row| {
            row.lapse_rate = 7.5.into();
            row.set_raw(Param::Cape, Some(600.0));
            row.set_raw(Param::BoundaryLayerHeight, Some(1800.0));
            row.set_raw(Param::CloudCover, Some(10.0));
            row.set_raw(Param::ShortwaveRadiation, Some(750.0));
            row.wstar = MetersPSec(2.04).into();
        });

        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(8));
        assert!(ind.flags.is_empty());
        assert_eq!(
            tags(&ind.positives),
            vec![
                Tag::StrongLapse,
                Tag::GoodCape,
                Tag::DeepBl,
                Tag::LongWindow,
                Tag::ClearSky,
                Tag::GoodWstar,
                Tag::StrongSun
            ]
        );
        assert_eq!(ind.positives[5].msg, "max W*=2.0 m/s");
        assert_eq!(ind.positives[6].msg, "max SW radiation 750 W/m²");
    }

    #[test]
    fn test_stable_flag_uses_window_only() {
        let loc = Location::new("test", 500.0, 1500.0);
        let profile = profile_from(|h, row| {
            let lr = if h == 8 { 0.0 } else { 5.0 };
            row.lapse_rate = lr.into();
        });

        let ind = FlagEngine::default().evaluate(&profile, &loc, &flyable(10), &thermal(0));
        assert_eq!(tags(&ind.flags), vec![Tag::Stable]);
        assert_eq!(ind.flags[0].msg, "mean lapse 5.0°C/km < 5.5 (weak thermals)");
    }
}
