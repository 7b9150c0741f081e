use chrono::NaiveDate;
use metfor::{Meters, MetersPSec};
use std::{collections::BTreeMap, fs::File, io::Read, path::PathBuf};
use thermal_triage::{
    assessment::WindowStats,
    flags::{FlagEngine, Indicators},
    profile::HourRow,
    status::{Scored, StatusContext, StatusEngine},
    windows::{flyable_window, thermal_window},
    EnsembleUncertainty, FlyableWindow, HourlyProfile, Location, LocationSources,
    ModelAgreement, ThermalWindow, TriageConfig,
};

pub mod report_checks;

#[allow(unused_macros)] // False alarm
macro_rules! check_bag_complete {
    ($test_mod_name:ident, $fname:expr, $key:expr) => {
        mod $test_mod_name {
            use crate::utils::{self, report_checks};
            use thermal_triage::LocationReport;

            fn assess() -> LocationReport {
                utils::assess_test_file($fname, $key)
            }

            #[test]
            fn thermal_duration_is_hour_count() {
                report_checks::check_thermal_duration(&assess());
            }

            #[test]
            fn no_data_exclusivity() {
                report_checks::check_no_data_exclusivity(&assess());
            }

            #[test]
            fn provenance_covers_every_field() {
                report_checks::check_provenance(&assess());
            }

            #[test]
            fn report_serializes() {
                report_checks::check_report_json(&assess());
            }
        }
    };
}

/// Forecast date of the fixture bags.
pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
}

/// The shipped configuration.
pub fn load_config() -> TriageConfig {
    thermal_triage::load_config("triage.toml").expect("Error loading triage.toml")
}

pub fn load_test_file(fname: &str) -> LocationSources {
    let mut test_path = PathBuf::new();
    test_path.push("test_data");
    test_path.push(fname);

    let mut f = File::open(&test_path).expect(&format!("Error opening file: {:#?}", test_path));
    let mut contents = String::new();
    f.read_to_string(&mut contents)
        .expect(&format!("Error reading file: {:#?}", test_path));

    contents
        .parse()
        .expect(&format!("Error parsing file: {:#?}", test_path))
}

#[allow(dead_code)]
pub fn assess_test_file(fname: &str, key: &str) -> thermal_triage::LocationReport {
    let config = load_config();
    let location = config.location(key).unwrap().clone();

    thermal_triage::Assessor::new(&config, date())
        .assess_sources(&location, load_test_file(fname))
}

/// A profile over a range of hours, each row filled in by `f`.
#[allow(dead_code)]
pub fn profile_from<F>(hours: std::ops::RangeInclusive<u32>, f: F) -> HourlyProfile
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

/// Set the derived fields the detectors read directly.
#[allow(dead_code)]
pub fn set_thermals(row: &mut HourRow, wstar: f64, cloud_base: f64) {
    row.wstar = MetersPSec(wstar).into();
    row.cloud_base = Meters(cloud_base).into();
}

/// Everything the engines decided for one profile.
#[allow(dead_code)]
pub struct Verdict {
    pub thermal: ThermalWindow,
    pub flyable: FlyableWindow,
    pub indicators: Indicators,
    pub scored: Scored,
}

/// Run the window detectors, the flag engine and the status engine on a merged profile, without
/// any model comparison.
#[allow(dead_code)]
pub fn evaluate(profile: &HourlyProfile, location: &Location, config: &TriageConfig) -> Verdict {
    let thermal = thermal_window(profile, location, &config.thermal);
    let flyable = flyable_window(profile, &config.flyable);
    let mut indicators =
        FlagEngine::new(config.flags.clone()).evaluate(profile, location, &flyable, &thermal);

    let window = WindowStats::compute(profile, config.flags.first_hour, config.flags.last_hour);
    let agreement = ModelAgreement::default();
    let ensemble = EnsembleUncertainty::default();
    let per_model = BTreeMap::new();

    let scored = StatusEngine::new(config.scoring.clone()).evaluate(
        &mut indicators.flags,
        &indicators.positives,
        &StatusContext {
            thermal_hours: thermal.duration_h,
            cloud_base_min: window.cb_min_msl,
            agreement: &agreement,
            ensemble: &ensemble,
            per_model: &per_model,
        },
    );

    Verdict {
        thermal,
        flyable,
        indicators,
        scored,
    }
}
