#![allow(dead_code)]

use thermal_triage::{
    flags::{count_category, Category},
    LocationReport, Param, Status,
};

fn assessed(report: &LocationReport) -> &thermal_triage::assessment::AssessedLocation {
    match report {
        LocationReport::Assessed(a) => a,
        LocationReport::Failed(f) => panic!("{} failed: {}", f.key, f.error),
    }
}

pub fn check_thermal_duration(report: &LocationReport) {
    let loc = assessed(report);
    let window = &loc.hourly_analysis.thermal_window;

    // Candidate hours are 09:00 through 18:00.
    assert!(window.duration_h <= 10);
    assert_eq!(window.duration_h, loc.assessment.thermal_window_hours);

    match (window.start, window.end) {
        (Some(start), Some(end)) => {
            assert!(start <= end);
            assert!(window.duration_h >= 1);
            assert!(window.duration_h <= end - start + 1);
        }
        (None, None) => assert_eq!(window.duration_h, 0),
        _ => panic!("half open thermal window"),
    }
}

pub fn check_no_data_exclusivity(report: &LocationReport) {
    let a = &assessed(report).assessment;

    let n_critical = count_category(&a.flags, Category::Critical);
    let n_quality = count_category(&a.flags, Category::Quality);
    let empty = n_critical == 0
        && n_quality == 0
        && a.positives.is_empty()
        && a.thermal_window_hours == 0;

    assert_eq!(a.status == Status::NoData, empty);
}

pub fn check_provenance(report: &LocationReport) {
    let loc = assessed(report);

    for row in loc.hourly_analysis.hourly_profile.rows() {
        for &param in Param::PROFILE.iter() {
            if row.raw(param).is_some() {
                assert!(
                    row.provenance.source_of(param).is_some(),
                    "{} at {:02}:00 has no source",
                    param.as_ref(),
                    row.hour
                );
            }
        }
    }
}

pub fn check_report_json(report: &LocationReport) {
    let json = serde_json::to_value(report).unwrap();
    let loc = assessed(report);

    assert_eq!(json["key"], loc.key.as_str());
    assert_eq!(json["assessment"]["status"], loc.assessment.status.as_ref());
    assert_eq!(json["assessment"]["score"], loc.assessment.score);
    assert!(json["assessment"]["flags"].is_array());
    assert!(json["assessment"]["_sources"].is_object());
    assert!(json["hourly_analysis"]["hourly_profile"].is_array());
}
