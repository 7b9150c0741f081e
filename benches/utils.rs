use chrono::NaiveDate;
use std::{fs::File, io::Read, path::PathBuf};
use thermal_triage::{Location, LocationSources, SourceBag, TriageConfig};

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
}

pub fn load_config() -> TriageConfig {
    thermal_triage::load_config("triage.toml").expect("Error loading triage.toml")
}

/// Every fixture bag that is not a location failure, with its location.
pub fn load_all_test_files(config: &TriageConfig) -> Vec<(Location, SourceBag)> {
    ["koessen", "innsbruck"]
        .iter()
        .filter_map(|key| {
            let location = config.location(key).expect("unknown location").clone();
            match load_test_file(&format!("{}.json", key)) {
                LocationSources::Bag(bag) => Some((location, bag)),
                LocationSources::Failed { .. } => None,
            }
        })
        .collect()
}

fn load_test_file(fname: &str) -> LocationSources {
    let mut test_path = PathBuf::new();
    test_path.push("test_data");
    test_path.push(fname);

    let mut f = File::open(&test_path).expect(&format!("Error opening file: {:#?}", test_path));
    let mut contents = String::new();
    f.read_to_string(&mut contents)
        .expect(&format!("Error reading file: {:#?}", test_path));

    contents.parse().expect("Error parsing source bag")
}
