//! Configuration loaded from a TOML file.
//!
//! Every table is optional and falls back to the built in defaults, so a file with only the
//! `[[location]]` entries is a complete configuration.
use crate::{
    agreement::default_tolerances,
    error::{Result, TriageError},
    flags::FlagThresholds,
    keys::{Model, Param},
    location::Location,
    profile::MergeConfig,
    status::ScoringConfig,
    thermals::ExternalThermalConfig,
    windows::{FlyableCriteria, ThermalCriteria},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

/// Local hours the analysis works with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisHours {
    /// First hour of the profiles.
    pub first_hour: u32,
    /// Last hour of the profiles.
    pub last_hour: u32,
    /// Hour of the instantaneous snapshot and checks.
    pub reference_hour: u32,
}

impl Default for AnalysisHours {
    fn default() -> Self {
        AnalysisHours {
            first_hour: 8,
            last_hour: 18,
            reference_hour: 13,
        }
    }
}

/// Complete configuration of a triage run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    #[serde(rename = "location")]
    pub locations: Vec<Location>,
    pub hours: AnalysisHours,
    pub merge: MergeConfig,
    pub thermal: ThermalCriteria,
    pub flyable: FlyableCriteria,
    pub flags: FlagThresholds,
    pub scoring: ScoringConfig,
    /// Agreement tolerances between the ECMWF and ICON families.
    pub tolerances: BTreeMap<Param, f64>,
    /// Ensemble sources, in report order.
    pub ensemble_sources: Vec<Model>,
    pub external_thermals: ExternalThermalConfig,
}

impl Default for TriageConfig {
    fn default() -> Self {
        TriageConfig {
            locations: vec![],
            hours: AnalysisHours::default(),
            merge: MergeConfig::default(),
            thermal: ThermalCriteria::default(),
            flyable: FlyableCriteria::default(),
            flags: FlagThresholds::default(),
            scoring: ScoringConfig::default(),
            tolerances: default_tolerances(),
            ensemble_sources: vec![Model::EcmwfEns, Model::IconEuEps],
            external_thermals: ExternalThermalConfig::default(),
        }
    }
}

impl FromStr for TriageConfig {
    type Err = TriageError;

    fn from_str(contents: &str) -> Result<Self> {
        let config: TriageConfig =
            toml::from_str(contents).map_err(|err| TriageError::ConfigParse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }
}

impl TriageConfig {
    /// Check that every analysis window lies inside the hours of the profiles.
    ///
    /// The flag window, the flyable window, the thermal window start and the reference hour all
    /// read rows of the merged profile, which only spans `[hours]`.
    pub fn validate(&self) -> Result<()> {
        let (first, last) = (self.hours.first_hour, self.hours.last_hour);
        if first > last || last > 23 {
            return Err(TriageError::ConfigParse(format!(
                "[hours] {}..{} is not a range of local hours",
                first, last
            )));
        }

        let windows = [
            ("[hours] reference_hour", self.hours.reference_hour, self.hours.reference_hour),
            ("[flags]", self.flags.first_hour, self.flags.last_hour),
            ("[flyable]", self.flyable.first_hour, self.flyable.last_hour),
            ("[thermal] first_hour", self.thermal.first_hour, self.thermal.first_hour),
        ];

        for &(name, start, end) in windows.iter() {
            if start > end || start < first || end > last {
                return Err(TriageError::ConfigParse(format!(
                    "{} {}..{} is outside the profile hours {}..{}",
                    name, start, end, first, last
                )));
            }
        }

        Ok(())
    }

    /// Look up a location by key.
    pub fn location(&self, key: &str) -> Result<&Location> {
        self.locations
            .iter()
            .find(|loc| loc.key == key)
            .ok_or_else(|| TriageError::UnknownLocation(key.to_owned()))
    }
}

/// Load the configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TriageConfig> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|err| TriageError::ConfigRead {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    contents.parse()
}
