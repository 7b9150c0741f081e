//! Assessment of one location for one date: the reference hour snapshot, the window statistics,
//! flags, score and status, and the report that carries them.
use crate::{
    agreement::ModelAgreement,
    config::TriageConfig,
    ensemble::EnsembleUncertainty,
    flags::{Flag, FlagEngine},
    formulas::{cloud_base_msl, lapse_rate, wstar},
    keys::{Family, Model, Param},
    location::Location,
    per_model::{ModelAssessment, QuickCheck},
    profile::{FamilySelection, FieldSource, HourlyProfile, PriorityList, ProfileBuilder},
    series::{
        stats::{summarize, SourceSummary},
        LocationSources, SourceBag, SourceEntry,
    },
    status::{ScoreBreakdown, Status, StatusContext, StatusEngine},
    thermals::{CapturedPayload, ExternalThermals},
    utility::{max, mean, median, min, round_to, serialize_hour},
    windows::{flyable_window, thermal_window, FlyableWindow, ThermalWindow},
};
use chrono::NaiveDate;
use metfor::{Celsius, Meters, Quantity};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Score of a location that could not be assessed.
pub const ERROR_SCORE: i32 = -99;

/// Instantaneous values at the reference hour, each from the best source that has it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReferenceValues {
    pub temp_2m: Option<f64>,
    pub dewpoint_2m: Option<f64>,
    pub cloudbase_msl: Option<f64>,
    pub base_margin_over_peaks: Option<f64>,
    #[serde(rename = "wind_850hPa_ms")]
    pub wind_850_ms: Option<f64>,
    #[serde(rename = "wind_700hPa_ms")]
    pub wind_700_ms: Option<f64>,
    pub gusts_10m_ms: Option<f64>,
    #[serde(rename = "cape_J_per_kg")]
    pub cape: Option<f64>,
    #[serde(rename = "cin_J_per_kg")]
    pub cin: Option<f64>,
    pub lifted_index: Option<f64>,
    pub boundary_layer_height_m: Option<f64>,
    #[serde(rename = "lapse_rate_C_per_km")]
    pub lapse_rate: Option<f64>,
    pub wstar_ms: Option<f64>,
    pub updraft_ms: Option<f64>,
    pub cloudcover_pct: Option<f64>,
    pub cloudcover_low_pct: Option<f64>,
    pub cloudcover_mid_pct: Option<f64>,
    pub cloudcover_high_pct: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub relative_humidity_850: Option<f64>,
    pub relative_humidity_700: Option<f64>,
    pub shortwave_radiation: Option<f64>,
}

/// Looks up reference hour values and remembers where each came from.
struct ReferenceLookup<'a> {
    best: PriorityList<'a>,
    gfs: PriorityList<'a>,
    hour: u32,
    sources: BTreeMap<String, FieldSource>,
}

impl<'a> ReferenceLookup<'a> {
    fn new(bag: &'a SourceBag, selection: &FamilySelection, date: NaiveDate, hour: u32) -> Self {
        let series = |model: Model| bag.model_series(model).map(|s| (model, s));

        let best = selection
            .best_order()
            .into_iter()
            .fold(PriorityList::new(date), |list, model| {
                list.with_optional(series(model))
            });
        let gfs = PriorityList::new(date).with_optional(selection.gfs.and_then(series));

        ReferenceLookup {
            best,
            gfs,
            hour,
            sources: BTreeMap::new(),
        }
    }

    fn record(&mut self, found: Option<(f64, FieldSource)>, field: &str) -> Option<f64> {
        let (val, src) = found?;
        self.sources.insert(field.to_owned(), src);
        Some(val)
    }

    /// First value in best order.
    fn best(&mut self, param: Param, field: &str) -> Option<f64> {
        let found = self.best.resolve(param, self.hour);
        self.record(found, field)
    }

    /// Value reported by the GFS family only.
    fn gfs(&mut self, param: Param, field: &str) -> Option<f64> {
        let found = self.gfs.resolve(param, self.hour);
        self.record(found, field)
    }

    fn collect(mut self, location: &Location) -> (ReferenceValues, BTreeMap<String, FieldSource>) {
        use crate::keys::Param::*;

        let temp_2m = self.best(Temperature2m, "temp_2m");
        let dewpoint_2m = self.best(DewPoint2m, "dewpoint_2m");
        let t850 = self.best(Temperature850, "t850");
        let t700 = self.best(Temperature700, "t700");
        let boundary_layer_height_m = self.gfs(BoundaryLayerHeight, "boundary_layer_height_m");
        let shortwave_radiation = self.best(ShortwaveRadiation, "shortwave_radiation");

        let cloudbase_msl = cloud_base_msl(
            temp_2m.map(Celsius),
            dewpoint_2m.map(Celsius),
            location.elevation(),
        )
        .map(Quantity::unpack);
        let wstar_ms = wstar(
            boundary_layer_height_m.map(Meters),
            shortwave_radiation,
            temp_2m.map(Celsius),
        )
        .map(Quantity::unpack);

        let values = ReferenceValues {
            temp_2m,
            dewpoint_2m,
            cloudbase_msl,
            base_margin_over_peaks: cloudbase_msl.map(|cb| cb - location.peak_elevation_m),
            wind_850_ms: self.best(WindSpeed850, "wind_850hPa_ms"),
            wind_700_ms: self.best(WindSpeed700, "wind_700hPa_ms"),
            gusts_10m_ms: self.best(WindGusts10m, "gusts_10m_ms"),
            cape: self.best(Cape, "cape_J_per_kg"),
            cin: self.gfs(ConvectiveInhibition, "cin_J_per_kg"),
            lifted_index: self.gfs(LiftedIndex, "lifted_index"),
            boundary_layer_height_m,
            lapse_rate: lapse_rate(t850.map(Celsius), t700.map(Celsius)),
            wstar_ms,
            updraft_ms: self.best(Updraft, "updraft_ms"),
            cloudcover_pct: self.best(CloudCover, "cloudcover_pct"),
            cloudcover_low_pct: self.best(CloudCoverLow, "cloudcover_low_pct"),
            cloudcover_mid_pct: self.best(CloudCoverMid, "cloudcover_mid_pct"),
            cloudcover_high_pct: self.best(CloudCoverHigh, "cloudcover_high_pct"),
            precipitation_mm: self.best(Precipitation, "precipitation_mm"),
            relative_humidity_2m: self.best(RelativeHumidity2m, "relative_humidity_2m"),
            relative_humidity_850: self.best(RelativeHumidity850, "relative_humidity_850"),
            relative_humidity_700: self.best(RelativeHumidity700, "relative_humidity_700"),
            shortwave_radiation,
        };

        (values, self.sources)
    }
}

/// Statistics of the merged profile over the analysis window.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WindowStats {
    pub sustained_wind_850_mean: Option<f64>,
    pub sustained_wind_700_mean: Option<f64>,
    pub mean_gust_window: Option<f64>,
    pub max_gust_window: Option<f64>,
    pub max_gust_factor_window: Option<f64>,
    pub cb_min_msl: Option<f64>,
    pub cb_typ_msl: Option<f64>,
}

impl WindowStats {
    /// Compute the statistics over an inclusive range of hours.
    pub fn compute(profile: &HourlyProfile, first_hour: u32, last_hour: u32) -> Self {
        let values = |param: Param| profile.values_between(first_hour, last_hour, |r| r.raw(param));
        let gusts = values(Param::WindGusts10m);
        let gust_factors = profile.values_between(first_hour, last_hour, |r| {
            r.gust_factor.into_option().map(Quantity::unpack)
        });
        let bases = profile.values_between(first_hour, last_hour, |r| {
            r.cloud_base.into_option().map(Quantity::unpack)
        });

        WindowStats {
            sustained_wind_850_mean: mean(&values(Param::WindSpeed850)).map(|v| round_to(v, 1)),
            sustained_wind_700_mean: mean(&values(Param::WindSpeed700)).map(|v| round_to(v, 1)),
            mean_gust_window: mean(&gusts).map(|v| round_to(v, 1)),
            max_gust_window: max(&gusts).map(|v| round_to(v, 1)),
            max_gust_factor_window: max(&gust_factors).map(|v| round_to(v, 1)),
            cb_min_msl: min(&bases).map(f64::round),
            cb_typ_msl: median(&bases).map(f64::round),
        }
    }
}

/// The verdict for one location and date.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assessment {
    #[serde(flatten)]
    pub reference: ReferenceValues,

    #[serde(serialize_with = "serialize_hour")]
    pub thermal_window_start: Option<u32>,
    #[serde(serialize_with = "serialize_hour")]
    pub thermal_window_end: Option<u32>,
    pub thermal_window_hours: u32,
    #[serde(serialize_with = "serialize_hour")]
    pub thermal_window_peak: Option<u32>,

    #[serde(flatten)]
    pub window: WindowStats,
    #[serde(flatten)]
    pub flyable: FlyableWindow,

    pub flags: Vec<Flag>,
    pub positives: Vec<Flag>,
    pub score: i32,
    pub score_breakdown: ScoreBreakdown,
    pub status: Status,

    pub model_agreement: ModelAgreement,
    pub ensemble_uncertainty: EnsembleUncertainty,
    pub per_model_assessment: BTreeMap<Model, ModelAssessment>,

    #[serde(flatten)]
    pub external_thermals: Option<ExternalThermals>,

    /// Model behind each reference hour value.
    #[serde(rename = "_sources")]
    pub sources: BTreeMap<String, FieldSource>,
}

/// What was done with one entry of the source bag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceReport {
    Summary(SourceSummary),
    Failed { error: String },
    Captured { captured_api: Vec<CapturedPayload> },
}

/// Size of a per-model profile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub hours: usize,
    pub model_label: String,
}

/// The merged profile and what it was built from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HourlyAnalysis {
    pub hourly_profile: HourlyProfile,
    pub thermal_window: ThermalWindow,
    pub icon_source: Option<Model>,
    pub ecmwf_source: Option<Model>,
    pub gfs_source: Option<Model>,
    pub model_profiles_summary: BTreeMap<Model, ProfileSummary>,
}

/// Report of an assessed location.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssessedLocation {
    pub location: String,
    pub key: String,
    pub date: NaiveDate,
    pub drive_h: Option<f64>,
    pub peaks: f64,
    pub sources: BTreeMap<String, SourceReport>,
    pub hourly_analysis: HourlyAnalysis,
    pub assessment: Assessment,
}

/// Status and score of a location that could not be assessed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedAssessment {
    pub status: Status,
    pub score: i32,
}

/// Report of a location that could not be assessed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedLocation {
    pub location: String,
    pub key: String,
    pub error: String,
    pub assessment: FailedAssessment,
}

/// Per location entry of the triage report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocationReport {
    Assessed(Box<AssessedLocation>),
    Failed(FailedLocation),
}

impl LocationReport {
    /// Report an unusable location.
    pub fn failed<S: Into<String>>(location: &Location, error: S) -> Self {
        LocationReport::Failed(FailedLocation {
            location: location.name.clone(),
            key: location.key.clone(),
            error: error.into(),
            assessment: FailedAssessment {
                status: Status::Error,
                score: ERROR_SCORE,
            },
        })
    }

    /// Location key.
    pub fn key(&self) -> &str {
        match self {
            LocationReport::Assessed(a) => &a.key,
            LocationReport::Failed(f) => &f.key,
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        match self {
            LocationReport::Assessed(a) => &a.location,
            LocationReport::Failed(f) => &f.location,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            LocationReport::Assessed(a) => a.assessment.status,
            LocationReport::Failed(f) => f.assessment.status,
        }
    }

    pub fn score(&self) -> i32 {
        match self {
            LocationReport::Assessed(a) => a.assessment.score,
            LocationReport::Failed(f) => f.assessment.score,
        }
    }

    /// The full assessment, unless the location failed.
    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            LocationReport::Assessed(a) => Some(&a.assessment),
            LocationReport::Failed(_) => None,
        }
    }
}

/// Runs every analysis step for the locations of one forecast date.
#[derive(Debug)]
pub struct Assessor<'a> {
    config: &'a TriageConfig,
    date: NaiveDate,
    flag_engine: FlagEngine,
    status_engine: StatusEngine,
}

impl<'a> Assessor<'a> {
    /// Create an assessor for a forecast date.
    pub fn new(config: &'a TriageConfig, date: NaiveDate) -> Self {
        Assessor {
            config,
            date,
            flag_engine: FlagEngine::new(config.flags.clone()),
            status_engine: StatusEngine::new(config.scoring.clone()),
        }
    }

    /// The forecast date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Assess what an adapter delivered for a location.
    ///
    /// A location level failure becomes an ERROR report. Series that do not line up with their
    /// time axis are dropped with a warning before the analysis.
    pub fn assess_sources(&self, location: &Location, sources: LocationSources) -> LocationReport {
        match sources {
            LocationSources::Failed { error } => {
                warn!(location = location.key.as_str(), %error, "location failed upstream");
                LocationReport::failed(location, error)
            }
            LocationSources::Bag(mut bag) => {
                for (key, err) in bag.drop_malformed() {
                    warn!(location = location.key.as_str(), source = key.as_str(), %err, "dropped source");
                }
                self.assess(location, &bag)
            }
        }
    }

    /// Assess a location from its source bag.
    pub fn assess(&self, location: &Location, bag: &SourceBag) -> LocationReport {
        let cfg = self.config;
        let hour = cfg.hours.reference_hour;
        let (first, last) = (cfg.flags.first_hour, cfg.flags.last_hour);

        let builder = ProfileBuilder::new(
            bag,
            self.date,
            location,
            &cfg.merge,
            (cfg.hours.first_hour, cfg.hours.last_hour),
        );
        let selection = *builder.selection();
        let profile = builder.merged();
        let per_model_profiles = builder.per_model();

        let thermal = thermal_window(&profile, location, &cfg.thermal);
        let flyable = flyable_window(&profile, &cfg.flyable);
        let indicators = self
            .flag_engine
            .evaluate(&profile, location, &flyable, &thermal);
        let (mut flags, mut positives) = (indicators.flags, indicators.positives);

        let chains = &cfg.merge.families;
        let agreement = ModelAgreement::compare(
            ModelAgreement::reference_series(bag, chains.chain(Family::Ecmwf), self.date, hour),
            ModelAgreement::reference_series(bag, chains.chain(Family::Icon), self.date, hour),
            self.date,
            hour,
            &cfg.tolerances,
        );
        let ensemble = EnsembleUncertainty::evaluate(bag, &cfg.ensemble_sources, self.date, hour);

        let quick = QuickCheck {
            thermal: &cfg.thermal,
            flyable: &cfg.flyable,
            wind_level: cfg.flags.wind_level,
            max_mean_wind: cfg.flags.sustained_wind,
            reference_hour: hour,
            max_precip: cfg.flags.precip,
        };
        let per_model = quick.assess_all(&per_model_profiles, location);

        let window = WindowStats::compute(&profile, first, last);
        let scored = self.status_engine.evaluate(
            &mut flags,
            &positives,
            &StatusContext {
                thermal_hours: thermal.duration_h,
                cloud_base_min: window.cb_min_msl,
                agreement: &agreement,
                ensemble: &ensemble,
                per_model: &per_model,
            },
        );
        let (mut score, mut status) = (scored.score, scored.status);

        let external_thermals = ExternalThermals::from_bag(bag, &cfg.external_thermals);
        if let Some(mp) = &external_thermals {
            mp.apply(
                &cfg.external_thermals,
                &mut flags,
                &mut positives,
                &mut score,
                &mut status,
            );
        }

        let (reference, sources) =
            ReferenceLookup::new(bag, &selection, self.date, hour).collect(location);

        info!(
            location = location.key.as_str(),
            status = status.as_ref(),
            score,
            thermal_hours = thermal.duration_h,
            flags = flags.len(),
            "assessed"
        );

        let assessment = Assessment {
            reference,
            thermal_window_start: thermal.start,
            thermal_window_end: thermal.end,
            thermal_window_hours: thermal.duration_h,
            thermal_window_peak: thermal.peak_hour,
            window,
            flyable,
            flags,
            positives,
            score,
            score_breakdown: scored.breakdown,
            status,
            model_agreement: agreement,
            ensemble_uncertainty: ensemble,
            per_model_assessment: per_model,
            external_thermals,
            sources,
        };

        let model_profiles_summary = per_model_profiles
            .iter()
            .map(|(&model, p)| {
                (
                    model,
                    ProfileSummary {
                        hours: p.len(),
                        model_label: model.label().to_owned(),
                    },
                )
            })
            .collect();

        LocationReport::Assessed(Box::new(AssessedLocation {
            location: location.name.clone(),
            key: location.key.clone(),
            date: self.date,
            drive_h: location.drive_h,
            peaks: location.peak_elevation_m,
            sources: self.source_reports(bag),
            hourly_analysis: HourlyAnalysis {
                hourly_profile: profile,
                thermal_window: thermal,
                icon_source: selection.icon,
                ecmwf_source: selection.ecmwf,
                gfs_source: selection.gfs,
                model_profiles_summary,
            },
            assessment,
        }))
    }

    fn source_reports(&self, bag: &SourceBag) -> BTreeMap<String, SourceReport> {
        let cfg = self.config;

        bag.iter()
            .map(|(key, entry)| {
                let report = match entry {
                    SourceEntry::Series(series) => SourceReport::Summary(summarize(
                        key,
                        series,
                        self.date,
                        cfg.hours.reference_hour,
                        (cfg.flags.first_hour, cfg.flags.last_hour),
                    )),
                    SourceEntry::Failed { error } => SourceReport::Failed {
                        error: error.clone(),
                    },
                    SourceEntry::Captured { captured_api } => SourceReport::Captured {
                        captured_api: captured_api.clone(),
                    },
                };
                (key.to_owned(), report)
            })
            .collect()
    }
}
