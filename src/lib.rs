//! Multi-model forecast triage for paragliding.
//!
//! Hourly series from several weather models are merged into one profile per location and date.
//! The profile is scanned for a thermal window and a continuous flyable window, checked against
//! hazard thresholds, cross checked between model families and ensembles, and finally reduced to
//! a score and a status like `GO` or `NO-GO`. Locations are then ranked against each other.
//!
//! ```
//! use chrono::NaiveDate;
//! use thermal_triage::{Assessor, Location, SourceBag, Status, TriageConfig};
//!
//! let config = TriageConfig::default();
//! let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
//! let assessor = Assessor::new(&config, date);
//!
//! let report = assessor.assess(&Location::new("lenggries", 700.0, 1800.0), &SourceBag::new());
//! assert_eq!(report.status(), Status::NoData);
//! ```

//
// API
//
pub use crate::{
    agreement::{Confidence, ModelAgreement},
    assessment::{Assessment, Assessor, LocationReport, ERROR_SCORE},
    config::{load_config, TriageConfig},
    ensemble::EnsembleUncertainty,
    error::{Result, TriageError},
    flags::{Category, Flag, Tag},
    formulas::{cloud_base_msl, gust_factor, lapse_rate, wstar},
    keys::{Family, Model, Param},
    location::Location,
    profile::{HourlyProfile, MergeMode},
    series::{HourlySeries, LocationSources, SourceBag, SourceEntry},
    status::Status,
    triage::{doubts, rank, Doubt, RankEntry, TriageReport},
    windows::{FlyableWindow, ThermalWindow},
};

pub mod agreement;
pub mod assessment;
pub mod config;
pub mod ensemble;
pub mod flags;
pub mod per_model;
pub mod profile;
pub mod series;
pub mod status;
pub mod thermals;
pub mod triage;
pub mod windows;

/// Quantities and helpers shared by the analysis modules.
pub mod utility;

//
// Internal use only
//
mod error;
mod formulas;
mod keys;
mod location;
