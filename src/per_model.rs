//! Simplified go/no-go of each model on its own, used to catch a merged profile that hides a
//! model calling the day off.
use crate::{
    flags::WindLevel,
    keys::Model,
    location::Location,
    profile::HourlyProfile,
    status::Status,
    windows::{flyable_window, thermal_window, FlyableCriteria, ThermalCriteria},
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Quick assessment of a single model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAssessment {
    pub flyable_hours: u32,
    pub thermal_hours: u32,
    /// One of NO-GO, UNLIKELY, MAYBE or GO.
    pub status: Status,
    pub model_label: String,
}

/// Settings of the quick assessment.
#[derive(Debug, Clone, Copy)]
pub struct QuickCheck<'a> {
    pub thermal: &'a ThermalCriteria,
    pub flyable: &'a FlyableCriteria,
    /// Level of the sustained wind check.
    pub wind_level: WindLevel,
    pub max_mean_wind: f64,
    pub reference_hour: u32,
    pub max_precip: f64,
}

impl<'a> QuickCheck<'a> {
    /// Assess one model profile.
    pub fn assess(&self, model: Model, profile: &HourlyProfile, location: &Location) -> ModelAssessment {
        let flyable = flyable_window(profile, self.flyable);
        let thermal = thermal_window(profile, location, self.thermal);

        let high_wind = self
            .wind_level
            .mean_wind(profile, self.flyable.first_hour, self.flyable.last_hour)
            .map(|w| w > self.max_mean_wind)
            .unwrap_or(false);
        let has_precip = profile
            .at(self.reference_hour)
            .and_then(|row| row.precipitation.into_option())
            .map(|p| p > self.max_precip)
            .unwrap_or(false);

        let status = if has_precip || flyable.hours == 0 || high_wind {
            Status::NoGo
        } else if thermal.duration_h <= 2 || flyable.hours < 4 {
            Status::Unlikely
        } else if thermal.duration_h <= 4 {
            Status::Maybe
        } else {
            Status::Go
        };

        ModelAssessment {
            flyable_hours: flyable.hours,
            thermal_hours: thermal.duration_h,
            status,
            model_label: model.label().to_owned(),
        }
    }

    /// Assess every model profile.
    pub fn assess_all(
        &self,
        profiles: &BTreeMap<Model, HourlyProfile>,
        location: &Location,
    ) -> BTreeMap<Model, ModelAssessment> {
        profiles
            .iter()
            .map(|(&model, profile)| (model, self.assess(model, profile, location)))
            .collect()
    }
}
