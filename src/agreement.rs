//! Agreement between the ECMWF and ICON families at the reference hour.
use crate::{
    keys::{Model, Param},
    series::{HourlySeries, SourceBag},
    utility::round_to,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How much the two families agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    /// One of the families is missing or nothing could be compared. Not the same as `Low`.
    Unknown,
}

impl Confidence {
    /// Confidence band of an agreement score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Confidence::High
        } else if score >= 0.5 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Default absolute tolerances of the compared parameters.
pub fn default_tolerances() -> BTreeMap<Param, f64> {
    use crate::keys::Param::*;

    [
        (Temperature2m, 2.0),
        (WindSpeed10m, 2.0),
        (WindGusts10m, 3.0),
        (CloudCover, 20.0),
        (Precipitation, 0.5),
        (Cape, 200.0),
        (WindSpeed700, 2.0),
    ]
    .iter()
    .cloned()
    .collect()
}

/// Comparison of a single parameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParamComparison {
    pub ecmwf: f64,
    pub icon: f64,
    pub diff: f64,
    pub agree: bool,
}

/// Result of comparing the two families.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelAgreement {
    /// Fraction of agreeing parameters, `None` when nothing was compared.
    pub agreement_score: Option<f64>,
    pub confidence: Confidence,
    pub details: BTreeMap<Param, ParamComparison>,
}

impl Default for ModelAgreement {
    fn default() -> Self {
        ModelAgreement {
            agreement_score: None,
            confidence: Confidence::Unknown,
            details: BTreeMap::new(),
        }
    }
}

impl ModelAgreement {
    /// The first member of a family chain whose series has the hour on its time axis.
    ///
    /// This walks further down the chain than the profile selection does: a member may cover the
    /// date but stop before the reference hour.
    pub fn reference_series<'a>(
        bag: &'a SourceBag,
        chain: &[Model],
        date: NaiveDate,
        hour: u32,
    ) -> Option<&'a HourlySeries> {
        chain
            .iter()
            .filter_map(|&model| bag.model_series(model))
            .find(|series| series.hour_index(date, hour).is_some())
    }

    /// Compare the ECMWF and ICON series at a local hour.
    ///
    /// Only parameters present in both are compared. A family without a series, or without the
    /// hour on its time axis, gives an unknown result.
    pub fn compare(
        ecmwf: Option<&HourlySeries>,
        icon: Option<&HourlySeries>,
        date: NaiveDate,
        hour: u32,
        tolerances: &BTreeMap<Param, f64>,
    ) -> Self {
        let (ecmwf, icon) = match (ecmwf, icon) {
            (Some(e), Some(i)) => (e, i),
            _ => return ModelAgreement::default(),
        };

        let (e_idx, i_idx) = match (ecmwf.hour_index(date, hour), icon.hour_index(date, hour)) {
            (Some(e), Some(i)) => (e, i),
            _ => return ModelAgreement::default(),
        };

        let details: BTreeMap<Param, ParamComparison> = tolerances
            .iter()
            .filter_map(|(&param, &tol)| {
                let ve = ecmwf.value(param.as_ref(), e_idx)?;
                let vi = icon.value(param.as_ref(), i_idx)?;
                let diff = (ve - vi).abs();

                Some((
                    param,
                    ParamComparison {
                        ecmwf: round_to(ve, 2),
                        icon: round_to(vi, 2),
                        diff: round_to(diff, 2),
                        agree: diff <= tol,
                    },
                ))
            })
            .collect();

        if details.is_empty() {
            return ModelAgreement::default();
        }

        let n_agree = details.values().filter(|c| c.agree).count();
        let score = n_agree as f64 / details.len() as f64;

        ModelAgreement {
            agreement_score: Some(round_to(score, 2)),
            confidence: Confidence::from_score(score),
            details,
        }
    }

    /// Parameters on which the families disagree.
    pub fn disagreements(&self) -> impl Iterator<Item = (Param, &ParamComparison)> {
        self.details
            .iter()
            .filter(|(_, c)| !c.agree)
            .map(|(&p, c)| (p, c))
    }
}
