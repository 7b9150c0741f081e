//! Cross-location ranking, doubts and the triage report.
use crate::{
    agreement::Confidence,
    assessment::LocationReport,
    config::TriageConfig,
    keys::{Model, Param},
    profile::FamilyChains,
    status::Status,
};
use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::Serialize;

/// Version stamped on every report.
pub const APP_VERSION: &str = "2.0";

/// Ensemble spread worth mentioning, by parameter.
const DOUBT_SPREADS: [(Param, f64); 3] = [
    (Param::WindSpeed10m, 4.0),
    (Param::Cape, 600.0),
    (Param::CloudCover, 40.0),
];

/// One line of the ranking.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankEntry {
    pub key: String,
    pub location: String,
    pub status: Status,
    pub score: i32,
}

/// Rank locations by status, best first, then by score. ERROR reports are left out and ties keep
/// the input order.
pub fn rank(reports: &[LocationReport]) -> Vec<RankEntry> {
    reports
        .iter()
        .filter_map(|r| r.status().rank().map(|rank| (rank, r)))
        .sorted_by(|(rank_a, a), (rank_b, b)| {
            rank_a.cmp(rank_b).then_with(|| b.score().cmp(&a.score()))
        })
        .map(|(_, r)| RankEntry {
            key: r.key().to_owned(),
            location: r.name().to_owned(),
            status: r.status(),
            score: r.score(),
        })
        .collect()
}

/// Reasons to distrust the verdict of a location.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Doubt {
    pub key: String,
    pub location: String,
    pub issues: Vec<String>,
}

/// Collect the doubts of every assessed location: low family agreement with the parameters that
/// disagree, and large ensemble spreads.
pub fn doubts(reports: &[LocationReport]) -> Vec<Doubt> {
    reports
        .iter()
        .filter_map(|r| {
            let a = r.assessment()?;
            let mut issues = vec![];

            let agreement = &a.model_agreement;
            if agreement.confidence == Confidence::Low {
                let score = agreement
                    .agreement_score
                    .map(|s| format!("{:?}", s))
                    .unwrap_or_else(|| "?".to_owned());
                issues.push(format!("Model agreement LOW ({})", score));

                for (param, cmp) in agreement.disagreements() {
                    issues.push(format!(
                        "{}: ECMWF={:?} vs ICON={:?}",
                        param.as_ref(),
                        cmp.ecmwf,
                        cmp.icon
                    ));
                }
            }

            for (source, stats) in a.ensemble_uncertainty.iter() {
                for (param, stat) in stats.iter() {
                    let limit = DOUBT_SPREADS
                        .iter()
                        .find(|(p, _)| p == param)
                        .map(|(_, limit)| *limit);

                    if let (Some(spread), Some(limit)) = (stat.spread, limit) {
                        if spread > limit {
                            issues.push(format!(
                                "{}: high spread in {} (±{:?})",
                                source.as_ref(),
                                param.as_ref(),
                                spread
                            ));
                        }
                    }
                }
            }

            if issues.is_empty() {
                None
            } else {
                Some(Doubt {
                    key: r.key().to_owned(),
                    location: r.name().to_owned(),
                    issues,
                })
            }
        })
        .collect()
}

/// The models a run considers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelStack {
    pub deterministic_families: FamilyChains,
    pub ensemble: Vec<Model>,
    pub regional: Vec<Model>,
}

/// The complete output of a triage run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TriageReport {
    pub generated_at: String,
    pub forecast_date: NaiveDate,
    pub app_version: &'static str,
    pub model_stack: ModelStack,
    pub locations: Vec<LocationReport>,
    pub ranking: Vec<RankEntry>,
    pub doubts: Vec<Doubt>,
}

impl TriageReport {
    /// Assemble the report of a run.
    pub fn new(
        config: &TriageConfig,
        forecast_date: NaiveDate,
        generated_at: DateTime<Utc>,
        locations: Vec<LocationReport>,
    ) -> Self {
        TriageReport {
            generated_at: generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            forecast_date,
            app_version: APP_VERSION,
            model_stack: ModelStack {
                deterministic_families: config.merge.families.clone(),
                ensemble: config.ensemble_sources.clone(),
                regional: vec![Model::GeosphereArome, Model::Mosmix],
            },
            ranking: rank(&locations),
            doubts: doubts(&locations),
            locations,
        }
    }

    /// One line per ranked location, best first, for a terminal.
    pub fn summary_lines(&self) -> Vec<String> {
        self.ranking
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                format!(
                    "{:>2}. {:<15} [{}] (score: {})",
                    i + 1,
                    entry.location,
                    entry.status.as_ref(),
                    entry.score
                )
            })
            .chain(
                self.locations
                    .iter()
                    .filter(|r| r.status() == Status::Error)
                    .map(|r| format!("    {:<15} [ERROR]", r.name())),
            )
            .collect()
    }
}
