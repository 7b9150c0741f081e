//! Score and status of an assessment, with the hard overrides that cap it.
use crate::{
    agreement::{Confidence, ModelAgreement},
    ensemble::EnsembleUncertainty,
    flags::{count_category, count_tag, Category, Flag, Tag},
    keys::{Model, Param},
    per_model::ModelAssessment,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, EnumIter, EnumString};
use tracing::debug;

/// Categorical outcome of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, AsRefStr)]
pub enum Status {
    #[strum(serialize = "STRONG")]
    Strong,
    #[strum(serialize = "GO")]
    Go,
    #[strum(serialize = "MAYBE")]
    Maybe,
    #[strum(serialize = "UNLIKELY")]
    Unlikely,
    #[strum(serialize = "NO-GO")]
    NoGo,
    #[strum(serialize = "NO DATA")]
    NoData,
    /// The location could not be assessed at all.
    #[strum(serialize = "ERROR")]
    Error,
}

impl Status {
    /// Status band of a score.
    pub fn from_score(score: i32) -> Self {
        if score <= -5 {
            Status::NoGo
        } else if score <= -2 {
            Status::Unlikely
        } else if score <= 1 {
            Status::Maybe
        } else if score <= 4 {
            Status::Go
        } else {
            Status::Strong
        }
    }

    /// GO or STRONG, the statuses the overrides cap.
    pub fn is_favourable(self) -> bool {
        self == Status::Go || self == Status::Strong
    }

    /// NO-GO or UNLIKELY.
    pub fn is_unfavourable(self) -> bool {
        self == Status::NoGo || self == Status::Unlikely
    }

    /// Position in the ranking, best first. Errors are not ranked.
    pub fn rank(self) -> Option<u8> {
        use self::Status::*;

        match self {
            Strong => Some(0),
            Go => Some(1),
            Maybe => Some(2),
            Unlikely => Some(3),
            NoGo => Some(4),
            NoData => Some(5),
            Error => None,
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}

/// Base score for a thermal window of up to `max_hours`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBand {
    pub max_hours: u32,
    pub score: i32,
}

/// Weights and limits of the scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Base score bands, checked in order.
    pub window_bands: Vec<WindowBand>,
    /// Base score of a window longer than every band.
    pub long_window_score: i32,

    pub critical_penalty: i32,
    pub low_base_penalty: i32,
    pub quality_penalty: i32,
    pub danger_penalty: i32,
    pub positive_bonus: i32,
    pub very_high_base_bonus: i32,

    /// A minimum cloud base below this caps the status at MAYBE, m MSL.
    pub hard_min_cloud_base: f64,
    /// Ensemble 10 m wind spread capping the status at MAYBE, m/s.
    pub ensemble_wind_spread: f64,
    /// Ensemble CAPE spread capping the status at MAYBE, J/kg.
    pub ensemble_cape_spread: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            window_bands: vec![
                WindowBand {
                    max_hours: 0,
                    score: -6,
                },
                WindowBand {
                    max_hours: 2,
                    score: -2,
                },
                WindowBand {
                    max_hours: 4,
                    score: 1,
                },
                WindowBand {
                    max_hours: 6,
                    score: 4,
                },
            ],
            long_window_score: 6,

            critical_penalty: 3,
            low_base_penalty: 2,
            quality_penalty: 1,
            danger_penalty: 1,
            positive_bonus: 1,
            very_high_base_bonus: 2,

            hard_min_cloud_base: 2000.0,
            ensemble_wind_spread: 5.0,
            ensemble_cape_spread: 1000.0,
        }
    }
}

impl ScoringConfig {
    /// Base score of a thermal window duration.
    pub fn base_score(&self, thermal_hours: u32) -> i32 {
        self.window_bands
            .iter()
            .find(|band| thermal_hours <= band.max_hours)
            .map(|band| band.score)
            .unwrap_or(self.long_window_score)
    }
}

/// How the score was put together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub tw_hours: u32,
    pub base_score: i32,
    pub n_critical: usize,
    pub n_low_base: usize,
    pub n_quality: usize,
    pub n_danger: usize,
    /// Positives other than VERY_HIGH_BASE.
    pub n_positive: usize,
    pub n_very_high_base: usize,
}

/// What the status engine needs besides the flags.
#[derive(Debug, Clone, Copy)]
pub struct StatusContext<'a> {
    pub thermal_hours: u32,
    /// Minimum cloud base over the analysis window, m MSL.
    pub cloud_base_min: Option<f64>,
    pub agreement: &'a ModelAgreement,
    pub ensemble: &'a EnsembleUncertainty,
    pub per_model: &'a BTreeMap<Model, ModelAssessment>,
}

/// Final score and status.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: i32,
    pub status: Status,
    pub breakdown: ScoreBreakdown,
}

/// Computes the score and status.
#[derive(Debug, Clone, Default)]
pub struct StatusEngine {
    config: ScoringConfig,
}

impl StatusEngine {
    /// Create an engine.
    pub fn new(config: ScoringConfig) -> Self {
        StatusEngine { config }
    }

    /// Score the flags and positives and apply the hard overrides in order.
    ///
    /// Overrides that cap the status append their own flag to `flags`. They never count toward
    /// the score.
    pub fn evaluate(&self, flags: &mut Vec<Flag>, positives: &[Flag], ctx: &StatusContext) -> Scored {
        let cfg = &self.config;

        let breakdown = ScoreBreakdown {
            tw_hours: ctx.thermal_hours,
            base_score: cfg.base_score(ctx.thermal_hours),
            n_critical: count_category(flags, Category::Critical),
            n_low_base: count_category(flags, Category::LowBase),
            n_quality: count_category(flags, Category::Quality),
            n_danger: count_category(flags, Category::Danger),
            n_positive: positives.len() - count_tag(positives, Tag::VeryHighBase),
            n_very_high_base: count_tag(positives, Tag::VeryHighBase),
        };

        let n = |count: usize| count as i32;
        let mut score = breakdown.base_score
            - n(breakdown.n_critical) * cfg.critical_penalty
            - n(breakdown.n_low_base) * cfg.low_base_penalty
            - n(breakdown.n_quality) * cfg.quality_penalty
            - n(breakdown.n_danger) * cfg.danger_penalty
            + n(breakdown.n_positive) * cfg.positive_bonus
            + n(breakdown.n_very_high_base) * cfg.very_high_base_bonus;

        let mut status = Status::from_score(score);
        debug!(score, status = status.as_ref(), "scored");

        // Critical flags
        if breakdown.n_critical >= 2 || (breakdown.n_critical >= 1 && breakdown.n_low_base >= 1) {
            status = Status::NoGo;
        } else if breakdown.n_critical >= 1 && status.is_favourable() {
            status = Status::Maybe;
        }

        // Hard cloud base limit
        if let Some(cb_min) = ctx.cloud_base_min {
            if cb_min < cfg.hard_min_cloud_base && status.is_favourable() {
                status = Status::Maybe;
                flags.push(Flag::new(
                    Tag::LowBaseHard,
                    format!(
                        "min base {:.0}m MSL < {:.0}m → max MAYBE",
                        cb_min, cfg.hard_min_cloud_base
                    ),
                ));
            }
        }

        // Individual models calling it off
        let bad_models: Vec<&ModelAssessment> = ctx
            .per_model
            .values()
            .filter(|m| m.status.is_unfavourable())
            .collect();
        if !bad_models.is_empty() && status.is_favourable() {
            score -= n(bad_models.len());
            let labels = bad_models.iter().map(|m| m.model_label.as_str()).join(", ");
            flags.push(Flag::new(
                Tag::ModelDisagree,
                format!("{} → no-fly/unlikely", labels),
            ));
            status = if bad_models.len() >= 2 {
                Status::Unlikely
            } else {
                Status::Maybe
            };
        }

        // Family disagreement
        if ctx.agreement.confidence == Confidence::Low && status.is_favourable() {
            status = Status::Maybe;
            let agreement_score = ctx
                .agreement
                .agreement_score
                .map(|s| format!("{:?}", s))
                .unwrap_or_else(|| "?".to_owned());
            flags.push(Flag::new(
                Tag::LowConfidence,
                format!("model agreement {} → confidence LOW", agreement_score),
            ));
        }

        // Ensemble spread
        for (source, _) in ctx.ensemble.iter() {
            let name = source.as_ref();

            if let Some(spread) = ctx.ensemble.spread(source, Param::WindSpeed10m) {
                if spread > cfg.ensemble_wind_spread && status.is_favourable() {
                    status = Status::Maybe;
                    flags.push(Flag::new(
                        Tag::EnsWindSpread,
                        format!("{} wind spread {:.1} m/s", name, spread),
                    ));
                }
            }

            if let Some(spread) = ctx.ensemble.spread(source, Param::Cape) {
                if spread > cfg.ensemble_cape_spread && status.is_favourable() {
                    status = Status::Maybe;
                    flags.push(Flag::new(
                        Tag::EnsCapeSpread,
                        format!("{} CAPE spread {:.0} J/kg", name, spread),
                    ));
                }
            }
        }

        if breakdown.n_critical == 0
            && breakdown.n_quality == 0
            && positives.is_empty()
            && ctx.thermal_hours == 0
        {
            status = Status::NoData;
        }

        Scored {
            score,
            status,
            breakdown,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        keys::Model,
        series::{HourlySeries, SourceBag},
    };
    use chrono::NaiveDate;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn flag(tag: Tag) -> Flag {
        Flag::new(tag, "")
    }

    struct Fixture {
        agreement: ModelAgreement,
        ensemble: EnsembleUncertainty,
        per_model: BTreeMap<Model, ModelAssessment>,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                agreement: ModelAgreement::default(),
                ensemble: EnsembleUncertainty::default(),
                per_model: BTreeMap::new(),
            }
        }

        fn ctx(&self, thermal_hours: u32, cloud_base_min: Option<f64>) -> StatusContext {
            StatusContext {
                thermal_hours,
                cloud_base_min,
                agreement: &self.agreement,
                ensemble: &self.ensemble,
                per_model: &self.per_model,
            }
        }
    }

    fn quick(model: Model, status: Status) -> ModelAssessment {
        ModelAssessment {
            flyable_hours: 5,
            thermal_hours: 5,
            status,
            model_label: model.label().to_owned(),
        }
    }

    #[test]
    fn test_status_names() {
        for status in Status::iter() {
            assert_eq!(Status::from_str(status.as_ref()).unwrap(), status);
        }
        assert_eq!(Status::NoGo.as_ref(), "NO-GO");
        assert_eq!(Status::NoData.as_ref(), "NO DATA");
        assert_eq!(serde_json::to_string(&Status::Strong).unwrap(), r#""STRONG""#);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(Status::from_score(-5), Status::NoGo);
        assert_eq!(Status::from_score(-4), Status::Unlikely);
        assert_eq!(Status::from_score(-2), Status::Unlikely);
        assert_eq!(Status::from_score(1), Status::Maybe);
        assert_eq!(Status::from_score(2), Status::Go);
        assert_eq!(Status::from_score(4), Status::Go);
        assert_eq!(Status::from_score(5), Status::Strong);

        let cfg = ScoringConfig::default();
        let base: Vec<i32> = (0..=8).map(|h| cfg.base_score(h)).collect();
        assert_eq!(base, vec![-6, -2, -2, 1, 1, 4, 4, 6, 6]);
    }

    #[test]
    fn test_ranking_order() {
        let ranked: Vec<Status> = Status::iter()
            .filter(|s| s.rank().is_some())
            .sorted_by_key(|s| s.rank())
            .collect();
        assert_eq!(ranked.first(), Some(&Status::Strong));
        assert_eq!(ranked.last(), Some(&Status::NoData));
        assert_eq!(Status::Error.rank(), None);
    }

    #[test]
    fn test_score_arithmetic() {
        let fx = Fixture::new();
        let mut flags = vec![flag(Tag::ShortWindow), flag(Tag::LowBase)];
        let positives = vec![flag(Tag::GoodWstar)];

        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(4, Some(2500.0)));
        assert_eq!(scored.score, -1);
        assert_eq!(scored.status, Status::Maybe);
        assert_eq!(scored.breakdown.base_score, 1);
        assert_eq!(scored.breakdown.n_low_base, 1);
        assert_eq!(flags.len(), 2);
    }

    #[test]
    fn test_two_critical_is_no_go() {
        let fx = Fixture::new();
        let mut flags = vec![flag(Tag::SustainedWind700), flag(Tag::GustsHigh)];
        let positives: Vec<Flag> = [
            Tag::StrongLapse,
            Tag::GoodCape,
            Tag::DeepBl,
            Tag::LongWindow,
            Tag::ClearSky,
            Tag::GoodWstar,
            Tag::StrongSun,
        ]
        .iter()
        .map(|&t| flag(t))
        .chain(std::iter::once(flag(Tag::VeryHighBase)))
        .collect();

        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(8, None));
        // 6 - 6 + 7 + 2
        assert_eq!(scored.score, 9);
        assert_eq!(scored.status, Status::NoGo);
        assert_eq!(scored.breakdown.n_very_high_base, 1);
        assert_eq!(scored.breakdown.n_positive, 7);
    }

    #[test]
    fn test_critical_with_low_base_is_no_go() {
        let fx = Fixture::new();
        let mut flags = vec![flag(Tag::Precip13), flag(Tag::LowBase)];
        let positives = vec![flag(Tag::LongWindow); 6];

        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.status, Status::NoGo);

        // One critical alone only caps.
        let mut flags = vec![flag(Tag::Precip13)];
        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.score, 9);
        assert_eq!(scored.status, Status::Maybe);
    }

    #[test]
    fn test_hard_base_cap() {
        let fx = Fixture::new();
        let positives = vec![flag(Tag::LongWindow)];

        let mut flags = vec![];
        let scored =
            StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, Some(1850.0)));
        assert_eq!(scored.status, Status::Maybe);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].tag, Tag::LowBaseHard);
        assert_eq!(flags[0].msg, "min base 1850m MSL < 2000m → max MAYBE");

        // Nothing to cap, nothing appended.
        let mut flags = vec![];
        let scored =
            StatusEngine::default().evaluate(&mut flags, &[], &fx.ctx(1, Some(1850.0)));
        assert_eq!(scored.status, Status::Unlikely);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_model_disagreement() {
        let mut fx = Fixture::new();
        fx.per_model.insert(Model::IconD2, quick(Model::IconD2, Status::Go));
        fx.per_model.insert(Model::Gfs, quick(Model::Gfs, Status::NoGo));
        let positives = vec![flag(Tag::LongWindow)];

        let mut flags = vec![];
        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.score, 6);
        assert_eq!(scored.status, Status::Maybe);
        assert_eq!(flags[0].tag, Tag::ModelDisagree);
        assert_eq!(flags[0].msg, "GFS 0.25° → no-fly/unlikely");

        fx.per_model
            .insert(Model::EcmwfIfs025, quick(Model::EcmwfIfs025, Status::Unlikely));
        let mut flags = vec![];
        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.score, 5);
        assert_eq!(scored.status, Status::Unlikely);
        assert_eq!(
            flags[0].msg,
            "ECMWF IFS HRES 0.25°, GFS 0.25° → no-fly/unlikely"
        );
    }

    #[test]
    fn test_low_confidence() {
        let mut fx = Fixture::new();
        fx.agreement.confidence = Confidence::Low;
        fx.agreement.agreement_score = Some(0.33);
        let positives = vec![flag(Tag::LongWindow)];

        let mut flags = vec![];
        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.status, Status::Maybe);
        assert_eq!(flags[0].msg, "model agreement 0.33 → confidence LOW");

        // Unknown agreement is not low agreement.
        fx.agreement = ModelAgreement::default();
        let mut flags = vec![];
        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.status, Status::Strong);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_ensemble_spread() {
        let mut fx = Fixture::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let ens = HourlySeries::new(vec!["2026-03-07T13:00".to_owned()])
            .with_param("windspeed_10m_spread", vec![Some(5.6)])
            .with_param("cape_spread", vec![Some(1400.0)]);
        let bag = SourceBag::new().with_series(Model::IconEuEps, ens);
        fx.ensemble = EnsembleUncertainty::evaluate(&bag, &[Model::IconEuEps], date, 13);
        let positives = vec![flag(Tag::LongWindow)];

        let mut flags = vec![];
        let scored = StatusEngine::default().evaluate(&mut flags, &positives, &fx.ctx(7, None));
        assert_eq!(scored.status, Status::Maybe);
        // Once capped, the CAPE spread no longer applies.
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].msg, "icon_eu_eps wind spread 5.6 m/s");
    }

    #[test]
    fn test_no_data() {
        let fx = Fixture::new();
        let mut flags = vec![flag(Tag::HighCape)];
        let scored = StatusEngine::default().evaluate(&mut flags, &[], &fx.ctx(0, None));
        assert_eq!(scored.score, -7);
        assert_eq!(scored.status, Status::NoData);

        let mut flags = vec![flag(Tag::Overcast)];
        let scored = StatusEngine::default().evaluate(&mut flags, &[], &fx.ctx(0, None));
        assert_eq!(scored.status, Status::NoGo);
    }
}
