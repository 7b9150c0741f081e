//! Ensemble percentiles and spread at the reference hour.
use crate::{
    keys::{Model, Param},
    series::{HourlySeries, SourceBag},
    utility::round_to,
};
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;

/// Minimum number of non-missing members for a time step to get percentiles.
const MIN_MEMBERS: usize = 3;

/// Percentiles of one parameter at one hour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EnsembleStat {
    pub p50: Option<f64>,
    pub spread: Option<f64>,
    pub p10: Option<f64>,
    pub p90: Option<f64>,
}

/// Ensemble statistics per source, in the configured source order.
///
/// Sources with no usable parameter are left out.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnsembleUncertainty {
    sources: Vec<(Model, BTreeMap<Param, EnsembleStat>)>,
}

impl EnsembleUncertainty {
    /// Read the percentiles of every ensemble parameter at a local hour.
    ///
    /// A series that still holds raw members is aggregated first.
    pub fn evaluate(bag: &SourceBag, sources: &[Model], date: NaiveDate, hour: u32) -> Self {
        let mut result = vec![];

        for &model in sources {
            let series = match bag.model_series(model) {
                Some(series) => series,
                None => continue,
            };

            let aggregated;
            let series = if needs_aggregation(series) {
                aggregated = aggregate_members(series, &Param::ENSEMBLE);
                &aggregated
            } else {
                series
            };

            let idx = match series.hour_index(date, hour) {
                Some(idx) => idx,
                None => continue,
            };

            let stats: BTreeMap<Param, EnsembleStat> = Param::ENSEMBLE
                .iter()
                .filter_map(|&param| {
                    let get = |suffix: &str| {
                        series.value(&format!("{}_{}", param.as_ref(), suffix), idx)
                    };

                    let stat = EnsembleStat {
                        p50: get("p50"),
                        spread: get("spread"),
                        p10: get("p10"),
                        p90: get("p90"),
                    };

                    if stat.p50.is_some() || stat.spread.is_some() {
                        Some((param, stat))
                    } else {
                        None
                    }
                })
                .collect();

            if !stats.is_empty() {
                debug!(source = model.as_ref(), params = stats.len(), "ensemble");
                result.push((model, stats));
            }
        }

        EnsembleUncertainty { sources: result }
    }

    /// Sources with their statistics.
    pub fn iter(&self) -> impl Iterator<Item = (Model, &BTreeMap<Param, EnsembleStat>)> {
        self.sources.iter().map(|(m, stats)| (*m, stats))
    }

    /// Spread of a parameter in one source.
    pub fn spread(&self, source: Model, param: Param) -> Option<f64> {
        self.sources
            .iter()
            .find(|(m, _)| *m == source)
            .and_then(|(_, stats)| stats.get(&param))
            .and_then(|stat| stat.spread)
    }

    /// Whether no source had usable data.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Serialize for EnsembleUncertainty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.sources.iter().map(|(m, stats)| (m, stats)))
    }
}

fn member_keys<'a>(series: &'a HourlySeries, param: Param) -> Vec<&'a str> {
    let prefix = format!("{}_member", param.as_ref());
    // Keys of a BTreeMap come out sorted.
    series
        .params
        .keys()
        .filter(|k| k.starts_with(&prefix))
        .map(String::as_str)
        .collect()
}

fn needs_aggregation(series: &HourlySeries) -> bool {
    let has_members = Param::ENSEMBLE
        .iter()
        .any(|&p| !member_keys(series, p).is_empty());
    let has_percentiles = series.params.keys().any(|k| k.ends_with("_p50"));

    has_members && !has_percentiles
}

/// Reduce raw ensemble members to `{param}_p10`, `_p50`, `_p90` and `_spread` arrays.
///
/// Members are the keys `{param}_member*`. A time step with fewer than three non-missing members
/// gets missing percentiles. With `n` sorted values the 10th percentile is the value at
/// `floor(0.1 n)`, the median at `n / 2` and the 90th percentile at `min(n - 1, floor(0.9 n))`.
/// Parameters without members are left out.
pub fn aggregate_members(raw: &HourlySeries, params: &[Param]) -> HourlySeries {
    let n_steps = raw.time.len();
    let mut result = HourlySeries::new(raw.time.clone());

    for &param in params {
        let keys = member_keys(raw, param);
        if keys.is_empty() {
            continue;
        }

        let mut p10 = Vec::with_capacity(n_steps);
        let mut p50 = Vec::with_capacity(n_steps);
        let mut p90 = Vec::with_capacity(n_steps);
        let mut spread = Vec::with_capacity(n_steps);

        for i in 0..n_steps {
            let mut vals: Vec<f64> = keys.iter().filter_map(|k| raw.value(k, i)).collect();

            if vals.len() < MIN_MEMBERS {
                p10.push(None);
                p50.push(None);
                p90.push(None);
                spread.push(None);
                continue;
            }

            vals.sort_by(|a, b| a.total_cmp(b));
            let n = vals.len();
            let i10 = (n as f64 * 0.1) as usize;
            let i90 = ((n as f64 * 0.9) as usize).min(n - 1);

            p10.push(Some(round_to(vals[i10], 2)));
            p50.push(Some(round_to(vals[n / 2], 2)));
            p90.push(Some(round_to(vals[i90], 2)));
            spread.push(Some(round_to(vals[i90] - vals[i10], 2)));
        }

        let name = param.as_ref();
        result = result
            .with_param(format!("{}_p10", name), p10)
            .with_param(format!("{}_p50", name), p50)
            .with_param(format!("{}_p90", name), p90)
            .with_param(format!("{}_spread", name), spread);
    }

    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    fn members(param: Param, steps: &[Vec<Option<f64>>]) -> HourlySeries {
        let time = (0..steps.len())
            .map(|i| format!("2026-03-07T{:02}:00", 12 + i))
            .collect();
        let n_members = steps[0].len();

        (0..n_members).fold(HourlySeries::new(time), |s, m| {
            s.with_param(
                format!("{}_member{:02}", param.as_ref(), m + 1),
                steps.iter().map(|step| step[m]).collect(),
            )
        })
    }

    #[test]
    fn test_aggregate_ten_members() {
        let step: Vec<Option<f64>> = (1..=10).map(|v| Some(f64::from(v))).collect();
        let raw = members(Param::Cape, &[step]);

        let agg = aggregate_members(&raw, &Param::ENSEMBLE);
        assert_eq!(agg.value("cape_p10", 0), Some(2.0));
        assert_eq!(agg.value("cape_p50", 0), Some(6.0));
        assert_eq!(agg.value("cape_p90", 0), Some(10.0));
        assert_eq!(agg.value("cape_spread", 0), Some(8.0));
        assert!(agg.params.get("temperature_2m_p50").is_none());
    }

    #[test]
    fn test_aggregate_needs_three_members() {
        let raw = members(
            Param::WindSpeed10m,
            &[
                vec![Some(1.0), None, Some(3.0), None],
                vec![Some(4.0), Some(2.0), Some(9.0), None],
            ],
        );

        let agg = aggregate_members(&raw, &Param::ENSEMBLE);
        assert_eq!(agg.value("windspeed_10m_p50", 0), None);
        assert_eq!(agg.value("windspeed_10m_spread", 0), None);
        // Three values, sorted 2, 4, 9: indexes 0, 1 and min(2, 2).
        assert_eq!(agg.value("windspeed_10m_p10", 1), Some(2.0));
        assert_eq!(agg.value("windspeed_10m_p50", 1), Some(4.0));
        assert_eq!(agg.value("windspeed_10m_p90", 1), Some(9.0));
        assert_eq!(agg.value("windspeed_10m_spread", 1), Some(7.0));
        assert!(agg.validate().is_ok());
    }

    #[test]
    fn test_evaluate_in_source_order() {
        let ecmwf = HourlySeries::new(vec!["2026-03-07T13:00".to_owned()])
            .with_param("cape_p50", vec![Some(400.0)])
            .with_param("cape_spread", vec![Some(1200.0)]);
        let icon = HourlySeries::new(vec!["2026-03-07T13:00".to_owned()])
            .with_param("windspeed_10m_spread", vec![Some(5.5)])
            .with_param("cloudcover_p10", vec![Some(5.0)]);
        let empty = HourlySeries::new(vec!["2026-03-07T13:00".to_owned()])
            .with_param("cape_p10", vec![Some(5.0)]);

        let bag = SourceBag::new()
            .with_series(Model::IconEuEps, icon)
            .with_series(Model::EcmwfEns, ecmwf);

        let ens = EnsembleUncertainty::evaluate(
            &bag,
            &[Model::EcmwfEns, Model::IconEuEps],
            date(),
            13,
        );
        let order: Vec<Model> = ens.iter().map(|(m, _)| m).collect();
        assert_eq!(order, vec![Model::EcmwfEns, Model::IconEuEps]);
        assert_eq!(ens.spread(Model::EcmwfEns, Param::Cape), Some(1200.0));
        assert_eq!(ens.spread(Model::IconEuEps, Param::WindSpeed10m), Some(5.5));
        assert_eq!(ens.spread(Model::IconEuEps, Param::CloudCover), None);

        let json = serde_json::to_string(&ens).unwrap();
        assert!(json.starts_with(r#"{"ecmwf_ens":{"cape":{"p50":400.0,"spread":1200.0"#));

        let bag = SourceBag::new().with_series(Model::EcmwfEns, empty);
        let ens = EnsembleUncertainty::evaluate(&bag, &[Model::EcmwfEns], date(), 13);
        assert!(ens.is_empty());
    }

    #[test]
    fn test_evaluate_raw_members() {
        let step: Vec<Option<f64>> = (1..=10).map(|v| Some(f64::from(v) * 100.0)).collect();
        let raw = members(Param::Cape, &[vec![None; 10], step]);

        let bag = SourceBag::new().with_series(Model::EcmwfEns, raw);
        let ens = EnsembleUncertainty::evaluate(&bag, &[Model::EcmwfEns], date(), 13);
        assert_eq!(ens.spread(Model::EcmwfEns, Param::Cape), Some(800.0));
    }
}
