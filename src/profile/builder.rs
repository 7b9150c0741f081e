//! Merge the series of several model families into one hourly profile.
use super::{FieldSource, HourRow, HourlyProfile, PriorityList, Provenance};
use crate::{
    keys::{Family, Model, Param},
    location::Location,
    series::{HourlySeries, SourceBag},
    utility::round_to,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// How the general fields of the merged profile are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Each field comes from the first family with a value, in priority order.
    Layered,
    /// ICON and ECMWF are averaged where both have a value.
    Averaged,
}

impl Default for MergeMode {
    fn default() -> Self {
        MergeMode::Layered
    }
}

/// Fallback chains of the deterministic families, best member first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyChains {
    pub icon: Vec<Model>,
    pub ecmwf: Vec<Model>,
    pub gfs: Vec<Model>,
}

impl Default for FamilyChains {
    fn default() -> Self {
        use crate::keys::Model::*;

        FamilyChains {
            icon: vec![IconD2, IconEu, IconGlobal, IconSeamless],
            ecmwf: vec![EcmwfIfs025, EcmwfIfs04, EcmwfHres],
            gfs: vec![GfsSeamless, Gfs],
        }
    }
}

impl FamilyChains {
    /// The chain of a family.
    pub fn chain(&self, family: Family) -> &[Model] {
        match family {
            Family::Icon => &self.icon,
            Family::Ecmwf => &self.ecmwf,
            Family::Gfs => &self.gfs,
        }
    }

    /// Every model of every chain, in family priority order.
    pub fn all_models(&self) -> impl Iterator<Item = Model> + '_ {
        self.icon
            .iter()
            .chain(self.ecmwf.iter())
            .chain(self.gfs.iter())
            .cloned()
    }
}

/// Settings for the profile builder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub mode: MergeMode,
    pub families: FamilyChains,
}

/// The member chosen from each family for a date.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FamilySelection {
    pub icon: Option<Model>,
    pub ecmwf: Option<Model>,
    pub gfs: Option<Model>,
}

impl FamilySelection {
    /// Pick the first member of each chain whose series has data for the date.
    pub fn select(bag: &SourceBag, chains: &FamilyChains, date: NaiveDate) -> Self {
        let pick = |family: Family| {
            let found = chains.chain(family).iter().cloned().find(|&model| {
                bag.model_series(model)
                    .map(|s| s.has_data_for(date))
                    .unwrap_or(false)
            });

            match found {
                Some(model) => debug!(family = family.as_ref(), model = model.as_ref(), "selected"),
                None => debug!(family = family.as_ref(), "no member with data"),
            }

            found
        };

        FamilySelection {
            icon: pick(Family::Icon),
            ecmwf: pick(Family::Ecmwf),
            gfs: pick(Family::Gfs),
        }
    }

    /// The selected member of a family.
    pub fn get(&self, family: Family) -> Option<Model> {
        match family {
            Family::Icon => self.icon,
            Family::Ecmwf => self.ecmwf,
            Family::Gfs => self.gfs,
        }
    }

    /// Selected members in family priority order.
    pub fn best_order(&self) -> Vec<Model> {
        [self.icon, self.ecmwf, self.gfs]
            .iter()
            .filter_map(|m| *m)
            .collect()
    }
}

/// Where a profile field may be taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Sourcing {
    /// Any family, by priority.
    General,
    /// Like general, but with the GFS fallback also in averaged mode.
    GfsFallback,
    /// Only GFS reports it.
    GfsOnly,
    /// Only the convection permitting regional run reports it.
    Regional,
}

fn sourcing(param: Param) -> Sourcing {
    use crate::keys::Param::*;

    match param {
        BoundaryLayerHeight | LiftedIndex | ConvectiveInhibition => Sourcing::GfsOnly,
        Updraft => Sourcing::Regional,
        ShortwaveRadiation | Cape => Sourcing::GfsFallback,
        _ => Sourcing::General,
    }
}

/// Builds the merged profile and the per-model profiles of one location and date.
#[derive(Debug)]
pub struct ProfileBuilder<'a> {
    bag: &'a SourceBag,
    date: NaiveDate,
    location: &'a Location,
    config: &'a MergeConfig,
    hours: (u32, u32),
    selection: FamilySelection,
}

impl<'a> ProfileBuilder<'a> {
    /// Create a builder. Family members are selected immediately.
    ///
    /// # Arguments
    ///  - hours is the inclusive range of local hours of the profiles.
    pub fn new(
        bag: &'a SourceBag,
        date: NaiveDate,
        location: &'a Location,
        config: &'a MergeConfig,
        hours: (u32, u32),
    ) -> Self {
        let selection = FamilySelection::select(bag, &config.families, date);

        ProfileBuilder {
            bag,
            date,
            location,
            config,
            hours,
            selection,
        }
    }

    /// The family members in use.
    pub fn selection(&self) -> &FamilySelection {
        &self.selection
    }

    fn provider(&self, family: Family) -> Option<(Model, &'a HourlySeries)> {
        let bag: &'a SourceBag = self.bag;
        self.selection
            .get(family)
            .and_then(|m| bag.model_series(m).map(|s| (m, s)))
    }

    /// Build the merged profile.
    pub fn merged(&self) -> HourlyProfile {
        let icon = self.provider(Family::Icon);
        let ecmwf = self.provider(Family::Ecmwf);
        let gfs = self.provider(Family::Gfs);

        let lists = MergeLists {
            general: PriorityList::new(self.date)
                .with_optional(icon)
                .with_optional(ecmwf)
                .with_optional(gfs),
            icon: PriorityList::new(self.date).with_optional(icon),
            ecmwf: PriorityList::new(self.date).with_optional(ecmwf),
            gfs: PriorityList::new(self.date).with_optional(gfs),
            regional: PriorityList::new(self.date)
                .with_optional(icon.filter(|(m, _)| m.reports_updraft())),
        };

        debug!(
            location = self.location.key.as_str(),
            mode = ?self.config.mode,
            "merging profile"
        );

        let rows = (self.hours.0..=self.hours.1)
            .map(|hour| match self.config.mode {
                MergeMode::Layered => self.layered_row(&lists, hour),
                MergeMode::Averaged => self.averaged_row(&lists, hour),
            })
            .collect();

        HourlyProfile::new(rows)
    }

    fn finish_row(&self, mut row: HourRow, sources: Vec<(Param, FieldSource)>) -> HourRow {
        row.derive(self.location.elevation());
        row.provenance = Provenance::from_field_sources(&sources);
        row
    }

    fn layered_row(&self, lists: &MergeLists, hour: u32) -> HourRow {
        let mut row = HourRow::new(hour);
        let mut sources = vec![];

        for &param in Param::PROFILE.iter() {
            let list = match sourcing(param) {
                Sourcing::General | Sourcing::GfsFallback => &lists.general,
                Sourcing::GfsOnly => &lists.gfs,
                Sourcing::Regional => &lists.regional,
            };

            if let Some((val, src)) = list.resolve(param, hour) {
                row.set_raw(param, Some(val));
                sources.push((param, src));
            }
        }

        self.finish_row(row, sources)
    }

    fn averaged_row(&self, lists: &MergeLists, hour: u32) -> HourRow {
        let mut row = HourRow::new(hour);
        let mut sources = vec![];

        for &param in Param::PROFILE.iter() {
            let found = match sourcing(param) {
                Sourcing::GfsOnly => lists.gfs.resolve(param, hour),
                Sourcing::Regional => lists.regional.resolve(param, hour),
                Sourcing::General => average(
                    lists.icon.resolve(param, hour),
                    lists.ecmwf.resolve(param, hour),
                    param.averaging_decimals(),
                ),
                Sourcing::GfsFallback => average(
                    lists.icon.resolve(param, hour),
                    lists.ecmwf.resolve(param, hour),
                    param.averaging_decimals(),
                )
                .or_else(|| lists.gfs.resolve(param, hour)),
            };

            if let Some((val, src)) = found {
                row.set_raw(param, Some(val));
                sources.push((param, src));
            }
        }

        self.finish_row(row, sources)
    }

    /// Build one profile for every model of every chain that has data for the date.
    pub fn per_model(&self) -> BTreeMap<Model, HourlyProfile> {
        let mut profiles = BTreeMap::new();

        for model in self.config.families.all_models() {
            let series = match self.bag.model_series(model) {
                Some(series) if series.has_data_for(self.date) => series,
                _ => continue,
            };

            let list = PriorityList::new(self.date).with_provider(model, series);
            let rows = (self.hours.0..=self.hours.1)
                .map(|hour| {
                    let mut row = HourRow::new(hour);
                    let mut sources = vec![];
                    for &param in Param::PROFILE.iter() {
                        if let Some((val, src)) = list.resolve(param, hour) {
                            row.set_raw(param, Some(val));
                            sources.push((param, src));
                        }
                    }
                    self.finish_row(row, sources)
                })
                .collect();

            profiles.insert(model, HourlyProfile::new(rows));
        }

        profiles
    }
}

struct MergeLists<'a> {
    general: PriorityList<'a>,
    icon: PriorityList<'a>,
    ecmwf: PriorityList<'a>,
    gfs: PriorityList<'a>,
    regional: PriorityList<'a>,
}

fn average(
    a: Option<(f64, FieldSource)>,
    b: Option<(f64, FieldSource)>,
    decimals: i32,
) -> Option<(f64, FieldSource)> {
    match (a, b) {
        (Some((va, sa)), Some((vb, sb))) => {
            let src = match (sa, sb) {
                (FieldSource::Model(ma), FieldSource::Model(mb)) => FieldSource::Averaged(ma, mb),
                (sa, _) => sa,
            };
            Some((round_to((va + vb) / 2.0, decimals), src))
        }
        (a, None) => a,
        (None, b) => b,
    }
}
