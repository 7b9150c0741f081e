//! Prioritized lookup over several model series.
use super::FieldSource;
use crate::{keys::Model, series::HourlySeries};
use chrono::NaiveDate;

/// One model series that can answer lookups.
#[derive(Clone, Copy, Debug)]
pub struct Provider<'a> {
    /// The model the series belongs to.
    pub model: Model,
    /// The series itself.
    pub series: &'a HourlySeries,
}

impl<'a> Provider<'a> {
    /// Value of a parameter at an hour, with the source recorded for it.
    ///
    /// A per-slot provenance tag takes precedence over the model of the series.
    pub fn lookup(&self, key: &str, date: NaiveDate, hour: u32) -> Option<(f64, FieldSource)> {
        let idx = self.series.hour_index(date, hour)?;
        let val = self.series.value(key, idx)?;

        let src = match self.series.slot_source(idx) {
            Some(tag) => FieldSource::from_tag(tag),
            None => FieldSource::Model(self.model),
        };

        Some((val, src))
    }
}

/// An ordered list of providers; the first one with a value wins.
#[derive(Clone, Debug)]
pub struct PriorityList<'a> {
    date: NaiveDate,
    providers: Vec<Provider<'a>>,
}

impl<'a> PriorityList<'a> {
    /// Create an empty list for a date.
    pub fn new(date: NaiveDate) -> Self {
        PriorityList {
            date,
            providers: vec![],
        }
    }

    /// Append a provider at the lowest priority.
    pub fn with_provider(mut self, model: Model, series: &'a HourlySeries) -> Self {
        self.providers.push(Provider { model, series });
        self
    }

    /// Append a provider if there is one.
    pub fn with_optional(self, provider: Option<(Model, &'a HourlySeries)>) -> Self {
        match provider {
            Some((model, series)) => self.with_provider(model, series),
            None => self,
        }
    }

    /// The first value found for a parameter at an hour, and where it came from.
    pub fn resolve<K: AsRef<str>>(&self, key: K, hour: u32) -> Option<(f64, FieldSource)> {
        let key = key.as_ref();
        self.providers
            .iter()
            .find_map(|p| p.lookup(key, self.date, hour))
    }

    /// The providers in priority order.
    pub fn providers(&self) -> &[Provider<'a>] {
        &self.providers
    }

    /// Whether there is nothing to look up.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
