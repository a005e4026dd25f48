//! Insurer and categorical filtering over a normalized collection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use discount_core::models::{DiscountRecord, NormalizedCollection};

// ── FilterSelection ───────────────────────────────────────────────────────────

/// User-selected filter criteria.
///
/// An empty set means "no restriction" on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub insurer: String,
    #[serde(default)]
    pub chi_locations: BTreeSet<String>,
    #[serde(default)]
    pub service_types: BTreeSet<String>,
}

impl FilterSelection {
    /// Select `insurer` with no categorical restriction.
    pub fn for_insurer(insurer: impl Into<String>) -> Self {
        Self {
            insurer: insurer.into(),
            ..Default::default()
        }
    }

    /// Select `insurer` with every available option ticked, which is how the
    /// dashboard opens before the user narrows anything.
    pub fn all_for(insurer: impl Into<String>, options: &FilterOptions) -> Self {
        Self {
            insurer: insurer.into(),
            chi_locations: options.chi_locations.iter().cloned().collect(),
            service_types: options.service_types.iter().cloned().collect(),
        }
    }

    pub fn with_chi_locations<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chi_locations = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_service_types<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_types = values.into_iter().map(Into::into).collect();
        self
    }

    /// `true` when `record` satisfies every criterion.
    pub fn matches(&self, record: &DiscountRecord) -> bool {
        record.insurer == self.insurer
            && accepts(&self.chi_locations, record.chi_location.as_deref())
            && accepts(&self.service_types, record.service_type.as_deref())
    }
}

/// Empty set accepts anything; otherwise the value must be present and listed.
fn accepts(accepted: &BTreeSet<String>, value: Option<&str>) -> bool {
    if accepted.is_empty() {
        return true;
    }
    value.is_some_and(|v| accepted.contains(v))
}

// ── FilterOptions ─────────────────────────────────────────────────────────────

/// Distinct values offered for multi-select filtering, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub chi_locations: Vec<String>,
    pub service_types: Vec<String>,
}

impl FilterOptions {
    /// Distinct non-null categorical values among `insurer`'s records.
    pub fn for_insurer(collection: &NormalizedCollection, insurer: &str) -> Self {
        let mut chi = BTreeSet::new();
        let mut service = BTreeSet::new();
        for record in collection.iter().filter(|r| r.insurer == insurer) {
            if let Some(v) = &record.chi_location {
                chi.insert(v.clone());
            }
            if let Some(v) = &record.service_type {
                service.insert(v.clone());
            }
        }
        Self {
            chi_locations: chi.into_iter().collect(),
            service_types: service.into_iter().collect(),
        }
    }
}

// ── FilterEngine ──────────────────────────────────────────────────────────────

/// Stateless collection filter.
pub struct FilterEngine;

impl FilterEngine {
    /// Records of `collection` matching `selection`, as a new collection.
    ///
    /// The result may be empty; that is a valid outcome the caller reports
    /// as "no records match".
    pub fn apply(collection: &NormalizedCollection, selection: &FilterSelection) -> NormalizedCollection {
        collection
            .iter()
            .filter(|r| selection.matches(r))
            .cloned()
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
