//! The active dashboard dataset.
//!
//! A [`DashboardSession`] owns a [`DataManager`] and the outcome of the most
//! recent successful load, and answers the questions the dashboard asks of
//! it: which insurers exist, what filter options one of them offers, and what
//! a given selection looks like.

use std::sync::Arc;

use discount_core::error::Result;
use discount_core::models::NormalizedCollection;
use discount_data::aggregator::BandOrdering;
use discount_data::analysis::{analyze_selection, DashboardView};
use discount_data::filter::{FilterOptions, FilterSelection};
use discount_data::loader::LoadOutcome;

use crate::data_manager::{BundleSource, DataManager};

pub struct DashboardSession {
    manager: DataManager,
    source: BundleSource,
    outcome: Arc<LoadOutcome>,
}

impl DashboardSession {
    /// Load `source` with a fresh [`DataManager`].
    pub fn open(source: BundleSource) -> Result<Self> {
        Self::with_manager(DataManager::new(), source)
    }

    /// Load `source` through an existing manager, reusing its cache.
    pub fn with_manager(mut manager: DataManager, source: BundleSource) -> Result<Self> {
        let outcome = manager.get_or_load(&source)?;
        tracing::info!(
            source = source.kind(),
            path = %source.path().display(),
            records = outcome.collection.len(),
            "dashboard session opened"
        );
        Ok(Self {
            manager,
            source,
            outcome,
        })
    }

    /// Switch to another bundle. On failure the current dataset stays active.
    pub fn switch_source(&mut self, source: BundleSource) -> Result<()> {
        let outcome = self.manager.get_or_load(&source)?;
        self.source = source;
        self.outcome = outcome;
        Ok(())
    }

    pub fn source(&self) -> &BundleSource {
        &self.source
    }

    pub fn outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    pub fn collection(&self) -> &NormalizedCollection {
        &self.outcome.collection
    }

    pub fn manager(&self) -> &DataManager {
        &self.manager
    }

    /// Distinct insurers, sorted.
    pub fn insurers(&self) -> Vec<String> {
        self.outcome.collection.insurers()
    }

    /// The insurer the dashboard opens on: first in sorted order.
    pub fn default_insurer(&self) -> Option<String> {
        self.insurers().into_iter().next()
    }

    pub fn filter_options(&self, insurer: &str) -> FilterOptions {
        FilterOptions::for_insurer(&self.outcome.collection, insurer)
    }

    /// Every option ticked for `insurer`.
    pub fn default_selection(&self, insurer: &str) -> FilterSelection {
        FilterSelection::all_for(insurer, &self.filter_options(insurer))
    }

    pub fn view(&self, selection: &FilterSelection, ordering: BandOrdering) -> DashboardView {
        analyze_selection(&self.outcome.collection, selection, ordering)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
