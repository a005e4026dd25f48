//! Data layer for the clinic discount dashboard.
//!
//! Reads insurer bundles from disk, reconciles their headers onto the
//! canonical schema, loads normalized records, and runs the filter and
//! aggregation pipeline behind the dashboard.

pub mod aggregator;
pub mod analysis;
pub mod filter;
pub mod loader;
pub mod reader;
pub mod reconciler;

pub use discount_core as core;
