//! Runtime layer for the clinic discount dashboard.
//!
//! Owns the load cache and the active dataset, and answers the dashboard's
//! selection queries against it.

pub mod data_manager;
pub mod session;

pub use discount_core as core;
pub use discount_data as data;
