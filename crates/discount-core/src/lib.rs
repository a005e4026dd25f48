//! Shared types for the clinic discount dashboard.
//!
//! Holds the raw and normalized data model, cell coercion rules, the error
//! type, display formatting helpers and CLI settings.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{DashboardError, Result};
