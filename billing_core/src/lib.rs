#![forbid(unsafe_code)]

//! Core domain model and business logic for clinic billing.
//!
//! This crate provides:
//! - The billing code catalog (ministry fee schedule)
//! - The appointment billing store with full-table persistence
//! - Monthly submission file generation
//! - Reconciliation of ministry response files
//! - Collaborator traits (tables, scheduling, demographics)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod table;
pub mod services;
pub mod store;
pub mod submission;
pub mod reconcile;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::BillingCatalog;
pub use config::Config;
pub use table::{CsvTableProvider, TableProvider};
pub use services::{
    DemographicsService, SchedulingService, TableDemographicsService, TableSchedulingService,
};
pub use store::ApptBillingStore;
pub use submission::generate_monthly_file;
pub use reconcile::{is_code_valid, ReconciliationEngine, ReconciliationReport};
