//! rating-core: plugin-based insurance rating engine.
//!
//! `engine::RatingEngine` is the entry point. Product families plug in
//! through `plugin::ProductPlugin`; every attempt is recorded in the
//! append-only ledger behind `store::RatingStore`.

pub mod clock;
pub mod config;
pub mod disability_income_plugin;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod input;
pub mod long_term_care_plugin;
pub mod output;
pub mod plugin;
pub mod pricing;
pub mod rate_table;
pub mod run;
pub mod scenario;
pub mod store;
pub mod types;
