// src/models/mod.rs

//! Domain models for the enrichment application.
//!
//! Configuration, per-link results and run bookkeeping.

mod config;
mod link;
mod run;

// Re-export all public types
pub use config::{
    ApiConfig, CacheConfig, Config, GoogleConfig, HttpConfig, LookupConfig, SheetConfig,
};
pub use link::{LinkResult, LinkStatus, Platform, RowStatus};
pub use run::{RowRange, RunOptions, RunStats};
