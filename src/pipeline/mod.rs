//! Enrichment pipeline.
//!
//! - `columns`: plan the managed header block
//! - `enrich`: read rows, run handlers, write results back
//! - `scoring` and `report`: turn link results into cell text
//! - `rate_limit`: per-host request spacing

pub mod columns;
pub mod enrich;
pub mod rate_limit;
pub mod report;
pub mod row;
pub mod scoring;

pub use enrich::{Enricher, RowOutcome};
pub use scoring::{LeadScore, LeadScorer};
