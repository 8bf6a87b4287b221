//! Report generation module - Statistics and the HTML report.
//!
//! This module handles:
//! - Calculating per-metric summaries from rows or backend statistics
//! - Per-type averages and the type distribution
//! - Rendering the self-contained HTML report
//! - Saving the report as a download or printing it
//!
//! Console rendering of statistics is handled by the console_format module.
//!
//! # Module Organization
//!
//! - `types` - Rendering types (TypeAggregate, TypeShare, SampleRow, ColumnMap)
//! - `stats` - Summary statistics and per-type aggregation
//! - `html` - HTML document rendering
//! - `export` - Download and print delivery

mod export;
mod html;
mod stats;
mod types;

// Re-export types
pub use types::{TypeAggregate, TypeShare};

// Re-export stats functions
pub use stats::{aggregate_by_type, aggregate_from_backend, aggregate_stats, compute_stats, type_shares};

// Re-export rendering
pub use html::{render_document, to_fixed};

// Re-export delivery functions
pub use export::{print_document, trigger_download};
