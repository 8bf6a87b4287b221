//! Tabular view engine - search, sort, pagination and CSV export.
//!
//! This module handles:
//! - Case-insensitive substring search across all cells
//! - Stable single-column sort with numeric-aware keys
//! - Fixed-size pagination with page clamping
//! - CSV export of the filtered, sorted row set
//! - Publishing sort and page-size changes to a preference store
//!
//! Console rendering is handled by the console_format module.
//!
//! # Module Organization
//!
//! - `engine` - Pure filter/sort/paginate/toggle operations over borrowed rows
//! - `export` - CSV serialization
//! - `state` - `TableView`, the stateful view over one dataset snapshot

mod engine;
mod export;
mod state;

pub use state::{PageView, TableView};
