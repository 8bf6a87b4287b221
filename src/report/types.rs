//! Report type definitions for the rendering model.
//!
//! This module defines the rows the report and the stats command display,
//! already resolved against a dataset's columns.

use crate::types::{CellValue, Metric, NAME_ALIASES, Row, TYPE_ALIASES, find_column_position};

/// Rows shown in the report's data sample
pub const SAMPLE_SIZE: usize = 20;

/// Placeholder for a missing name or type
pub const MISSING: &str = "-";

/// Count and average metrics for one equipment type.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TypeAggregate {
    pub equipment_type: String,
    pub count: usize,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
}

/// One slice of the type distribution.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TypeShare {
    pub name: String,
    pub value: usize,
}

/// A data-sample row with every field resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    /// 1-based position in the sample
    pub index: usize,
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// Which column holds each displayed field; None when the dataset lacks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub equipment_type: Option<usize>,
    pub flowrate: Option<usize>,
    pub pressure: Option<usize>,
    pub temperature: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(columns: &[String]) -> Self {
        Self {
            name: find_column_position(columns, NAME_ALIASES),
            equipment_type: find_column_position(columns, TYPE_ALIASES),
            flowrate: find_column_position(columns, Metric::Flowrate.aliases()),
            pressure: find_column_position(columns, Metric::Pressure.aliases()),
            temperature: find_column_position(columns, Metric::Temperature.aliases()),
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<usize> {
        match metric {
            Metric::Flowrate => self.flowrate,
            Metric::Pressure => self.pressure,
            Metric::Temperature => self.temperature,
        }
    }

    /// Numeric value of a metric; missing or unparsable reads as 0
    pub fn value(&self, row: &Row, metric: Metric) -> f64 {
        self.metric(metric).and_then(|idx| row.get(idx)).and_then(CellValue::as_number).unwrap_or(0.0)
    }

    /// Text of a field, or `-` when absent or empty
    pub fn text(&self, row: &Row, column: Option<usize>) -> String {
        match column.and_then(|idx| row.get(idx)) {
            Some(cell) if !cell.is_empty() => cell.to_string(),
            _ => MISSING.to_string(),
        }
    }

    pub fn sample_row(&self, index: usize, row: &Row) -> SampleRow {
        SampleRow {
            index,
            name: self.text(row, self.name),
            equipment_type: self.text(row, self.equipment_type),
            flowrate: self.value(row, Metric::Flowrate),
            pressure: self.value(row, Metric::Pressure),
            temperature: self.value(row, Metric::Temperature),
        }
    }
}

/// The first `SAMPLE_SIZE` rows, resolved for display
pub fn sample_rows(rows: &[Row], columns: &[String]) -> Vec<SampleRow> {
    let map = ColumnMap::resolve(columns);
    rows.iter().take(SAMPLE_SIZE).enumerate().map(|(i, row)| map.sample_row(i + 1, row)).collect()
}
