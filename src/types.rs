/// Core data structures for equipment datasets
///
/// This module defines the primary data structures used throughout chemdata
/// for representing rows, view preferences, statistics and backend payloads.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::warn;

/// Items shown per page when nothing has been persisted yet
pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// A single displayed value: text straight from a CSV file, or a number from the backend
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// An empty text cell, used for fields a row does not carry
    pub fn empty() -> Self {
        CellValue::Text(String::new())
    }

    /// Numeric reading of the cell, if it has one
    ///
    /// Text cells are read with a leading-prefix parse, so "8.2 bar" reads as 8.2.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Number(_) => None,
            CellValue::Text(s) => parse_number(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Parse the longest numeric prefix of `s` (after leading whitespace).
///
/// Accepts an optional sign, digits with an optional fraction, an optional
/// exponent, and `Infinity`. Returns None when no digits lead the string.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    if t[end..].starts_with("Infinity") {
        return Some(if t.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    t[..end].parse::<f64>().ok()
}

/// One record, with cells aligned to the owning dataset's column list
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Row {
    cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at a column index; None when the index is outside the row
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }
}

/// A loaded row set with a validated column schema
///
/// The column list is fixed when the dataset is built. Rows are shared
/// behind an `Arc` and never edited; a new upload builds a new `Dataset`.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    rows: Arc<[Row]>,
}

impl Dataset {
    /// A dataset with no columns and no rows
    pub fn empty(name: impl Into<String>) -> Self {
        Self { name: name.into(), columns: Vec::new(), rows: Arc::from(Vec::new()) }
    }

    /// Build a dataset from keyed records.
    ///
    /// The column set comes from the keys of the first record. Later records
    /// are normalized against it: missing keys become empty cells and extra
    /// keys are dropped.
    pub fn from_records(name: impl Into<String>, records: Vec<Vec<(String, CellValue)>>) -> Self {
        let name = name.into();
        let Some(first) = records.first() else {
            return Self::empty(name);
        };

        let mut columns: Vec<String> = Vec::with_capacity(first.len());
        for (key, _) in first {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }

        let total = records.len();
        let mut diverged = 0;
        let mut rows = Vec::with_capacity(total);

        for record in records {
            let same_shape = record.len() == columns.len() && record.iter().all(|(k, _)| columns.contains(k));
            if !same_shape {
                diverged += 1;
            }

            let mut by_key: HashMap<String, CellValue> = HashMap::with_capacity(record.len());
            for (key, value) in record {
                by_key.entry(key).or_insert(value);
            }
            let cells = columns.iter().map(|c| by_key.remove(c).unwrap_or_else(CellValue::empty)).collect();
            rows.push(Row::new(cells));
        }

        if diverged > 0 {
            warn!("{} of {} rows in '{}' did not match the header columns and were normalized", diverged, total, name);
        }

        Self { name, columns, rows: Arc::from(rows) }
    }

    /// Build a dataset whose rows already match `columns`
    ///
    /// Short rows are padded with empty cells and long rows are cut.
    pub fn from_rows(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows: Vec<Row> = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize_with(width, CellValue::empty);
                Row::new(cells)
            })
            .collect();
        Self { name: name.into(), columns, rows: Arc::from(rows) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name, see `column_position`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_position(&self.columns, name)
    }
}

/// Index of a column by name: exact match first, then a normalized
/// match ignoring case, underscores and repeated spaces
pub fn column_position(columns: &[String], name: &str) -> Option<usize> {
    if let Some(idx) = columns.iter().position(|c| c == name) {
        return Some(idx);
    }
    let wanted = normalize_column_name(name);
    columns.iter().position(|c| normalize_column_name(c) == wanted)
}

/// First column matching any of the aliases, in alias order
pub fn find_column_position(columns: &[String], aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| column_position(columns, alias))
}

/// Lowercase a column name and fold `_`/`-` and runs of whitespace into single spaces
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sort direction for the table view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// Marker shown next to the sorted column header
    pub fn arrow(&self) -> &'static str {
        match self {
            SortOrder::Asc => "↑",
            SortOrder::Desc => "↓",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(format!("Unknown sort order '{}' (expected asc or desc)", other)),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display settings for the table view
///
/// `search_term` and `current_page` are ephemeral; the sort and page size
/// are the durable part pushed to a preference store.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewPreferences {
    pub search_term: String,
    pub sort_column: Option<String>,
    pub sort_order: SortOrder,
    pub items_per_page: usize,
    pub current_page: usize,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            sort_column: None,
            sort_order: SortOrder::Asc,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            current_page: 1,
        }
    }
}

impl ViewPreferences {
    /// Start from persisted preferences, or defaults when there are none
    pub fn from_stored(stored: Option<&StoredPreferences>) -> Self {
        let mut prefs = Self::default();
        if let Some(stored) = stored {
            if !stored.default_sort_column.is_empty() {
                prefs.sort_column = Some(stored.default_sort_column.clone());
            }
            prefs.sort_order = stored.default_sort_order;
            if stored.items_per_page > 0 {
                prefs.items_per_page = stored.items_per_page;
            }
        }
        prefs
    }
}

fn default_items_per_page() -> usize {
    DEFAULT_ITEMS_PER_PAGE
}

/// The durable subset of view preferences, named as the backend names them
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredPreferences {
    #[serde(default)]
    pub default_sort_column: String,
    #[serde(default)]
    pub default_sort_order: SortOrder,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
}

impl Default for StoredPreferences {
    fn default() -> Self {
        Self {
            default_sort_column: String::new(),
            default_sort_order: SortOrder::Asc,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl StoredPreferences {
    /// Merge a partial update into these preferences
    pub fn apply(&mut self, update: &PreferenceUpdate) {
        if let Some(ref column) = update.default_sort_column {
            self.default_sort_column = column.clone();
        }
        if let Some(order) = update.default_sort_order {
            self.default_sort_order = order;
        }
        if let Some(n) = update.items_per_page {
            self.items_per_page = n;
        }
    }
}

/// A partial preference change; only the set fields are sent
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PreferenceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_sort_order: Option<SortOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<usize>,
}

impl PreferenceUpdate {
    pub fn sort(column: &str, order: SortOrder) -> Self {
        Self { default_sort_column: Some(column.to_string()), default_sort_order: Some(order), items_per_page: None }
    }

    pub fn items_per_page(n: usize) -> Self {
        Self { items_per_page: Some(n), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.default_sort_column.is_none() && self.default_sort_order.is_none() && self.items_per_page.is_none()
    }
}

/// The numeric measurements every equipment row carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Flowrate,
    Pressure,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Flowrate, Metric::Pressure, Metric::Temperature];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Flowrate => "Flowrate",
            Metric::Pressure => "Pressure",
            Metric::Temperature => "Temperature",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Flowrate => "L/min",
            Metric::Pressure => "bar",
            Metric::Temperature => "°C",
        }
    }

    /// Column names this metric is read from
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Metric::Flowrate => &["flowrate", "flow rate", "flow"],
            Metric::Pressure => &["pressure"],
            Metric::Temperature => &["temperature", "temp"],
        }
    }
}

/// Column aliases for the equipment name
pub const NAME_ALIASES: &[&str] = &["equipment name", "name"];

/// Column aliases for the equipment type
pub const TYPE_ALIASES: &[&str] = &["type", "equipment type"];

/// Min/max/avg over one metric
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Number of rows the summary was computed from (0 = no data)
    pub samples: usize,
}

/// One summary per metric
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct StatsSnapshot {
    pub flowrate: MetricSummary,
    pub pressure: MetricSummary,
    pub temperature: MetricSummary,
}

impl StatsSnapshot {
    pub fn get(&self, metric: Metric) -> &MetricSummary {
        match metric {
            Metric::Flowrate => &self.flowrate,
            Metric::Pressure => &self.pressure,
            Metric::Temperature => &self.temperature,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut MetricSummary {
        match metric {
            Metric::Flowrate => &mut self.flowrate,
            Metric::Pressure => &mut self.pressure,
            Metric::Temperature => &mut self.temperature,
        }
    }
}

/// A labelled min/max/avg card
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AggregateStat {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub unit: String,
}

/// Snapshot of what a report describes
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMeta {
    pub filename: String,
    pub total_records: usize,
    pub generated_at: chrono::DateTime<chrono::FixedOffset>,
}

//
// Backend payloads
//

/// avg/min/max for one metric of one equipment type
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct MetricRange {
    #[serde(default)]
    pub avg: f64,
    #[serde(default)]
    pub min: f64,
    #[serde(default)]
    pub max: f64,
}

/// Backend statistics for one equipment type
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct TypeStatistics {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub flowrate: MetricRange,
    #[serde(default)]
    pub pressure: MetricRange,
    #[serde(default)]
    pub temperature: MetricRange,
}

impl TypeStatistics {
    pub fn metric(&self, metric: Metric) -> &MetricRange {
        match metric {
            Metric::Flowrate => &self.flowrate,
            Metric::Pressure => &self.pressure,
            Metric::Temperature => &self.temperature,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct OverallAverages {
    #[serde(default)]
    pub flowrate: f64,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub temperature: f64,
}

/// Statistics the backend computes for an uploaded dataset
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct DatasetStatistics {
    #[serde(default)]
    pub total_equipment_count: usize,
    #[serde(default)]
    pub by_type: BTreeMap<String, TypeStatistics>,
    #[serde(default)]
    pub overall_averages: OverallAverages,
}

/// An uploaded dataset as listed by the backend
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DatasetInfo {
    pub id: u64,
    pub file_name: String,
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default)]
    pub row_count: Option<usize>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub statistics: Option<DatasetStatistics>,
    #[serde(default)]
    pub uploaded_by_username: String,
}

impl DatasetInfo {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// Response of the dataset listing endpoint
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct DatasetList {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub datasets: Vec<DatasetInfo>,
}

/// Response of the statistics endpoint: every completed dataset, newest first
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct StatisticsOverview {
    #[serde(default)]
    pub total_datasets: usize,
    #[serde(default)]
    pub total_equipment_count: usize,
    #[serde(default)]
    pub datasets: Vec<DatasetInfo>,
}

impl StatisticsOverview {
    /// The newest completed dataset that carries statistics
    pub fn latest(&self) -> Option<&DatasetInfo> {
        self.datasets.iter().find(|d| d.is_completed() && d.statistics.is_some())
    }
}

/// The logged-in user
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Profile with upload statistics
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub upload_count: usize,
    #[serde(default)]
    pub preferences: Option<StoredPreferences>,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
