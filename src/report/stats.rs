//! Statistics and summary generation for equipment rows.
//!
//! This module handles aggregating rows into per-metric summaries, the
//! per-type averages and distribution the dashboard charts show, and the
//! same summaries derived from backend-computed statistics.

use super::types::{ColumnMap, TypeAggregate, TypeShare};
use crate::types::{AggregateStat, DatasetStatistics, Metric, MetricSummary, Row, StatsSnapshot};
use std::collections::HashMap;

/// Calculate min/max/avg of each metric over `rows`.
///
/// Missing or unparsable values count as 0. With no rows every summary is
/// all zeros and `samples` is 0.
pub fn compute_stats(rows: &[Row], columns: &[String]) -> StatsSnapshot {
    let map = ColumnMap::resolve(columns);
    let mut snapshot = StatsSnapshot::default();
    if rows.is_empty() {
        return snapshot;
    }

    for metric in Metric::ALL {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for row in rows {
            let v = map.value(row, metric);
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        *snapshot.get_mut(metric) = MetricSummary { min, max, avg: sum / rows.len() as f64, samples: rows.len() };
    }
    snapshot
}

impl StatsSnapshot {
    /// Summaries from backend statistics.
    ///
    /// Min and max span every equipment type; the average is the backend's
    /// overall average.
    pub fn from_backend(stats: &DatasetStatistics) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::default();
        if stats.by_type.is_empty() {
            return snapshot;
        }

        let samples = match stats.total_equipment_count {
            0 => stats.by_type.values().map(|t| t.count).sum(),
            n => n,
        };
        for metric in Metric::ALL {
            let ranges = stats.by_type.values().map(|t| t.metric(metric));
            let min = ranges.clone().map(|r| r.min).fold(f64::INFINITY, f64::min);
            let max = ranges.map(|r| r.max).fold(f64::NEG_INFINITY, f64::max);
            let avg = match metric {
                Metric::Flowrate => stats.overall_averages.flowrate,
                Metric::Pressure => stats.overall_averages.pressure,
                Metric::Temperature => stats.overall_averages.temperature,
            };
            *snapshot.get_mut(metric) = MetricSummary { min, max, avg, samples };
        }
        snapshot
    }
}

/// Labelled cards, one per metric, in display order.
pub fn aggregate_stats(snapshot: &StatsSnapshot) -> Vec<AggregateStat> {
    Metric::ALL
        .iter()
        .map(|metric| {
            let summary = snapshot.get(*metric);
            AggregateStat {
                label: metric.label().to_string(),
                min: summary.min,
                max: summary.max,
                avg: summary.avg,
                unit: metric.unit().to_string(),
            }
        })
        .collect()
}

/// Count and average metrics per equipment type, in first-appearance order.
pub fn aggregate_by_type(rows: &[Row], columns: &[String]) -> Vec<TypeAggregate> {
    let map = ColumnMap::resolve(columns);
    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, (usize, [f64; 3])> = HashMap::new();

    for row in rows {
        let equipment_type = map.text(row, map.equipment_type);
        let entry = sums.entry(equipment_type.clone()).or_insert_with(|| {
            order.push(equipment_type);
            (0, [0.0; 3])
        });
        entry.0 += 1;
        for (i, metric) in Metric::ALL.iter().enumerate() {
            entry.1[i] += map.value(row, *metric);
        }
    }

    order
        .into_iter()
        .filter_map(|equipment_type| {
            let (count, totals) = sums.remove(&equipment_type)?;
            let n = count as f64;
            Some(TypeAggregate {
                equipment_type,
                count,
                avg_flowrate: totals[0] / n,
                avg_pressure: totals[1] / n,
                avg_temperature: totals[2] / n,
            })
        })
        .collect()
}

/// Per-type averages the backend computed, in type-name order.
pub fn aggregate_from_backend(stats: &DatasetStatistics) -> Vec<TypeAggregate> {
    stats
        .by_type
        .iter()
        .map(|(equipment_type, t)| TypeAggregate {
            equipment_type: equipment_type.clone(),
            count: t.count,
            avg_flowrate: t.flowrate.avg,
            avg_pressure: t.pressure.avg,
            avg_temperature: t.temperature.avg,
        })
        .collect()
}

/// Row counts per type, taken from the aggregates
pub fn type_shares(aggregates: &[TypeAggregate]) -> Vec<TypeShare> {
    aggregates.iter().map(|agg| TypeShare { name: agg.equipment_type.clone(), value: agg.count }).collect()
}
