/// Row sources for the table view
///
/// Equipment rows come either from a local CSV file or from the per-type
/// statistics the backend computed for an upload.
use crate::types::{CellValue, Dataset, DatasetStatistics, Metric};
use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns of the flattened per-type statistics projection
pub const STATISTICS_COLUMNS: [&str; 5] = ["equipment_name", "type", "flowrate", "pressure", "temperature"];

/// Load a CSV file with a header row into a dataset
///
/// Every cell is kept as text; numeric reads happen where they are needed.
pub fn load_csv(path: &Path) -> Result<Dataset, String> {
    debug!("loading CSV from {}", path.display());
    let file = File::open(path).map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("data.csv").to_string();
    from_csv_reader(name, file)
}

/// Parse CSV text from any reader
///
/// The header row defines the columns. Rows with a different field count are
/// normalized against it (missing fields empty, extra fields dropped).
pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Dataset, String> {
    let name = name.into();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| format!("Failed to read CSV header of {}: {}", name, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(format!("{} has no header row", name));
    }

    let mut rows = Vec::new();
    let mut ragged = 0usize;
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("Failed to parse {} at record {}: {}", name, line + 1, e))?;
        if record.len() != headers.len() {
            ragged += 1;
        }
        rows.push(record.iter().map(CellValue::from).collect::<Vec<_>>());
    }

    if ragged > 0 {
        warn!("{} of {} rows in '{}' did not match the header columns and were normalized", ragged, rows.len(), name);
    }

    debug!("loaded {} rows with {} columns from {}", rows.len(), headers.len(), name);
    Ok(Dataset::from_rows(name, headers, rows))
}

/// Flatten backend statistics into one "<type> (Average)" record per equipment type
///
/// With no types there are no records, and so no columns either.
pub fn rows_from_statistics(name: impl Into<String>, stats: &DatasetStatistics) -> Dataset {
    let [name_key, type_key, metric_keys @ ..] = STATISTICS_COLUMNS;
    let records = stats
        .by_type
        .iter()
        .map(|(equipment_type, type_stats)| {
            let mut record = vec![
                (name_key.to_string(), CellValue::Text(format!("{} (Average)", equipment_type))),
                (type_key.to_string(), CellValue::Text(equipment_type.clone())),
            ];
            record.extend(
                metric_keys
                    .iter()
                    .zip(Metric::ALL)
                    .map(|(key, m)| (key.to_string(), CellValue::Number(type_stats.metric(m).avg))),
            );
            record
        })
        .collect();
    Dataset::from_records(name, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricRange, TypeStatistics};
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn test_from_csv_reader_reads_header_and_rows() {
        let csv = "Equipment Name,Type,Flowrate,Pressure,Temperature\nPump-1,Pump,120.5,5.2,110\nValve-1,Valve,60,4.1,105\n";
        let ds = from_csv_reader("sample.csv", csv.as_bytes()).unwrap();
        assert_eq!(ds.name(), "sample.csv");
        assert_eq!(ds.columns().len(), 5);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[1].get(0), Some(&CellValue::from("Valve-1")));
        assert_eq!(ds.rows()[0].get(2).and_then(|c| c.as_number()), Some(120.5));
    }

    #[test]
    fn test_from_csv_reader_handles_quoted_fields() {
        let csv = "name,note\n\"Pump, main\",\"says \"\"hi\"\"\"\n";
        let ds = from_csv_reader("q.csv", csv.as_bytes()).unwrap();
        assert_eq!(ds.rows()[0].get(0), Some(&CellValue::from("Pump, main")));
        assert_eq!(ds.rows()[0].get(1), Some(&CellValue::from("says \"hi\"")));
    }

    #[test]
    fn test_from_csv_reader_normalizes_ragged_rows() {
        let csv = "a,b,c\n1,2\n1,2,3,4\n";
        let ds = from_csv_reader("r.csv", csv.as_bytes()).unwrap();
        assert_eq!(ds.rows()[0].cells(), &[CellValue::from("1"), CellValue::from("2"), CellValue::empty()]);
        assert_eq!(ds.rows()[1].cells().len(), 3);
    }

    #[test]
    fn test_from_csv_reader_header_only() {
        let ds = from_csv_reader("h.csv", "a,b\n".as_bytes()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.columns().len(), 2);
    }

    #[test]
    fn test_from_csv_reader_rejects_empty_input() {
        assert!(from_csv_reader("e.csv", "".as_bytes()).is_err());
    }

    #[test]
    fn test_load_csv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plant.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "name,flow").unwrap();
        writeln!(f, "P1,10").unwrap();
        drop(f);

        let ds = load_csv(&path).unwrap();
        assert_eq!(ds.name(), "plant.csv");
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv(Path::new("/nonexistent/plant.csv")).unwrap_err();
        assert!(err.contains("Failed to open"));
    }

    #[test]
    fn test_rows_from_statistics() {
        let range = |avg| MetricRange { avg, min: avg, max: avg };
        let mut by_type = BTreeMap::new();
        by_type.insert(
            "Pump".to_string(),
            TypeStatistics { count: 2, flowrate: range(100.0), pressure: range(5.0), temperature: range(110.0) },
        );
        by_type.insert(
            "Valve".to_string(),
            TypeStatistics { count: 1, flowrate: range(60.0), pressure: range(4.0), temperature: range(100.0) },
        );
        let stats = DatasetStatistics { total_equipment_count: 3, by_type, ..Default::default() };

        let ds = rows_from_statistics("latest", &stats);
        assert_eq!(ds.columns(), STATISTICS_COLUMNS.map(String::from).as_slice());
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows()[0].get(0), Some(&CellValue::from("Pump (Average)")));
        assert_eq!(ds.rows()[0].get(1), Some(&CellValue::from("Pump")));
        assert_eq!(ds.rows()[1].get(2), Some(&CellValue::Number(60.0)));
        assert_eq!(ds.rows()[1].get(4), Some(&CellValue::Number(100.0)));
    }

    #[test]
    fn test_rows_from_statistics_without_types() {
        let ds = rows_from_statistics("pending.csv", &DatasetStatistics::default());
        assert!(ds.is_empty());
        assert!(ds.columns().is_empty());
    }
}
