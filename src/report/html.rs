//! Self-contained HTML report rendering.
//!
//! The document carries its own stylesheet and no external assets, so the
//! saved file can be opened or printed anywhere.

use super::types::{SAMPLE_SIZE, SampleRow, sample_rows};
use crate::types::{Dataset, Metric, ReportMeta, StatsSnapshot};
use chrono::Datelike;
use std::fmt::Write;

const PLATFORM_NAME: &str = "ChemData";
const REPORT_TITLE: &str = "Equipment Data Analysis Report";

const STYLESHEET: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body { font-family: 'Geist', sans-serif; color: #2d3748; background: white; padding: 40px; }
    .header { border-bottom: 3px solid #1f3a5f; padding-bottom: 24px; margin-bottom: 32px; }
    .logo { display: flex; align-items: center; gap: 12px; margin-bottom: 16px; }
    .logo-icon { width: 32px; height: 32px; background: rgba(31, 58, 95, 0.1); border-radius: 8px;
      display: flex; align-items: center; justify-content: center; font-weight: bold; color: #1f3a5f; }
    .company-name { font-size: 24px; font-weight: bold; color: #1f3a5f; }
    h1 { font-size: 32px; color: #1f3a5f; margin-bottom: 8px; }
    .metadata { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; margin-bottom: 32px; }
    .metadata-item { padding: 12px; background: #f7fafc; border-radius: 8px; border-left: 3px solid #4ec5e6; }
    .metadata-label { font-size: 12px; color: #718096; font-weight: 500; text-transform: uppercase; }
    .metadata-value { font-size: 16px; font-weight: 600; color: #1f3a5f; margin-top: 4px; }
    .section { margin-bottom: 32px; }
    .section-title { font-size: 18px; font-weight: 600; color: #1f3a5f; margin-bottom: 16px;
      padding-bottom: 8px; border-bottom: 2px solid #e2e8f0; }
    .stats-grid { display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 16px; margin-bottom: 24px; }
    .stat-card { padding: 16px; background: white; border: 1px solid #e2e8f0; border-radius: 8px; text-align: center; }
    .stat-label { font-size: 12px; color: #718096; text-transform: uppercase; font-weight: 500; }
    .stat-lines { font-size: 12px; color: #718096; margin-top: 12px; }
    .stat-avg { font-weight: 600; margin-top: 8px; }
    .stat-avg.flowrate { color: #4ec5e6; }
    .stat-avg.pressure { color: #f59e0b; }
    .stat-avg.temperature { color: #ef4444; }
    table { width: 100%; border-collapse: collapse; margin-top: 16px; }
    thead { background: #f7fafc; }
    th { padding: 12px; text-align: left; font-weight: 600; color: #1f3a5f; font-size: 12px;
      text-transform: uppercase; border-bottom: 2px solid #e2e8f0; }
    td { padding: 12px; border-bottom: 1px solid #e2e8f0; }
    tr:hover { background: #f7fafc; }
    .footer { margin-top: 48px; padding-top: 24px; border-top: 1px solid #e2e8f0; text-align: center;
      color: #718096; font-size: 12px; }
    @media print {
      body { padding: 20px; }
      .page-break { page-break-after: always; }
    }
"#;

/// Format `value` with `digits` decimals, rounding exact ties away from zero
///
/// `format!` rounds an exact tie such as 0.125 to even ("0.12"); the report
/// shows "0.13". Values that only print like ties (1.005 is stored just below
/// it) are rounded the same either way.
pub fn to_fixed(value: f64, digits: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    let halves = value.abs() * 2f64.powi(digits as i32 + 1);
    // exact ties are the odd multiples of 2^-(digits + 1)
    if halves < 2f64.powi(53) && halves.fract() == 0.0 && halves % 2.0 == 1.0 {
        let scale = 10u128.pow(digits as u32);
        let rounded = (halves as u128 * 5u128.pow(digits as u32) + 1) / 2;
        let sign = if value < 0.0 { "-" } else { "" };
        return if digits == 0 {
            format!("{}{}", sign, rounded)
        } else {
            format!("{}{}.{:0width$}", sign, rounded / scale, rounded % scale, width = digits)
        };
    }
    format!("{:.*}", digits, value)
}

/// Escape text for use in HTML content and attribute values
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Report timestamp as shown in the metadata grid
pub fn format_report_date(meta: &ReportMeta) -> String {
    meta.generated_at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Render the complete report document.
///
/// The output depends only on the arguments; `meta.generated_at` supplies
/// both the report date and the footer year. An empty dataset yields zeroed
/// statistics cards and an empty sample table.
pub fn render_document(meta: &ReportMeta, dataset: &Dataset, stats: &StatsSnapshot) -> String {
    let mut html = String::with_capacity(8 * 1024);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(html, "  <title>{} Analysis Report</title>", PLATFORM_NAME);
    let _ = writeln!(html, "  <style>{}  </style>", STYLESHEET);
    html.push_str("</head>\n<body>\n");

    render_header(&mut html);
    render_metadata(&mut html, meta);
    render_statistics(&mut html, stats);
    render_sample(&mut html, &sample_rows(dataset.rows(), dataset.columns()));
    render_footer(&mut html, meta);

    html.push_str("</body>\n</html>\n");
    html
}

fn render_header(html: &mut String) {
    html.push_str("  <div class=\"header\">\n    <div class=\"logo\">\n");
    html.push_str("      <div class=\"logo-icon\">&#9883;</div>\n");
    let _ = writeln!(html, "      <div class=\"company-name\">{}</div>", PLATFORM_NAME);
    html.push_str("    </div>\n");
    let _ = writeln!(html, "    <h1>{}</h1>", REPORT_TITLE);
    html.push_str("  </div>\n\n");
}

fn render_metadata(html: &mut String, meta: &ReportMeta) {
    let items = [
        ("File Name", html_escape(&meta.filename)),
        ("Total Records", meta.total_records.to_string()),
        ("Report Date", html_escape(&format_report_date(meta))),
        ("Generated By", format!("{} Platform", PLATFORM_NAME)),
    ];

    html.push_str("  <div class=\"metadata\">\n");
    for (label, value) in items {
        html.push_str("    <div class=\"metadata-item\">\n");
        let _ = writeln!(html, "      <div class=\"metadata-label\">{}</div>", label);
        let _ = writeln!(html, "      <div class=\"metadata-value\">{}</div>", value);
        html.push_str("    </div>\n");
    }
    html.push_str("  </div>\n\n");
}

fn render_statistics(html: &mut String, stats: &StatsSnapshot) {
    html.push_str("  <div class=\"section\">\n");
    html.push_str("    <h2 class=\"section-title\">Key Statistics</h2>\n");
    html.push_str("    <div class=\"stats-grid\">\n");
    for metric in Metric::ALL {
        let summary = stats.get(metric);
        html.push_str("      <div class=\"stat-card\">\n");
        let _ = writeln!(
            html,
            "        <div class=\"stat-label\">{} ({})</div>",
            metric.label(),
            html_escape(metric.unit())
        );
        html.push_str("        <div class=\"stat-lines\">\n");
        let _ = writeln!(html, "          <div>Min: {}</div>", to_fixed(summary.min, 2));
        let _ = writeln!(html, "          <div>Max: {}</div>", to_fixed(summary.max, 2));
        let _ = writeln!(
            html,
            "          <div class=\"stat-avg {}\">Avg: {}</div>",
            metric.label().to_lowercase(),
            to_fixed(summary.avg, 2)
        );
        html.push_str("        </div>\n      </div>\n");
    }
    html.push_str("    </div>\n  </div>\n\n");
}

fn render_sample(html: &mut String, rows: &[SampleRow]) {
    html.push_str("  <div class=\"section\">\n");
    let _ = writeln!(html, "    <h2 class=\"section-title\">Data Sample (First {} Records)</h2>", SAMPLE_SIZE);
    html.push_str("    <table>\n      <thead>\n        <tr>\n");
    html.push_str("          <th>#</th>\n          <th>Equipment Name</th>\n          <th>Type</th>\n");
    for metric in Metric::ALL {
        let _ = writeln!(html, "          <th>{} ({})</th>", metric.label(), html_escape(metric.unit()));
    }
    html.push_str("        </tr>\n      </thead>\n      <tbody>\n");
    for row in rows {
        html.push_str("        <tr>\n");
        let _ = writeln!(html, "          <td>{}</td>", row.index);
        let _ = writeln!(html, "          <td>{}</td>", html_escape(&row.name));
        let _ = writeln!(html, "          <td>{}</td>", html_escape(&row.equipment_type));
        let _ = writeln!(html, "          <td>{}</td>", to_fixed(row.flowrate, 2));
        let _ = writeln!(html, "          <td>{}</td>", to_fixed(row.pressure, 2));
        let _ = writeln!(html, "          <td>{}</td>", to_fixed(row.temperature, 2));
        html.push_str("        </tr>\n");
    }
    html.push_str("      </tbody>\n    </table>\n  </div>\n\n");
}

fn render_footer(html: &mut String, meta: &ReportMeta) {
    html.push_str("  <div class=\"footer\">\n");
    let _ = writeln!(html, "    <p>This report was generated by {} Equipment Analysis Platform</p>", PLATFORM_NAME);
    let _ = writeln!(
        html,
        "    <p>&copy; {} {}. All rights reserved.</p>",
        meta.generated_at.year(),
        PLATFORM_NAME
    );
    html.push_str("  </div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::compute_stats;
    use crate::types::CellValue;
    use chrono::DateTime;

    fn meta(filename: &str, total: usize, ts: &str) -> ReportMeta {
        ReportMeta {
            filename: filename.to_string(),
            total_records: total,
            generated_at: DateTime::parse_from_rfc3339(ts).unwrap(),
        }
    }

    fn plant() -> Dataset {
        let columns: Vec<String> = ["Equipment Name", "Type", "Flowrate", "Pressure", "Temperature"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<CellValue>> = vec![
            vec!["Pump-1", "Pump", "120.5", "5.2", "110"],
            vec!["Valve-1", "Valve", "60", "4.1", "105.25"],
        ]
        .into_iter()
        .map(|r| r.into_iter().map(CellValue::from).collect())
        .collect();
        Dataset::from_rows("plant.csv", columns, rows)
    }

    #[test]
    fn test_render_contains_sections() {
        let ds = plant();
        let stats = compute_stats(ds.rows(), ds.columns());
        let html = render_document(&meta("plant.csv", 2, "2024-03-05T14:07:09+00:00"), &ds, &stats);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Equipment Data Analysis Report</h1>"));
        assert!(html.contains("<div class=\"metadata-value\">plant.csv</div>"));
        assert!(html.contains("<div class=\"metadata-value\">2</div>"));
        assert!(html.contains("<div class=\"metadata-value\">3/5/2024, 2:07:09 PM</div>"));
        assert!(html.contains("ChemData Platform"));
        assert!(html.contains("Flowrate (L/min)"));
        assert!(html.contains("Temperature (°C)"));
        assert!(html.contains("Min: 60.00"));
        assert!(html.contains("Max: 120.50"));
        assert!(html.contains("Avg: 90.25"));
        // (110 + 105.25) / 2 is an exact tie
        assert!(html.contains("Avg: 107.63"));
        assert!(html.contains("<td>Pump-1</td>"));
        assert!(html.contains("<td>105.25</td>"));
        assert!(html.contains("&copy; 2024 ChemData. All rights reserved."));
    }

    #[test]
    fn test_to_fixed_rounds_ties_away_from_zero() {
        assert_eq!(to_fixed(0.125, 2), "0.13");
        assert_eq!(to_fixed(-0.125, 2), "-0.13");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(0.25, 1), "0.3");
        assert_eq!(to_fixed(66.666, 1), "66.7");
        assert_eq!(to_fixed(1.005, 2), "1.00");
        assert_eq!(to_fixed(120.0, 2), "120.00");
        assert_eq!(to_fixed(-0.0, 2), "0.00");
    }

    #[test]
    fn test_render_empty_dataset() {
        let ds = Dataset::empty("empty.csv");
        let stats = compute_stats(ds.rows(), ds.columns());
        let html = render_document(&meta("empty.csv", 0, "2024-01-01T00:00:00+00:00"), &ds, &stats);
        assert!(html.contains("Min: 0.00"));
        assert!(html.contains("Avg: 0.00"));
        assert!(!html.contains("<td>"));
        assert!(!html.contains("NaN"));
        assert!(!html.contains(": inf"));
    }

    #[test]
    fn test_render_escapes_text() {
        let columns = vec!["name".to_string(), "type".to_string()];
        let ds = Dataset::from_rows(
            "x.csv",
            columns,
            vec![vec![CellValue::from("<script>alert(1)</script>"), CellValue::from("A&B")]],
        );
        let stats = compute_stats(ds.rows(), ds.columns());
        let html = render_document(&meta("<bad>.csv", 1, "2024-01-01T00:00:00+00:00"), &ds, &stats);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<td>A&amp;B</td>"));
        assert!(html.contains("&lt;bad&gt;.csv"));
    }

    #[test]
    fn test_render_is_deterministic_apart_from_timestamp() {
        let ds = plant();
        let stats = compute_stats(ds.rows(), ds.columns());
        let a = render_document(&meta("plant.csv", 2, "2024-03-05T14:07:09+00:00"), &ds, &stats);
        let b = render_document(&meta("plant.csv", 2, "2024-03-05T14:07:09+00:00"), &ds, &stats);
        assert_eq!(a, b);

        let c = render_document(&meta("plant.csv", 2, "2025-07-01T09:00:00+00:00"), &ds, &stats);
        assert_ne!(a, c);
        let normalize = |s: &str| {
            s.replace("3/5/2024, 2:07:09 PM", "DATE")
                .replace("7/1/2025, 9:00:00 AM", "DATE")
                .replace("&copy; 2024", "&copy; YEAR")
                .replace("&copy; 2025", "&copy; YEAR")
        };
        assert_eq!(normalize(&a), normalize(&c));
    }

    #[test]
    fn test_render_missing_columns_fall_back() {
        let ds = Dataset::from_rows("x.csv", vec!["id".to_string()], vec![vec![CellValue::from("7")]]);
        let stats = compute_stats(ds.rows(), ds.columns());
        let html = render_document(&meta("x.csv", 1, "2024-01-01T00:00:00+00:00"), &ds, &stats);
        assert!(html.contains("<td>-</td>"));
        assert!(html.contains("<td>0.00</td>"));
    }
}
