//! CSV export of the current view.

use crate::save::{FileSaver, derived_filename};
use crate::types::Row;
use log::info;
use std::io;
use std::path::PathBuf;

pub const EXPORT_MIME: &str = "text/csv";

/// Quote one field, doubling embedded quotes
fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Header names are written bare unless they would split or break the line
fn header_field(name: &str) -> String {
    if name.contains([',', '"', '\n', '\r']) { quote_field(name) } else { name.to_string() }
}

/// Serialize rows as CSV text.
///
/// The header line is the comma-joined column names, quoted only where a name
/// holds a comma, a quote or a line break. Each data line quotes
/// every field; cells a row lacks are written as `""`. Lines are joined with
/// `\n` and there is no trailing newline.
pub fn export_csv(rows: &[&Row], columns: &[String]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(columns.iter().map(|c| header_field(c)).collect::<Vec<_>>().join(","));
    for row in rows {
        let fields: Vec<String> = (0..columns.len())
            .map(|idx| quote_field(&row.get(idx).map(|c| c.to_string()).unwrap_or_default()))
            .collect();
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

/// File name an export of `source_filename` is saved under
pub fn export_filename(source_filename: &str) -> String {
    derived_filename(source_filename, "_export.csv")
}

/// Hand exported CSV to `saver` as `<stem>_export.csv`
pub fn download_csv(csv: &str, source_filename: &str, saver: &dyn FileSaver) -> io::Result<PathBuf> {
    let path = saver.save(csv.as_bytes(), EXPORT_MIME, &export_filename(source_filename))?;
    info!("exported {} to {}", source_filename, path.display());
    Ok(path)
}
