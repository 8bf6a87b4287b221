//! Report delivery: save as a download or send to a print surface.

use crate::save::{FileSaver, derived_filename};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;

pub const REPORT_MIME: &str = "text/html";

/// File name a report for `source_filename` is saved under
pub fn report_filename(source_filename: &str) -> String {
    derived_filename(source_filename, "_report.html")
}

/// Hand the rendered document to `saver` as `<stem>_report.html`.
///
/// The document is passed through byte for byte.
pub fn trigger_download(document: &str, source_filename: &str, saver: &dyn FileSaver) -> io::Result<PathBuf> {
    let name = report_filename(source_filename);
    let path = saver.save(document.as_bytes(), REPORT_MIME, &name)?;
    info!("report for {} saved to {}", source_filename, path.display());
    Ok(path)
}

/// Write the document to a print surface (stdout, a pipe, a spool file)
pub fn print_document<W: Write>(document: &str, mut writer: W) -> io::Result<()> {
    writer.write_all(document.as_bytes())?;
    if !document.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()
}
