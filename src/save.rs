/// File output for exports, reports and PDFs
///
/// Everything the user asks to "download" goes through a `FileSaver`, so
/// callers never choose paths themselves and tests can capture the bytes.

use log::debug;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Accepts finished content under a suggested file name
pub trait FileSaver {
    /// Persist `content` and return where it ended up
    fn save(&self, content: &[u8], mime_type: &str, suggested_filename: &str) -> io::Result<PathBuf>;
}

/// Writes into one output directory, replacing files of the same name
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, content: &[u8], mime_type: &str, suggested_filename: &str) -> io::Result<PathBuf> {
        let name = sanitize_filename(suggested_filename);
        fs::create_dir_all(&self.dir)?;

        let target = self.dir.join(&name);
        let tmp = self.dir.join(format!(".{}.tmp", name));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &target)?;

        debug!("saved {} bytes ({}) to {}", content.len(), mime_type, target.display());
        Ok(target)
    }
}

/// Keep only the final path component and replace characters that are not
/// portable in file names
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || matches!(c, ':' | '*' | '?' | '"' | '<' | '>' | '|') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() { "download".to_string() } else { cleaned.to_string() }
}

/// `<stem><suffix>` where the stem is `source` with a `.csv` extension removed
pub fn derived_filename(source: &str, suffix: &str) -> String {
    let stem = source.strip_suffix(".csv").or_else(|| source.strip_suffix(".CSV")).unwrap_or(source);
    format!("{}{}", stem, suffix)
}
