//! Pool loader for line-delimited input files

use std::fs;
use std::path::Path;
use tracing::error;

/// Read a pool file into an ordered list of entries.
///
/// Returns the whitespace-trimmed, non-empty lines in file order. Lines
/// starting with `#` are comments and skipped, so an annotated proxies file
/// never feeds comment text into the attempt loop. A missing or unreadable
/// file degrades to an empty pool: the error is logged and never
/// propagated, so a forgotten proxies file does not stop a run.
pub fn load_lines<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read pool file");
            Vec::new()
        }
    }
}
