//! Repository list loading
//!
//! The list is a UTF-8 text file with one clone URL or path per line. Blank
//! lines and lines whose first non-whitespace character is `#` are skipped.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::debug;

/// Read and filter the repository list at `path`
///
/// A missing file is a configuration error and aborts the run before any
/// repository is touched.
pub fn load(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        bail!("Repository list not found: {}", path.display());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repository list: {}", path.display()))?;

    let sources = parse(&content);
    debug!(
        "Loaded {} repositories from {}",
        sources.len(),
        path.display()
    );

    Ok(sources)
}

/// Trim every line and drop blanks and comments, keeping order
pub fn parse(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
