//! File reading utilities

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// File reader with UTF-8 validation
pub struct FileReader;

impl FileReader {
    /// Read a file as UTF-8 text
    pub fn read_text(path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        Ok(content)
    }

    /// Read a file as one segment per line
    ///
    /// `\n` and `\r\n` both end a line; a final line terminator does not add
    /// an empty segment.
    pub fn read_lines(path: &Path) -> Result<Vec<String>> {
        let content = Self::read_text(path)?;
        let lines: Vec<String> = content.lines().map(str::to_owned).collect();
        log::debug!("{}: {} lines", path.display(), lines.len());
        Ok(lines)
    }
}
