//! Discovery of candidate invoice files.

use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, glob_with};
use tracing::{debug, warn};

use crate::error::Result;

/// Find invoice files under `root`.
///
/// A directory is searched recursively for `*.<extension>` (case-insensitive),
/// results sorted by path. A single file is returned as-is when its extension
/// matches.
pub fn find_documents(root: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        let matches = root
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !matches {
            warn!("{} does not have a .{} extension", root.display(), extension);
            return Ok(Vec::new());
        }
        return Ok(vec![root.to_path_buf()]);
    }

    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("input not found: {}", root.display()),
        )
        .into());
    }

    let pattern = format!(
        "{}/**/*.{}",
        Pattern::escape(&root.display().to_string()),
        Pattern::escape(extension)
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let mut paths: Vec<PathBuf> = glob_with(&pattern, options)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    debug!("Found {} .{} files under {}", paths.len(), extension, root.display());
    Ok(paths)
}
