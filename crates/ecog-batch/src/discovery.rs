//! Recording discovery and session filtering

use ecog_core::events::session_id;
use ecog_core::{AnnotationDictionary, EcogError, EcogResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// All files under `root` whose extension equals `extension` (case-insensitive), sorted
pub fn discover_recordings(root: &Path, extension: &str) -> EcogResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect(root, extension, &mut found)?;
    found.sort();
    debug!("Found {} .{} files under {}", found.len(), extension, root.display());
    Ok(found)
}

fn collect(dir: &Path, extension: &str, found: &mut Vec<PathBuf>) -> EcogResult<()> {
    for entry in fs::read_dir(dir).map_err(|e| EcogError::io(dir, e))? {
        let path = entry.map_err(|e| EcogError::io(dir, e))?.path();
        if path.is_dir() {
            collect(&path, extension, found)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        {
            found.push(path);
        }
    }
    Ok(())
}

/// Keep the files whose session id appears inside some dictionary key
pub fn filter_known_sessions(files: Vec<PathBuf>, dictionary: &AnnotationDictionary) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|path| session_id(path).is_some_and(|session| dictionary.contains_session(&session)))
        .collect()
}
