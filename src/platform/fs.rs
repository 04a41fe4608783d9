// LitmusLog - platform/fs.rs
//
// Filesystem helpers for artifact removal.

use std::io;
use std::path::{Path, PathBuf};

/// Remove every regular file directly inside `dir` whose name matches one of
/// `patterns`. A missing directory removes nothing. With `dry_run` the
/// matches are only reported.
///
/// Returns the matched paths, sorted.
pub fn remove_matching(
    dir: &Path,
    patterns: &[glob::Pattern],
    dry_run: bool,
) -> io::Result<Vec<PathBuf>> {
    match std::fs::metadata(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
        Ok(_) => {}
    }

    let walker = walkdir::WalkDir::new(dir).min_depth(1).max_depth(1);
    let mut removed = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if patterns.iter().any(|p| p.matches(name)) {
            let path = entry.into_path();
            if !dry_run {
                std::fs::remove_file(&path)?;
                tracing::debug!(path = %path.display(), "Removed");
            }
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}

/// Recursively remove `dir` if it exists. Returns whether it existed.
pub fn remove_dir_if_exists(dir: &Path, dry_run: bool) -> io::Result<bool> {
    if dry_run {
        return Ok(dir.is_dir());
    }
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {
            tracing::debug!(dir = %dir.display(), "Removed directory");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_remove_matching_only_touches_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "a.txt.pkl", "b.html"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.pkl")).unwrap();

        let pats = vec![glob::Pattern::new("*.pkl").unwrap()];
        let listed = remove_matching(dir.path(), &pats, true).unwrap();
        assert!(dir.path().join("a.txt.pkl").exists());
        let removed = remove_matching(dir.path(), &pats, false).unwrap();
        assert_eq!(listed, removed);
        assert_eq!(removed, vec![dir.path().join("a.txt.pkl")]);
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("b.html").exists());
        assert!(dir.path().join("sub.pkl").is_dir());
    }

    #[test]
    fn test_remove_matching_stays_at_top_level() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("top.pkl"), "x").unwrap();
        fs::write(dir.path().join("nested/deep.pkl"), "x").unwrap();

        let pats = vec![glob::Pattern::new("*.pkl").unwrap()];
        let removed = remove_matching(dir.path(), &pats, false).unwrap();
        assert_eq!(removed, vec![dir.path().join("top.pkl")]);
        assert!(dir.path().join("nested/deep.pkl").exists());
    }

    #[test]
    fn test_missing_targets_are_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(remove_matching(&missing, &[], false).unwrap().is_empty());
        assert!(!remove_dir_if_exists(&missing, false).unwrap());
    }
}
