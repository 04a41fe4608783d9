// LitmusLog - core/discovery.rs
//
// Input file discovery for the pipeline drivers.
//
// Discovery is flat: only the direct children of a directory are considered,
// matched on their file name against glob patterns. Results are sorted
// lexicographically because downstream `sum` and table invocations take the
// list as positional arguments and their output grouping follows that order.
//
// A missing directory yields an empty set, not an error. Every stage fed by
// an empty set is a silent no-op.

use crate::core::model::VendorGroup;
use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::path::{Path, PathBuf};

// =============================================================================
// Discovery
// =============================================================================

/// Return the files directly inside `dir` whose name matches any of
/// `patterns`, sorted and deduplicated.
pub fn discover(dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, DiscoveryError> {
    let compiled = compile_patterns(patterns)?;
    let mut files = walk(dir, |name| compiled.iter().any(|p| p.matches(name)))?;
    files.sort();
    files.dedup();

    tracing::debug!(
        dir = %dir.display(),
        patterns = ?patterns,
        found = files.len(),
        "Discovery complete"
    );
    Ok(files)
}

/// Discover files per vendor group and concatenate them in group order.
///
/// `suffix` is appended to every group pattern, e.g. `.txt` for raw logs or
/// `.txt.pkl` for their pickles. Each group's slice is sorted on its own so
/// that, for example, all `gtx*` logs precede all `tesla*` logs.
pub fn discover_groups(
    dir: &Path,
    groups: &[VendorGroup],
    suffix: &str,
) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut all: Vec<PathBuf> = Vec::new();
    for group in groups {
        for path in discover(dir, &group.with_suffix(suffix))? {
            if !all.contains(&path) {
                all.push(path);
            }
        }
    }
    Ok(all)
}

/// Every raw `.txt` log in `dir`.
pub fn discover_raw_logs(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    discover(dir, &[format!("*{}", constants::RAW_SUFFIX)])
}

/// TeX-gathering variant: every `.tex` file in `dir` except `output`, so a
/// re-run never includes its own previous result. `output` is compared as a
/// full path; a same-named file elsewhere is still an input.
pub fn discover_tex(dir: &Path, output: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let files = discover(dir, &["*.tex".to_string()])?;
    Ok(files.into_iter().filter(|p| p.as_path() != output).collect())
}

// =============================================================================
// Walk helpers
// =============================================================================

fn walk<F>(dir: &Path, mut accept: F) -> Result<Vec<PathBuf>, DiscoveryError>
where
    F: FnMut(&str) -> bool,
{
    match std::fs::metadata(dir) {
        Ok(meta) if !meta.is_dir() => {
            return Err(DiscoveryError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(dir = %dir.display(), "Directory does not exist; nothing to do");
            return Ok(Vec::new());
        }
        Err(_) => {} // let walkdir surface the real error below
    }

    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::Traversal {
                    path: dir.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 filename");
            continue;
        };

        if accept(name) {
            files.push(entry.path().to_path_buf());
        } else {
            tracing::trace!(file = name, "Not matched by patterns");
        }
    }
    Ok(files)
}

/// Compile glob pattern strings. Unlike a scan filter, a bad pattern here
/// would silently change what gets summed, so it is an error.
fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| DiscoveryError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::FormatVariant;
    use std::fs;
    use tempfile::TempDir;

    fn make_results() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        for name in [
            "teslaC2075.txt",
            "gtx660.txt",
            "gtx540.txt",
            "gtx540.txt.norm",
            "hd7970.txt",
            "notes.md",
        ] {
            fs::write(root.join(name), "x\n").expect("write fixture");
        }
        // Nested logs are not part of the flat scan.
        fs::create_dir(root.join("old")).expect("mkdir");
        fs::write(root.join("old").join("gtx480.txt"), "x\n").expect("write nested");
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_discover_sorted_and_flat() {
        let dir = make_results();
        let files = discover_raw_logs(dir.path()).unwrap();
        assert_eq!(
            names(&files),
            vec!["gtx540.txt", "gtx660.txt", "hd7970.txt", "teslaC2075.txt"]
        );
    }

    #[test]
    fn test_missing_dir_is_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let files = discover_raw_logs(&dir.path().join("results")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_file_instead_of_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("results");
        fs::write(&file, "x").unwrap();
        let result = discover_raw_logs(&file);
        assert!(matches!(result, Err(DiscoveryError::NotADirectory { .. })));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let dir = make_results();
        let result = discover(dir.path(), &["[gtx".to_string()]);
        assert!(matches!(result, Err(DiscoveryError::InvalidPattern { .. })));
    }

    #[test]
    fn test_groups_keep_group_order() {
        let dir = make_results();
        let groups = vec![
            VendorGroup::new("tesla", &["tesla*".to_string()], FormatVariant::Default),
            VendorGroup::new("gtx", &["gtx*".to_string()], FormatVariant::Default),
        ];
        let files = discover_groups(dir.path(), &groups, ".txt").unwrap();
        assert_eq!(
            names(&files),
            vec!["teslaC2075.txt", "gtx540.txt", "gtx660.txt"]
        );
    }

    #[test]
    fn test_groups_do_not_repeat_overlapping_matches() {
        let dir = make_results();
        let groups = vec![
            VendorGroup::new("a", &["gtx*".to_string()], FormatVariant::Default),
            VendorGroup::new("b", &["gtx5*".to_string()], FormatVariant::Default),
        ];
        let files = discover_groups(dir.path(), &groups, ".txt").unwrap();
        assert_eq!(names(&files), vec!["gtx540.txt", "gtx660.txt"]);
    }

    #[test]
    fn test_tex_discovery_excludes_output() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["inc.tex", "a.tex", "b.tex", "a.html"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let files = discover_tex(dir.path(), &dir.path().join("inc.tex")).unwrap();
        assert_eq!(names(&files), vec!["a.tex", "b.tex"]);
    }

    #[test]
    fn test_tex_output_elsewhere_keeps_same_named_input() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["inc.tex", "a.tex"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let output = dir.path().join("sub").join("inc.tex");
        let files = discover_tex(dir.path(), &output).unwrap();
        assert_eq!(names(&files), vec!["a.tex", "inc.tex"]);
    }
}
