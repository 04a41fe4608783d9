// LitmusLog - app/clean.rs
//
// Removal of every derived artifact. Raw `.txt` logs are never touched.
// The root is cleaned first, then the `test` subdirectory is cleaned the
// same way if present.

use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{DiscoveryError, LitmusError, Result};
use std::path::{Path, PathBuf};

/// What a clean removed (or, in a dry run, would remove).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub files: Vec<PathBuf>,
    pub dirs: Vec<PathBuf>,
}

impl CleanReport {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

/// Remove the derived artifacts under `root` and `root/test`.
pub fn clean(root: &Path, dry_run: bool) -> Result<CleanReport> {
    let artifacts = compile(constants::ARTIFACT_PATTERNS)?;
    let aux = compile(constants::LATEX_AUX_PATTERNS)?;

    let mut report = CleanReport::default();
    clean_tree(root, &artifacts, &aux, dry_run, &mut report)?;

    let test = root.join(constants::TEST_SUBDIR);
    if test.is_dir() {
        tracing::debug!(dir = %test.display(), "Cleaning test subdirectory");
        clean_tree(&test, &artifacts, &aux, dry_run, &mut report)?;
    }

    if dry_run {
        for path in report.files.iter().chain(&report.dirs) {
            println!("# rm {}", path.display());
        }
    }
    tracing::info!(
        files = report.files.len(),
        dirs = report.dirs.len(),
        dry_run,
        "Clean complete"
    );
    Ok(report)
}

fn clean_tree(
    root: &Path,
    artifacts: &[glob::Pattern],
    aux: &[glob::Pattern],
    dry_run: bool,
    report: &mut CleanReport,
) -> Result<()> {
    let remove = |dir: &Path, patterns: &[glob::Pattern], report: &mut CleanReport| {
        let removed = fs::remove_matching(dir, patterns, dry_run)
            .map_err(|e| LitmusError::io(dir, "clean", e))?;
        report.files.extend(removed);
        Ok::<(), LitmusError>(())
    };

    remove(root, artifacts, report)?;
    remove(root, aux, report)?;
    for sub in [
        constants::DEFAULT_RESULTS_DIR,
        constants::DEFAULT_DISTILL_DIR,
        constants::DEFAULT_INC_DIR,
    ] {
        remove(&root.join(sub), artifacts, report)?;
    }

    for name in constants::GENERATED_DIRS {
        let dir = root.join(name);
        if fs::remove_dir_if_exists(&dir, dry_run).map_err(|e| LitmusError::io(&dir, "clean", e))? {
            report.dirs.push(dir);
        }
    }
    Ok(())
}

fn compile(patterns: &[&str]) -> std::result::Result<Vec<glob::Pattern>, DiscoveryError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| DiscoveryError::InvalidPattern {
                pattern: (*p).to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as stdfs;

    fn touch(path: &Path) {
        stdfs::create_dir_all(path.parent().unwrap()).unwrap();
        stdfs::write(path, "x").unwrap();
    }

    #[test]
    fn test_clean_keeps_raw_logs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in [
            "sum.pkl",
            "flat.html",
            "inc.tex",
            "inc.aux",
            "inc.pdf",
            "results/gtxA.txt",
            "results/gtxA.txt.norm",
            "results/gtxA.txt.pkl",
            "results-dis/hd1.sed",
            "results-inc/hd1-flat.tex",
            "entries/a.html",
        ] {
            touch(&root.join(rel));
        }

        let report = clean(root, false).unwrap();
        assert_eq!(report.files.len(), 9);
        assert_eq!(report.dirs, vec![root.join("entries")]);
        assert!(root.join("results/gtxA.txt").exists());
        assert!(!root.join("results/gtxA.txt.pkl").exists());
        assert!(!root.join("entries").exists());
    }

    #[test]
    fn test_aux_files_only_in_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("results/run.log"));
        touch(&dir.path().join("run.log"));
        clean(dir.path(), false).unwrap();
        assert!(dir.path().join("results/run.log").exists());
        assert!(!dir.path().join("run.log").exists());
    }

    #[test]
    fn test_test_subdir_cleaned_too() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("test/results/a.txt.pkl"));
        touch(&dir.path().join("test/entries-inc/x"));
        touch(&dir.path().join("test/results/a.txt"));

        let report = clean(dir.path(), false).unwrap();
        assert_eq!(report.files, vec![dir.path().join("test/results/a.txt.pkl")]);
        assert!(!dir.path().join("test/entries-inc").exists());
        assert!(dir.path().join("test/results/a.txt").exists());
    }

    #[test]
    fn test_dry_run_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("sum.pkl"));
        touch(&dir.path().join("entries/a"));
        let report = clean(dir.path(), true).unwrap();
        assert!(!report.is_empty());
        assert!(dir.path().join("sum.pkl").exists());
        assert!(dir.path().join("entries").exists());
    }

    #[test]
    fn test_empty_root_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert!(clean(dir.path(), false).unwrap().is_empty());
    }
}
