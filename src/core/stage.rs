// LitmusLog - core/stage.rs
//
// Stage cache: decides whether a stage's output must be (re)built.
//
// The default policy treats the existence of the output file as the only
// staleness signal. A changed raw log with a stale `.norm`/`.pkl` next to it
// is therefore NOT reprocessed. `MtimeCache` is an opt-in stricter policy.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Decides whether `output` must be produced from `input`.
pub trait StageCache: Send + Sync {
    fn needs_stage(&self, input: &Path, output: &Path) -> bool;
}

/// Rebuild iff the output file is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistenceCache;

impl StageCache for ExistenceCache {
    fn needs_stage(&self, _input: &Path, output: &Path) -> bool {
        !output.exists()
    }
}

/// Rebuild iff the output is absent or older than its input.
///
/// Unreadable modification times count as stale so the stage re-runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeCache;

impl StageCache for MtimeCache {
    fn needs_stage(&self, input: &Path, output: &Path) -> bool {
        match (modified(output), modified(input)) {
            (None, _) => true,
            (Some(_), None) => !output.exists(),
            (Some(out), Some(inp)) => out < inp,
        }
    }
}

fn modified(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

/// Selectable invalidation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Output presence only.
    #[default]
    Exists,
    /// Output presence and modification time.
    Mtime,
}

impl CachePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "exists" => Some(CachePolicy::Exists),
            "mtime" => Some(CachePolicy::Mtime),
            _ => None,
        }
    }

    pub fn into_cache(self) -> Box<dyn StageCache> {
        match self {
            CachePolicy::Exists => Box::new(ExistenceCache),
            CachePolicy::Mtime => Box::new(MtimeCache),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::Exists => f.write_str("exists"),
            CachePolicy::Mtime => f.write_str("mtime"),
        }
    }
}
