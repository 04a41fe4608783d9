// LitmusLog - core/model.rs
//
// Core data model types. Pure data definitions with no process spawning
// and no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// Stages
// =============================================================================

/// Pipeline stage of a log artifact.
///
/// `Raw → Rewritten? → Normalized → Pickled → Best? → Summed → Tabulated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Raw,
    Rewritten,
    Normalized,
    Pickled,
    Best,
    Summed,
    Tabulated,
}

impl Stage {
    /// Infer the stage of a file from its name. `None` for files that are
    /// not pipeline artifacts. Sum artifacts are plain pickles by name.
    pub fn from_file_name(name: &str) -> Option<Stage> {
        // Longest suffix first: ".best.pkl" also ends in ".pkl".
        if name.ends_with(constants::BEST_SUFFIX) {
            Some(Stage::Best)
        } else if name.ends_with(constants::PICKLE_SUFFIX) {
            Some(Stage::Pickled)
        } else if name.ends_with(constants::NORM_SUFFIX) {
            Some(Stage::Normalized)
        } else if name.ends_with(constants::REWRITE_SUFFIX) {
            Some(Stage::Rewritten)
        } else if name.ends_with(constants::RAW_SUFFIX) {
            Some(Stage::Raw)
        } else {
            None
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Raw => "raw",
            Stage::Rewritten => "rewritten",
            Stage::Normalized => "normalized",
            Stage::Pickled => "pickled",
            Stage::Best => "best",
            Stage::Summed => "summed",
            Stage::Tabulated => "tabulated",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Stage path naming
// =============================================================================

/// `X` → `X.norm`.
pub fn norm_path(input: &Path) -> PathBuf {
    append_suffix(input, constants::NORM_SUFFIX)
}

/// `X.norm` → `X.pkl`; any other name gets `.pkl` appended.
pub fn pickle_path(norm: &Path) -> PathBuf {
    append_suffix(&strip_suffix(norm, constants::NORM_SUFFIX), constants::PICKLE_SUFFIX)
}

/// `name.txt` → `name.sed`.
pub fn rewrite_path(raw: &Path) -> PathBuf {
    append_suffix(&strip_suffix(raw, constants::RAW_SUFFIX), constants::REWRITE_SUFFIX)
}

/// `name.sed.pkl` → `name.best.pkl`.
pub fn best_path(pickle: &Path) -> PathBuf {
    let stem = strip_suffix(pickle, constants::PICKLE_SUFFIX);
    let stem = strip_suffix(&stem, constants::REWRITE_SUFFIX);
    let stem = strip_suffix(&stem, constants::RAW_SUFFIX);
    append_suffix(&stem, constants::BEST_SUFFIX)
}

/// Output base for incantation tables: strip `.pkl`, `.norm`, `.txt` in
/// that order, each only if present.
pub fn table_base(pickle: &Path) -> PathBuf {
    [
        constants::PICKLE_SUFFIX,
        constants::NORM_SUFFIX,
        constants::RAW_SUFFIX,
    ]
    .iter()
    .fold(pickle.to_path_buf(), |p, suffix| strip_suffix(&p, suffix))
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn strip_suffix(path: &Path, suffix: &str) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(suffix)) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

// =============================================================================
// Log files
// =============================================================================

/// A log artifact on disk plus the stage inferred from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub stage: Stage,
    /// Last-modified time, when readable.
    pub modified: Option<DateTime<Utc>>,
}

impl LogFile {
    /// Classify `path`. Returns `None` for files that are not log artifacts.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stage = Stage::from_file_name(name)?;
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        Some(Self {
            path: path.to_path_buf(),
            stage,
            modified,
        })
    }

    /// Identity of the log: the file name with every stage suffix removed.
    pub fn base_name(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut base = name.as_str();
        loop {
            let before = base;
            for suffix in [
                constants::BEST_SUFFIX,
                constants::PICKLE_SUFFIX,
                constants::NORM_SUFFIX,
                constants::REWRITE_SUFFIX,
                constants::RAW_SUFFIX,
            ] {
                if let Some(s) = base.strip_suffix(suffix) {
                    base = s;
                }
            }
            if base == before {
                break;
            }
        }
        base.to_string()
    }
}

// =============================================================================
// Record formats and vendor groups
// =============================================================================

/// Input/record format of the external tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatVariant {
    #[default]
    Default,
    /// Incantation logs, selected with `-i`.
    Incantations,
}

impl FormatVariant {
    pub fn from_flag(incantations: bool) -> Self {
        if incantations {
            FormatVariant::Incantations
        } else {
            FormatVariant::Default
        }
    }

    /// The flag to pass to `log2log`, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self {
            FormatVariant::Default => None,
            FormatVariant::Incantations => Some(constants::INCANTATIONS_FLAG),
        }
    }
}

/// A named set of filename patterns sharing a record format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorGroup {
    pub name: String,
    pub patterns: Vec<String>,
    pub variant: FormatVariant,
}

impl VendorGroup {
    pub fn new(name: &str, patterns: &[String], variant: FormatVariant) -> Self {
        Self {
            name: name.to_string(),
            patterns: patterns.to_vec(),
            variant,
        }
    }

    /// Patterns restricted to raw logs: `gtx*` → `gtx*.txt`.
    pub fn raw_patterns(&self) -> Vec<String> {
        self.with_suffix(constants::RAW_SUFFIX)
    }

    /// Patterns appended with an arbitrary stage suffix.
    pub fn with_suffix(&self, suffix: &str) -> Vec<String> {
        self.patterns.iter().map(|p| format!("{p}{suffix}")).collect()
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Table kinds understood by `log2tbl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Flat,
    Classified,
    Sections,
    TwoLevel,
    Incantations,
    IncantationsFlat,
    IncantationsHtml,
}

impl TableKind {
    /// Kinds rendered (unfiltered and positive-only) by the full pipeline.
    pub const REPORT_KINDS: [TableKind; 4] = [
        TableKind::Flat,
        TableKind::Sections,
        TableKind::Classified,
        TableKind::TwoLevel,
    ];

    /// Subcommand name passed to `log2tbl`.
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Flat => "flat",
            TableKind::Classified => "classified",
            TableKind::Sections => "sections",
            TableKind::TwoLevel => "two-level",
            TableKind::Incantations => "incantations",
            TableKind::IncantationsFlat => "incantations-flat",
            TableKind::IncantationsHtml => "incantations-html",
        }
    }

    /// Whether `log2tbl` accepts `-d <entries>` for this kind.
    pub fn takes_entries_dir(self) -> bool {
        matches!(
            self,
            TableKind::Flat
                | TableKind::Classified
                | TableKind::Sections
                | TableKind::TwoLevel
                | TableKind::IncantationsHtml
        )
    }

    /// Incantation kinds take a single log, treat `-o` as an output
    /// basename, and do not accept `-p`.
    pub fn is_incantation(self) -> bool {
        matches!(
            self,
            TableKind::Incantations | TableKind::IncantationsFlat | TableKind::IncantationsHtml
        )
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `log2tbl` rendering request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub kind: TableKind,
    pub positive_only: bool,
    pub output: Option<PathBuf>,
    pub entries_dir: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
}

impl ReportTable {
    pub fn new(kind: TableKind, inputs: Vec<PathBuf>) -> Self {
        Self {
            kind,
            positive_only: false,
            output: None,
            entries_dir: None,
            inputs,
        }
    }

    pub fn positive_only(mut self, yes: bool) -> Self {
        self.positive_only = yes;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn entries_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.entries_dir = Some(dir.into());
        self
    }
}

/// Output kinds selectable on the `process-inc` command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncKind {
    Flat,
    Classified,
    Html,
}

impl IncKind {
    /// Literal values accepted on the command line.
    pub const NAMES: &'static [&'static str] = &["flat", "classified", "html"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "flat" => Some(IncKind::Flat),
            "classified" => Some(IncKind::Classified),
            "html" => Some(IncKind::Html),
            _ => None,
        }
    }

    pub fn table_kind(self) -> TableKind {
        match self {
            IncKind::Flat => TableKind::IncantationsFlat,
            IncKind::Classified => TableKind::Incantations,
            IncKind::Html => TableKind::IncantationsHtml,
        }
    }

    /// Extension of the files the renderer writes for this kind.
    pub fn extension(self) -> &'static str {
        match self {
            IncKind::Flat | IncKind::Classified => "tex",
            IncKind::Html => "html",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_file_name() {
        assert_eq!(Stage::from_file_name("gtx.txt"), Some(Stage::Raw));
        assert_eq!(Stage::from_file_name("gtx.txt.norm"), Some(Stage::Normalized));
        assert_eq!(Stage::from_file_name("gtx.txt.pkl"), Some(Stage::Pickled));
        assert_eq!(Stage::from_file_name("hd7970.best.pkl"), Some(Stage::Best));
        assert_eq!(Stage::from_file_name("hd7970.sed"), Some(Stage::Rewritten));
        assert_eq!(Stage::from_file_name("flat.html"), None);
    }

    #[test]
    fn test_main_pipeline_naming() {
        let raw = Path::new("results/gtxA.txt");
        let norm = norm_path(raw);
        assert_eq!(norm, PathBuf::from("results/gtxA.txt.norm"));
        assert_eq!(pickle_path(&norm), PathBuf::from("results/gtxA.txt.pkl"));
    }

    #[test]
    fn test_distill_naming() {
        let raw = Path::new("results-dis/hd7970.txt");
        let sed = rewrite_path(raw);
        assert_eq!(sed, PathBuf::from("results-dis/hd7970.sed"));
        let pkl = pickle_path(&norm_path(&sed));
        assert_eq!(pkl, PathBuf::from("results-dis/hd7970.sed.pkl"));
        assert_eq!(best_path(&pkl), PathBuf::from("results-dis/hd7970.best.pkl"));
    }

    #[test]
    fn test_table_base_strips_in_sequence() {
        assert_eq!(
            table_base(Path::new("r/gtx540.txt.pkl")),
            PathBuf::from("r/gtx540")
        );
        assert_eq!(
            table_base(Path::new("r/gtx540.txt.norm.pkl")),
            PathBuf::from("r/gtx540")
        );
        // Order matters: ".txt" before ".pkl" is left alone.
        assert_eq!(
            table_base(Path::new("r/a.pkl.txt")),
            PathBuf::from("r/a.pkl")
        );
    }

    #[test]
    fn test_base_name_is_stage_independent() {
        for p in ["r/gtx.txt", "r/gtx.txt.norm", "r/gtx.txt.pkl", "r/gtx.best.pkl"] {
            let f = LogFile {
                path: PathBuf::from(p),
                stage: Stage::Raw,
                modified: None,
            };
            assert_eq!(f.base_name(), "gtx", "for {p}");
        }
    }

    #[test]
    fn test_vendor_group_patterns() {
        let g = VendorGroup::new(
            "ptx",
            &["gtx*".to_string(), "tesla*".to_string()],
            FormatVariant::Default,
        );
        assert_eq!(g.raw_patterns(), vec!["gtx*.txt", "tesla*.txt"]);
        assert_eq!(g.with_suffix(".txt.pkl"), vec!["gtx*.txt.pkl", "tesla*.txt.pkl"]);
    }

    #[test]
    fn test_inc_kind_mapping() {
        assert_eq!(IncKind::parse("flat").map(IncKind::table_kind), Some(TableKind::IncantationsFlat));
        assert_eq!(IncKind::parse("classified").map(IncKind::table_kind), Some(TableKind::Incantations));
        assert_eq!(IncKind::parse("html").map(IncKind::extension), Some("html"));
        assert_eq!(IncKind::parse("pdf"), None);
        assert_eq!(IncKind::parse("Flat"), None);
    }

    #[test]
    fn test_format_variant_flag() {
        assert_eq!(FormatVariant::from_flag(false).flag(), None);
        assert_eq!(FormatVariant::from_flag(true).flag(), Some("-i"));
    }
}
