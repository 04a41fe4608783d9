// LitmusLog - util/constants.rs
//
// Single source of truth for named constants, file names, and defaults.
// File names and suffixes here are part of the on-disk contract with the
// external log-analysis tools and must not change.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LitmusLog";

/// Application identifier used for the config directory.
pub const APP_ID: &str = "LitmusLog";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default log level when neither RUST_LOG, --debug, nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Stage suffixes
// =============================================================================

/// Raw litmus log as produced by the test harness.
pub const RAW_SUFFIX: &str = ".txt";

/// Output of the distill rewrite step.
pub const REWRITE_SUFFIX: &str = ".sed";

/// Output of `log2log normalize`.
pub const NORM_SUFFIX: &str = ".norm";

/// Output of `log2log pickle`.
pub const PICKLE_SUFFIX: &str = ".pkl";

/// Output of `log2log best`.
pub const BEST_SUFFIX: &str = ".best.pkl";

// =============================================================================
// Default directories and artifact names
// =============================================================================

/// Default input directory for `normalize` and `process`.
pub const DEFAULT_RESULTS_DIR: &str = "results";

/// Default input directory for `process-dis`.
pub const DEFAULT_DISTILL_DIR: &str = "results-dis";

/// Default input directory for `process-inc`.
pub const DEFAULT_INC_DIR: &str = "results-inc";

/// Sum artifact of the full-results pipeline.
pub const SUM_FILE: &str = "sum.pkl";

/// `log2log sum` rejects fewer logs than this.
pub const MIN_SUM_INPUTS: usize = 2;

/// Sum artifact of the distilled PTX families.
pub const SUM_DIS_PTX_FILE: &str = "sum-dis-ptx.pkl";

/// Sum artifact of the distilled OpenCL families.
pub const SUM_DIS_OPENCL_FILE: &str = "sum-dis-opencl.pkl";

/// Table output of the distilled PTX families.
pub const DIS_PTX_TABLE: &str = "dis-ptx.html";

/// Table output of the distilled OpenCL families.
pub const DIS_OPENCL_TABLE: &str = "dis-opencl.html";

/// Default `-d` entries directory passed to `log2tbl` by `process-dis`.
pub const DEFAULT_ENTRIES_DIR: &str = "entries";

/// Entries directories created by `log2tbl` (removed by `clean`).
pub const GENERATED_DIRS: &[&str] = &["entries", "entries-inc"];

/// Subdirectory with its own artifacts, cleaned after the main tree.
pub const TEST_SUBDIR: &str = "test";

/// Default output of `gather`.
pub const DEFAULT_GATHER_OUTPUT: &str = "inc.tex";

// =============================================================================
// Vendor groups
// =============================================================================

/// Log families summed by the full-results pipeline.
pub const DEFAULT_SUM_GROUPS: &[&str] = &["gtx*", "tesla*"];

/// PTX-style families of the distilled pipeline (default record format).
pub const DEFAULT_PTX_GROUPS: &[&str] = &["gtx*", "tesla*"];

/// OpenCL-style families of the distilled pipeline (incantation format,
/// reduced with `best`).
pub const DEFAULT_OPENCL_GROUPS: &[&str] = &["hd*", "r9*"];

// =============================================================================
// External tools
// =============================================================================

/// Default command prefix for the normalize/pickle/sum/best tool.
pub const DEFAULT_LOG2LOG: &[&str] = &["log2log.py"];

/// Default command prefix for the table renderer.
pub const DEFAULT_LOG2TBL: &[&str] = &["log2tbl.py"];

/// Default command prefix for building gathered TeX documents.
pub const DEFAULT_LATEX: &[&str] = &["pdflatex", "-interaction=nonstopmode"];

/// Flag selecting the incantation record format ("format variant A").
pub const INCANTATIONS_FLAG: &str = "-i";

/// Table renderer flag restricting output to positive results.
pub const POSITIVE_FLAG: &str = "-p";

// =============================================================================
// Cleanup
// =============================================================================

/// Derived artifacts removed from every working directory.
pub const ARTIFACT_PATTERNS: &[&str] = &["*.pkl", "*.norm", "*.sed", "*.html", "*.tex"];

/// LaTeX build leftovers removed from the root directory.
pub const LATEX_AUX_PATTERNS: &[&str] = &["*.aux", "*.log", "*.pdf", "*.out", "*.dvi"];
