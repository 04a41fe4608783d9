// LitmusLog - platform/config.rs
//
// Config file resolution, config.toml loading and validation.
//
// Tool locations, vendor prefixes and the cache policy are carried
// explicitly in `PipelineConfig`. Precedence: built-in defaults < config.toml < CLI flags.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::{FormatVariant, VendorGroup};
use crate::core::rewrite::DEFAULT_RECORD_KINDS;
use crate::core::stage::CachePolicy;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Default location of config.toml for this platform, if one can be
/// determined (e.g. ~/.config/litmuslog/config.toml).
pub fn default_config_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("", "", constants::APP_ID)?;
    let path = dirs.config_dir().join(constants::CONFIG_FILE_NAME);
    tracing::debug!(path = %path.display(), "Default config path resolved");
    Some(path)
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[tools]` section.
    pub tools: ToolsSection,
    /// `[cache]` section.
    pub cache: CacheSection,
    /// `[pipeline]` section.
    pub pipeline: PipelineSection,
    /// `[groups]` section.
    pub groups: GroupsSection,
    /// `[distill]` section.
    pub distill: DistillSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[tools]` config section. Each tool is a command prefix, e.g.
/// `log2log = ["python3", "/opt/log-analysis/log2log.py"]`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub log2log: Option<Vec<String>>,
    pub log2tbl: Option<Vec<String>>,
    pub latex: Option<Vec<String>>,
}

/// `[cache]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// "exists" or "mtime".
    pub policy: Option<String>,
}

/// `[pipeline]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Run independent per-file stages concurrently.
    pub parallel: Option<bool>,
}

/// `[groups]` config section: filename prefixes per vendor family.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct GroupsSection {
    pub sum: Option<Vec<String>>,
    pub ptx: Option<Vec<String>>,
    pub opencl: Option<Vec<String>>,
}

/// `[distill]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DistillSection {
    pub entries_dir: Option<String>,
    pub record_kinds: Option<Vec<String>>,
    /// Record kinds named from the `% Results for` header.
    pub header_kinds: Option<Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

// =============================================================================
// Validated config
// =============================================================================

/// Validated pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    // -- Tools --
    pub log2log: Vec<String>,
    pub log2tbl: Vec<String>,
    pub latex: Vec<String>,

    // -- Run behaviour --
    pub cache_policy: CachePolicy,
    pub parallel: bool,
    /// Print invocations instead of running them.
    pub dry_run: bool,
    /// Record format of `normalize`/`process` runs.
    pub variant: FormatVariant,

    // -- Groups --
    pub sum_groups: Vec<String>,
    pub ptx_groups: Vec<String>,
    pub opencl_groups: Vec<String>,

    // -- Distill --
    pub entries_dir: String,
    pub record_kinds: Vec<String>,
    pub header_kinds: Vec<String>,

    // -- Logging --
    pub log_level: Option<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log2log: owned(constants::DEFAULT_LOG2LOG),
            log2tbl: owned(constants::DEFAULT_LOG2TBL),
            latex: owned(constants::DEFAULT_LATEX),
            cache_policy: CachePolicy::default(),
            parallel: false,
            dry_run: false,
            variant: FormatVariant::Default,
            sum_groups: owned(constants::DEFAULT_SUM_GROUPS),
            ptx_groups: owned(constants::DEFAULT_PTX_GROUPS),
            opencl_groups: owned(constants::DEFAULT_OPENCL_GROUPS),
            entries_dir: constants::DEFAULT_ENTRIES_DIR.to_string(),
            record_kinds: owned(DEFAULT_RECORD_KINDS),
            header_kinds: Vec::new(),
            log_level: None,
        }
    }
}

impl PipelineConfig {
    /// Groups feeding `sum.pkl`, in the run's record format.
    pub fn sum_groups(&self) -> Vec<VendorGroup> {
        self.sum_groups
            .iter()
            .map(|p| VendorGroup::new(p.trim_end_matches('*'), &[p.clone()], self.variant))
            .collect()
    }

    /// PTX-style distill families (default record format).
    pub fn ptx_groups(&self) -> Vec<VendorGroup> {
        self.ptx_groups
            .iter()
            .map(|p| VendorGroup::new(p.trim_end_matches('*'), &[p.clone()], FormatVariant::Default))
            .collect()
    }

    /// OpenCL-style distill families (incantation record format).
    pub fn opencl_groups(&self) -> Vec<VendorGroup> {
        self.opencl_groups
            .iter()
            .map(|p| {
                VendorGroup::new(
                    p.trim_end_matches('*'),
                    &[p.clone()],
                    FormatVariant::Incantations,
                )
            })
            .collect()
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load and validate config.toml.
///
/// `explicit` is true when the path came from `--config`: then a missing or
/// unparseable file is an error. For the platform default path a missing
/// file means defaults, and an unparseable one produces a warning and
/// defaults so a broken user file never blocks a run that does not need it.
///
/// Returns the validated config and non-fatal warnings. Invalid individual
/// values fall back to their defaults with a warning.
pub fn load_config(
    path: &Path,
    explicit: bool,
) -> Result<(PipelineConfig, Vec<String>), ConfigError> {
    let mut warnings: Vec<String> = Vec::new();

    if !path.exists() {
        if explicit {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        tracing::debug!(path = %path.display(), "No config.toml found; using defaults");
        return Ok((PipelineConfig::default(), warnings));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) if explicit => {
            return Err(ConfigError::TomlParse {
                path: path.to_path_buf(),
                source,
            });
        }
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return Ok((PipelineConfig::default(), warnings));
        }
    };

    tracing::info!(path = %path.display(), "Loaded config.toml");
    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }
    Ok((config, warnings))
}

/// Parse config text directly (used by tests and embedding callers).
pub fn parse_config(content: &str) -> Result<(PipelineConfig, Vec<String>), toml::de::Error> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut warnings = Vec::new();
    let config = validate(raw, &mut warnings);
    Ok((config, warnings))
}

fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> PipelineConfig {
    let mut config = PipelineConfig::default();

    // -- Tools --
    for (name, value, slot) in [
        ("log2log", raw.tools.log2log, &mut config.log2log),
        ("log2tbl", raw.tools.log2tbl, &mut config.log2tbl),
        ("latex", raw.tools.latex, &mut config.latex),
    ] {
        match value {
            Some(cmd) if cmd.first().is_some_and(|p| !p.trim().is_empty()) => *slot = cmd,
            Some(_) => warnings.push(format!(
                "[tools] {name} must be a non-empty command list. Using default ({}).",
                slot.join(" ")
            )),
            None => {}
        }
    }

    // -- Cache --
    if let Some(ref policy) = raw.cache.policy {
        match CachePolicy::parse(policy) {
            Some(p) => config.cache_policy = p,
            None => warnings.push(format!(
                "[cache] policy = \"{policy}\" is not recognised. \
                 Expected \"exists\" or \"mtime\". Using default (exists).",
            )),
        }
    }

    // -- Pipeline --
    if let Some(parallel) = raw.pipeline.parallel {
        config.parallel = parallel;
    }

    // -- Groups --
    for (name, value, slot) in [
        ("sum", raw.groups.sum, &mut config.sum_groups),
        ("ptx", raw.groups.ptx, &mut config.ptx_groups),
        ("opencl", raw.groups.opencl, &mut config.opencl_groups),
    ] {
        let Some(patterns) = value else { continue };
        match patterns.iter().find(|p| glob::Pattern::new(p).is_err()) {
            Some(bad) => warnings.push(format!(
                "[groups] {name} contains invalid pattern \"{bad}\". Using default ({}).",
                slot.join(", ")
            )),
            None => *slot = patterns,
        }
    }

    // -- Distill --
    if let Some(dir) = raw.distill.entries_dir {
        if dir.trim().is_empty() {
            warnings.push(format!(
                "[distill] entries_dir must not be empty. Using default ({}).",
                constants::DEFAULT_ENTRIES_DIR
            ));
        } else {
            config.entries_dir = dir;
        }
    }
    if let Some(kinds) = raw.distill.record_kinds {
        if kinds.is_empty() || kinds.iter().any(|k| k.trim().is_empty()) {
            warnings.push(format!(
                "[distill] record_kinds must list non-empty names. Using default ({}).",
                DEFAULT_RECORD_KINDS.join(", ")
            ));
        } else {
            config.record_kinds = kinds;
        }
    }
    if let Some(kinds) = raw.distill.header_kinds {
        if kinds.iter().any(|k| k.trim().is_empty()) {
            warnings.push(
                "[distill] header_kinds must list non-empty names. Using default (none)."
                    .to_string(),
            );
        } else {
            config.header_kinds = kinds;
        }
    }

    // -- Logging --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    config
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let (config, warnings) = parse_config("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_full_config_overrides() {
        let toml = r#"
            [tools]
            log2log = ["python3", "/opt/la/log2log.py"]
            log2tbl = ["python3", "/opt/la/log2tbl.py"]

            [cache]
            policy = "mtime"

            [pipeline]
            parallel = true

            [groups]
            sum = ["gtx*", "titan*"]
            opencl = ["hd*"]

            [distill]
            entries_dir = "entries-dis"
            header_kinds = ["RACE_OPENCL"]

            [logging]
            level = "DEBUG"

            [unknown]
            ignored = 1
        "#;
        let (config, warnings) = parse_config(toml).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.log2log, vec!["python3", "/opt/la/log2log.py"]);
        assert_eq!(config.cache_policy, CachePolicy::Mtime);
        assert!(config.parallel);
        assert_eq!(config.sum_groups, vec!["gtx*", "titan*"]);
        assert_eq!(config.ptx_groups, owned(constants::DEFAULT_PTX_GROUPS));
        assert_eq!(config.opencl_groups, vec!["hd*"]);
        assert_eq!(config.entries_dir, "entries-dis");
        assert_eq!(config.header_kinds, vec!["RACE_OPENCL"]);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values_fall_back_with_warnings() {
        let toml = r#"
            [tools]
            log2log = []

            [cache]
            policy = "sha256"

            [groups]
            sum = ["[gtx"]

            [logging]
            level = "loud"
        "#;
        let (config, warnings) = parse_config(toml).unwrap();
        assert_eq!(warnings.len(), 4, "{warnings:?}");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_missing_default_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"), false).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(&dir.path().join("config.toml"), true);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_unparseable_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tools\nlog2log = ").unwrap();

        assert!(matches!(
            load_config(&path, true),
            Err(ConfigError::TomlParse { .. })
        ));
        let (config, warnings) = load_config(&path, false).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_group_variants() {
        let config = PipelineConfig::default();
        assert!(config
            .opencl_groups()
            .iter()
            .all(|g| g.variant == FormatVariant::Incantations));
        assert!(config
            .ptx_groups()
            .iter()
            .all(|g| g.variant == FormatVariant::Default));
        let names: Vec<_> = config.sum_groups().into_iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["gtx", "tesla"]);
    }
}
