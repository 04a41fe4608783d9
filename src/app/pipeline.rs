// LitmusLog - app/pipeline.rs
//
// Pipeline drivers. A `Workspace` binds a base directory, a validated
// config, a stage cache and a dispatcher; each driver walks the stage graph
//
//   raw -> (rewritten) -> normalized -> pickled -> (best) -> summed -> tabulated
//
// skipping every per-file and sum stage whose output the cache reports as
// current. Tables always re-run. The first failing stage aborts the driver
// and its error is returned; no later stage, and in particular no sum or
// table, runs after a failure.

use crate::app::dispatch::{CommandRunner, Dispatcher, DryRunRunner, ProcessRunner};
use crate::core::discovery;
use crate::core::gather;
use crate::core::model::{
    self, FormatVariant, IncKind, LogFile, ReportTable, Stage, TableKind, VendorGroup,
};
use crate::core::rewrite::Rewriter;
use crate::core::stage::StageCache;
use crate::platform::config::PipelineConfig;
use crate::util::constants;
use crate::util::error::{ConfigError, DispatchError, LitmusError, Result};
use rayon::prelude::*;
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

// =============================================================================
// Run summary
// =============================================================================

/// Counts of what a driver did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Per-file and sum stages executed.
    pub executed: usize,
    /// Per-file and sum stages skipped because their output was current.
    pub skipped: usize,
    /// Tables rendered.
    pub tables: usize,
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.executed += rhs.executed;
        self.skipped += rhs.skipped;
        self.tables += rhs.tables;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stage(s) run, {} skipped, {} table(s) rendered",
            self.executed, self.skipped, self.tables
        )
    }
}

// =============================================================================
// Workspace
// =============================================================================

/// Base directory plus everything a driver needs to run there.
pub struct Workspace {
    root: PathBuf,
    config: PipelineConfig,
    cache: Box<dyn StageCache>,
    dispatcher: Dispatcher,
    rewriter: Rewriter,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Build a workspace that executes (or, with `dry_run`, prints) the
    /// external tools.
    pub fn open(root: impl Into<PathBuf>, config: PipelineConfig) -> Result<Self> {
        let runner: Box<dyn CommandRunner> = if config.dry_run {
            Box::new(DryRunRunner)
        } else {
            Box::new(ProcessRunner)
        };
        Self::with_runner(root, config, runner)
    }

    /// Build a workspace around an arbitrary runner.
    pub fn with_runner(
        root: impl Into<PathBuf>,
        config: PipelineConfig,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self> {
        let root = absolute_root(root.into())?;
        let rewriter = Rewriter::new(&config.record_kinds)
            .and_then(|r| r.rename_from_header(&config.header_kinds))
            .map_err(|e| {
                LitmusError::Config(ConfigError::InvalidValue {
                    field: "distill.record_kinds".to_string(),
                    value: config.record_kinds.join(", "),
                    expected: format!("literal record kind names ({e})"),
                })
            })?;
        let dispatcher = Dispatcher::new(
            config.log2log.clone(),
            config.log2tbl.clone(),
            config.latex.clone(),
            root.clone(),
            runner,
        );
        tracing::debug!(
            root = %root.display(),
            cache = %config.cache_policy,
            parallel = config.parallel,
            dry_run = config.dry_run,
            "Workspace ready"
        );
        Ok(Self {
            cache: config.cache_policy.into_cache(),
            root,
            config,
            dispatcher,
            rewriter,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    // -------------------------------------------------------------------------
    // normalize
    // -------------------------------------------------------------------------

    /// Normalise and pickle every raw log in `dir` in the given format.
    pub fn normalize_dir(&self, dir: &Path, variant: FormatVariant) -> Result<RunSummary> {
        let dir = self.path(dir);
        let raws = discovery::discover_raw_logs(&dir)?;
        tracing::info!(dir = %dir.display(), logs = raws.len(), ?variant, "Normalising logs");

        let summary = self.for_each(&raws, |raw| {
            self.normalize_chain(raw, variant).map(|(_, s)| s)
        })?;
        tracing::info!(%summary, "Normalisation complete");
        Ok(summary)
    }

    /// `X -> X.norm -> X.pkl`. Returns the pickle path.
    fn normalize_chain(
        &self,
        input: &Path,
        variant: FormatVariant,
    ) -> std::result::Result<(PathBuf, RunSummary), DispatchError> {
        let mut summary = RunSummary::default();

        let norm = model::norm_path(input);
        if self.cache.needs_stage(input, &norm) {
            self.dispatcher.normalize(variant, &norm, input)?;
            summary.executed += 1;
        } else {
            tracing::debug!(output = %norm.display(), "Normalised log is current");
            summary.skipped += 1;
        }

        let pkl = model::pickle_path(&norm);
        if self.cache.needs_stage(&norm, &pkl) {
            self.dispatcher.pickle(variant, &pkl, &norm)?;
            summary.executed += 1;
        } else {
            tracing::debug!(output = %pkl.display(), "Pickle is current");
            summary.skipped += 1;
        }
        Ok((pkl, summary))
    }

    /// Run `step` for every item, sequentially or on the rayon pool. Either
    /// way the first error is returned and the caller proceeds no further.
    fn for_each<T, F>(&self, items: &[T], step: F) -> Result<RunSummary>
    where
        T: Sync,
        F: Fn(&T) -> std::result::Result<RunSummary, DispatchError> + Sync,
    {
        let results: std::result::Result<Vec<RunSummary>, DispatchError> = if self.config.parallel
        {
            items.par_iter().map(&step).collect()
        } else {
            items.iter().map(&step).collect()
        };
        let mut total = RunSummary::default();
        for s in results? {
            total += s;
        }
        Ok(total)
    }

    // -------------------------------------------------------------------------
    // Aggregation and tables
    // -------------------------------------------------------------------------

    /// Sum `inputs` into `output` if the output is not current.
    ///
    /// Returns whether `output` is available for tables afterwards: it
    /// exists, or was produced (or planned, in a dry run) by this call.
    fn sum_stage(
        &self,
        variant: FormatVariant,
        output: &Path,
        inputs: &[PathBuf],
        summary: &mut RunSummary,
    ) -> Result<bool> {
        if inputs.is_empty() {
            tracing::debug!(output = %output.display(), "No inputs to sum");
            return Ok(output.exists());
        }
        // log2log refuses to sum fewer than two logs.
        if inputs.len() < constants::MIN_SUM_INPUTS {
            tracing::warn!(
                output = %output.display(),
                input = %inputs[0].display(),
                "A sum needs at least {} logs; skipping",
                constants::MIN_SUM_INPUTS
            );
            return Ok(output.exists());
        }
        if inputs.iter().any(|i| self.cache.needs_stage(i, output)) {
            tracing::info!(output = %output.display(), inputs = inputs.len(), "Summing logs");
            self.dispatcher.sum(variant, output, inputs)?;
            summary.executed += 1;
        } else {
            tracing::debug!(output = %output.display(), "Sum is current");
            summary.skipped += 1;
        }
        Ok(true)
    }

    fn render(&self, table: &ReportTable, summary: &mut RunSummary) -> Result<()> {
        self.dispatcher.table(table)?;
        summary.tables += 1;
        Ok(())
    }

    /// Expected pickles of the raw logs of `groups` in `dir`, in group order.
    fn group_pickles(&self, dir: &Path, groups: &[VendorGroup]) -> Result<Vec<PathBuf>> {
        Ok(discovery::discover_groups(dir, groups, constants::RAW_SUFFIX)?
            .iter()
            .map(|raw| model::pickle_path(&model::norm_path(raw)))
            .collect())
    }

    // -------------------------------------------------------------------------
    // process
    // -------------------------------------------------------------------------

    /// Full-results pipeline: normalise, sum the vendor groups into
    /// `sum.pkl`, and render each report kind unfiltered and positive-only.
    pub fn process(&self, dir: &Path) -> Result<RunSummary> {
        let mut summary = self.normalize_dir(dir, self.config.variant)?;

        let results = self.path(dir);
        let inputs = self.group_pickles(&results, &self.config.sum_groups())?;
        let sum = self.path(constants::SUM_FILE);
        if !self.sum_stage(self.config.variant, &sum, &inputs, &mut summary)? {
            tracing::info!("Nothing to tabulate");
            return Ok(summary);
        }

        for kind in TableKind::REPORT_KINDS {
            for positive in [false, true] {
                let name = if positive {
                    format!("{kind}-pos.html")
                } else {
                    format!("{kind}.html")
                };
                let table = ReportTable::new(kind, vec![sum.clone()])
                    .positive_only(positive)
                    .output(self.path(name));
                self.render(&table, &mut summary)?;
            }
        }

        tracing::info!(%summary, "Full-results pipeline complete");
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // process-dis
    // -------------------------------------------------------------------------

    /// Distilled-results pipeline. Each family is rewritten, normalised and
    /// pickled in its group's record format; incantation-format families
    /// are then reduced with `best`. The PTX and OpenCL family sets are
    /// summed and tabulated separately.
    pub fn process_distilled(&self, dir: &Path, entries_dir: Option<&str>) -> Result<RunSummary> {
        let results = self.path(dir);

        // A log claimed by an earlier family set is not run again.
        let mut claimed: Vec<PathBuf> = Vec::new();
        let mut family_sets = Vec::new();
        for (groups, sum_name, table_name) in [
            (
                self.config.ptx_groups(),
                constants::SUM_DIS_PTX_FILE,
                constants::DIS_PTX_TABLE,
            ),
            (
                self.config.opencl_groups(),
                constants::SUM_DIS_OPENCL_FILE,
                constants::DIS_OPENCL_TABLE,
            ),
        ] {
            let mut members: Vec<(PathBuf, FormatVariant)> = Vec::new();
            for group in &groups {
                let before = members.len();
                for raw in discovery::discover(&results, &group.raw_patterns())? {
                    if !claimed.contains(&raw) {
                        claimed.push(raw.clone());
                        members.push((raw, group.variant));
                    }
                }
                tracing::debug!(
                    group = %group.name,
                    variant = ?group.variant,
                    logs = members.len() - before,
                    "Distilled family"
                );
            }
            family_sets.push((members, sum_name, table_name));
        }
        tracing::info!(
            dir = %results.display(),
            ptx = family_sets[0].0.len(),
            opencl = family_sets[1].0.len(),
            "Processing distilled logs"
        );

        let mut summary = RunSummary::default();
        for (members, _, _) in &family_sets {
            summary += self.for_each(members, |(raw, variant)| self.distill_chain(raw, *variant))?;
        }

        let entries = entries_dir.unwrap_or(&self.config.entries_dir);
        // Best-selection emits plain logs, so both sums use the default format.
        for (members, sum_name, table_name) in &family_sets {
            let inputs: Vec<PathBuf> = members
                .iter()
                .map(|(raw, variant)| distill_output(raw, *variant))
                .collect();
            let sum = self.path(sum_name);
            if self.sum_stage(FormatVariant::Default, &sum, &inputs, &mut summary)? {
                let table = ReportTable::new(TableKind::Flat, vec![sum])
                    .output(self.path(table_name))
                    .entries_dir(entries);
                self.render(&table, &mut summary)?;
            }
        }

        tracing::info!(%summary, "Distilled-results pipeline complete");
        Ok(summary)
    }

    /// `X.txt -> X.sed -> X.sed.norm -> X.sed.pkl`, then `-> X.best.pkl`
    /// for incantation-format logs.
    fn distill_chain(
        &self,
        raw: &Path,
        variant: FormatVariant,
    ) -> std::result::Result<RunSummary, DispatchError> {
        let mut summary = RunSummary::default();

        let sed = model::rewrite_path(raw);
        if self.cache.needs_stage(raw, &sed) {
            self.rewrite(raw, &sed)?;
            summary.executed += 1;
        } else {
            summary.skipped += 1;
        }

        let (pkl, s) = self.normalize_chain(&sed, variant)?;
        summary += s;
        if variant != FormatVariant::Incantations {
            return Ok(summary);
        }

        let best_pkl = model::best_path(&pkl);
        if self.cache.needs_stage(&pkl, &best_pkl) {
            self.dispatcher.best(&best_pkl, &pkl)?;
            summary.executed += 1;
        } else {
            tracing::debug!(output = %best_pkl.display(), "Best-selected log is current");
            summary.skipped += 1;
        }
        Ok(summary)
    }

    /// The in-process rewrite stage.
    fn rewrite(&self, raw: &Path, sed: &Path) -> std::result::Result<(), DispatchError> {
        if self.config.dry_run {
            println!("# rewrite {} > {}", raw.display(), sed.display());
            return Ok(());
        }
        tracing::info!(input = %raw.display(), output = %sed.display(), "Rewriting test names");
        self.rewriter
            .rewrite_file(raw, sed)
            .map(|_| ())
            .map_err(|source| DispatchError::Io {
                stage: "rewrite",
                path: raw.to_path_buf(),
                source,
            })
    }

    // -------------------------------------------------------------------------
    // process-inc
    // -------------------------------------------------------------------------

    /// Incantation pipeline: normalise in the incantation format, then
    /// render one table per pickle.
    pub fn process_incantations(&self, kind: IncKind, dir: &Path) -> Result<RunSummary> {
        let mut summary = self.normalize_dir(dir, FormatVariant::Incantations)?;

        let results = self.path(dir);
        // Plain pickles only; best-selected logs are not incantation input.
        let mut pickles: Vec<PathBuf> = discovery::discover(
            &results,
            &[format!("*{}", constants::PICKLE_SUFFIX)],
        )?
        .into_iter()
        .filter_map(|p| LogFile::from_path(&p))
        .filter(|f| f.stage == Stage::Pickled)
        .map(|f| {
            tracing::trace!(log = %f.base_name(), modified = ?f.modified, "Existing pickle");
            f.path
        })
        .collect();
        // Pickles planned but not yet on disk (dry run).
        for raw in discovery::discover_raw_logs(&results)? {
            let pkl = model::pickle_path(&model::norm_path(&raw));
            if !pickles.contains(&pkl) {
                pickles.push(pkl);
            }
        }
        pickles.sort();

        let table_kind = kind.table_kind();
        for pkl in &pickles {
            let base = model::table_base(pkl);
            tracing::debug!(
                input = %pkl.display(),
                output = %format!("{}-*.{}", base.display(), kind.extension()),
                "Rendering incantation table"
            );
            let table = ReportTable::new(table_kind, vec![pkl.clone()]).output(base);
            self.render(&table, &mut summary)?;
        }

        tracing::info!(%summary, kind = table_kind.as_str(), "Incantation pipeline complete");
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // gather
    // -------------------------------------------------------------------------

    /// Gather every other `.tex` file in the root into `output`, optionally
    /// compiling the result. Returns the output path.
    pub fn gather(&self, output: &Path, build: bool) -> Result<PathBuf> {
        let out = self.path(output);
        let inputs = discovery::discover_tex(&self.root, &out)?;
        let doc = gather::gather_document(&inputs);

        if self.config.dry_run {
            println!("# gather {} table(s) > {}", inputs.len(), out.display());
        } else {
            std::fs::write(&out, doc).map_err(|e| LitmusError::io(&out, "gather", e))?;
            tracing::info!(output = %out.display(), tables = inputs.len(), "Gathered TeX tables");
        }

        if build {
            self.dispatcher.latex(&out)?;
        }
        Ok(out)
    }
}

/// Final per-file artifact of a distilled log: the best-selected log for
/// incantation-format families, the pickle otherwise.
fn distill_output(raw: &Path, variant: FormatVariant) -> PathBuf {
    let pkl = model::pickle_path(&model::norm_path(&model::rewrite_path(raw)));
    match variant {
        FormatVariant::Incantations => model::best_path(&pkl),
        FormatVariant::Default => pkl,
    }
}

/// Anchor a relative root at the current directory. Tool arguments are
/// joined onto the root and tools also run inside it, so a relative root
/// would be applied twice.
fn absolute_root(root: PathBuf) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(root);
    }
    let cwd = std::env::current_dir().map_err(|e| LitmusError::io(&root, "resolve root", e))?;
    Ok(cwd.join(root))
}

// =============================================================================
// Tests
// =============================================================================
