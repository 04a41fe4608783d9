// LitmusLog - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading and CLI overrides
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to the pipeline drivers

use clap::{CommandFactory, Parser, Subcommand};
use litmuslog::app::{self, pipeline::Workspace};
use litmuslog::core::model::{FormatVariant, IncKind};
use litmuslog::core::stage::CachePolicy;
use litmuslog::platform::config::{self, PipelineConfig};
use litmuslog::util::{self, constants};
use litmuslog::util::error::{LitmusError, UsageError};
use std::path::PathBuf;
use std::process::ExitCode;

/// LitmusLog - drive litmus-test log normalisation and reporting.
///
/// Runs the external log2log/log2tbl tools over a directory of raw
/// litmus logs, skipping stages whose outputs already exist.
#[derive(Parser, Debug)]
#[command(name = "litmuslog", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'D', long = "debug", global = true)]
    debug: bool,

    /// Config file (defaults to the platform config directory).
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Base directory every path is resolved against.
    #[arg(long = "root", global = true, default_value = ".")]
    root: PathBuf,

    /// Print the commands instead of running them.
    #[arg(short = 'n', long = "dry-run", global = true)]
    dry_run: bool,

    /// Stage invalidation policy. `exists` rebuilds only missing outputs,
    /// so edited inputs are NOT picked up; `mtime` also rebuilds outputs
    /// older than their input.
    #[arg(long = "cache", global = true, value_enum)]
    cache: Option<CachePolicy>,

    /// Run per-file stages on this many threads.
    #[arg(short = 'j', long = "jobs", global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalise and pickle every raw log in a directory.
    Normalize {
        /// Use the incantation record format.
        #[arg(short = 'i')]
        incantations: bool,
        #[arg(default_value = constants::DEFAULT_RESULTS_DIR)]
        dir: PathBuf,
    },

    /// Normalise, sum the vendor groups and render every report table.
    Process {
        #[arg(default_value = constants::DEFAULT_RESULTS_DIR)]
        dir: PathBuf,
    },

    /// Process distilled logs into per-family sums and flat tables.
    ProcessDis {
        #[arg(default_value = constants::DEFAULT_DISTILL_DIR)]
        dir: PathBuf,
        /// Entries directory passed to the table renderer.
        #[arg(short = 'd')]
        entries: Option<String>,
    },

    /// Render incantation tables, one per log.
    ProcessInc {
        /// One of: flat, classified, html.
        kind: Option<String>,
        #[arg(default_value = constants::DEFAULT_INC_DIR)]
        dir: PathBuf,
    },

    /// Remove every derived artifact, keeping raw logs.
    Clean,

    /// Gather the TeX tables of the base directory into one document.
    Gather {
        #[arg(default_value = constants::DEFAULT_GATHER_OUTPUT)]
        output: PathBuf,
        /// Also compile the gathered document.
        #[arg(long)]
        build: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        // --help / --version
        Err(e) => e.exit(),
    };

    // Reject a bad incantation kind before anything touches the filesystem.
    let inc_kind = match &cli.command {
        Command::ProcessInc { kind, .. } => match parse_inc_kind(kind.as_deref()) {
            Ok(k) => Some(k),
            Err(e) => {
                eprintln!("error: {e}\n");
                let usage = Cli::command()
                    .find_subcommand_mut("process-inc")
                    .map(|c| c.render_usage().to_string())
                    .unwrap_or_default();
                eprintln!("{usage}");
                return ExitCode::FAILURE;
            }
        },
        _ => None,
    };

    let (config, warnings) = match resolve_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            util::logging::init(cli.debug, None);
            tracing::error!(error = %e, "Could not load configuration");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    util::logging::init(cli.debug, config.log_level.as_deref());
    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        root = %cli.root.display(),
        "{} starting",
        constants::APP_NAME
    );
    for w in &warnings {
        tracing::warn!(warning = %w, "Config warning");
    }

    match run(&cli, config, inc_kind) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_inc_kind(kind: Option<&str>) -> Result<IncKind, UsageError> {
    let kind = kind.ok_or(UsageError::MissingArgument { name: "kind" })?;
    IncKind::parse(kind).ok_or_else(|| UsageError::InvalidChoice {
        name: "kind",
        value: kind.to_string(),
        expected: IncKind::NAMES,
    })
}

/// Load the config file, then apply CLI overrides on top of it.
fn resolve_config(cli: &Cli) -> Result<(PipelineConfig, Vec<String>), LitmusError> {
    let (mut config, warnings) = match (&cli.config, config::default_config_path()) {
        (Some(path), _) => config::load_config(path, true)?,
        (None, Some(path)) => config::load_config(&path, false)?,
        (None, None) => (PipelineConfig::default(), Vec::new()),
    };

    config.dry_run |= cli.dry_run;
    if let Some(policy) = cli.cache {
        config.cache_policy = policy;
    }
    if let Some(jobs) = cli.jobs {
        config.parallel = jobs > 1;
        if config.parallel {
            if let Err(e) = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build_global()
            {
                tracing::warn!(error = %e, "Could not size the worker pool");
            }
        }
    }
    if let Command::Normalize { incantations, .. } = &cli.command {
        config.variant = FormatVariant::from_flag(*incantations);
    }
    Ok((config, warnings))
}

fn run(cli: &Cli, config: PipelineConfig, inc_kind: Option<IncKind>) -> Result<(), LitmusError> {
    if let Command::Clean = cli.command {
        let report = app::clean::clean(&cli.root, config.dry_run)?;
        if report.is_empty() {
            tracing::info!("Nothing to clean");
        }
        return Ok(());
    }

    let variant = config.variant;
    let ws = Workspace::open(&cli.root, config)?;
    match &cli.command {
        Command::Normalize { dir, .. } => {
            ws.normalize_dir(dir, variant)?;
        }
        Command::Process { dir } => {
            ws.process(dir)?;
        }
        Command::ProcessDis { dir, entries } => {
            ws.process_distilled(dir, entries.as_deref())?;
        }
        Command::ProcessInc { dir, .. } => {
            let kind = inc_kind.ok_or(UsageError::MissingArgument { name: "kind" })?;
            ws.process_incantations(kind, dir)?;
        }
        Command::Gather { output, build } => {
            ws.gather(output, *build)?;
        }
        Command::Clean => {}
    }
    Ok(())
}
