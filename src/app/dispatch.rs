// LitmusLog - app/dispatch.rs
//
// External invocation dispatcher.
//
// Every pipeline operation becomes one `Invocation`: a program, positional
// arguments in the order the log-analysis tools expect, the working
// directory, and the files the operation is expected to write. Invocations
// are executed through a `CommandRunner`, so drivers can be run for real,
// printed (dry run), or recorded in tests without changing driver code.
//
// Failure of any invocation is returned as `DispatchError` and propagated
// by the drivers with `?`, which aborts the rest of the run.

use crate::core::model::{FormatVariant, ReportTable};
use crate::util::constants;
use crate::util::error::DispatchError;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// =============================================================================
// Invocation
// =============================================================================

/// One external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Operation label for logs ("normalize", "sum", "table:flat", ...).
    pub operation: String,
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
    /// Files the operation is expected to create.
    pub outputs: Vec<PathBuf>,
}

impl Invocation {
    /// All arguments as lossy strings, for assertions and display.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(&arg.to_string_lossy()))?;
        }
        Ok(())
    }
}

/// Single-quote an argument for display if it contains shell-special
/// characters. Display only; commands are never run through a shell.
fn quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:+,@".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

// =============================================================================
// Runners
// =============================================================================

/// Executes invocations.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<(), DispatchError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, invocation: &Invocation) -> Result<(), DispatchError> {
        (**self).run(invocation)
    }
}

/// Runs each invocation as a child process with inherited stdio and waits
/// for it to exit.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), DispatchError> {
        let status = std::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .status()
            .map_err(|source| DispatchError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DispatchError::Failed {
                command: invocation.to_string(),
                code: status.code(),
            })
        }
    }
}

/// Prints each invocation to stdout instead of running it.
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), DispatchError> {
        println!("{invocation}");
        Ok(())
    }
}

/// Records invocations and optionally creates their expected outputs,
/// standing in for the real tools. Used by tests and by embedding callers
/// that want to inspect a plan.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    log: Mutex<Vec<Invocation>>,
    materialize: bool,
    fail_on: Option<String>,
}

impl RecordingRunner {
    /// Record only; create no files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and create each invocation's outputs as empty files, as the
    /// real tools would.
    pub fn materializing() -> Self {
        Self {
            materialize: true,
            ..Self::default()
        }
    }

    /// Fail (exit status 1) on the first invocation whose display form
    /// contains `needle`. The failing invocation is still recorded.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Everything run so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Operation labels run so far, in order.
    pub fn operations(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.operation).collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), DispatchError> {
        if let Ok(mut log) = self.log.lock() {
            log.push(invocation.clone());
        }
        if let Some(ref needle) = self.fail_on {
            if invocation.to_string().contains(needle.as_str()) {
                return Err(DispatchError::Failed {
                    command: invocation.to_string(),
                    code: Some(1),
                });
            }
        }
        if self.materialize {
            for out in &invocation.outputs {
                let path = if out.is_absolute() {
                    out.clone()
                } else {
                    invocation.cwd.join(out)
                };
                std::fs::write(&path, b"").map_err(|source| DispatchError::Io {
                    stage: "materialize",
                    path,
                    source,
                })?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Builds tool invocations and hands them to a runner.
pub struct Dispatcher {
    log2log: Vec<String>,
    log2tbl: Vec<String>,
    latex: Vec<String>,
    cwd: PathBuf,
    runner: Box<dyn CommandRunner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("log2log", &self.log2log)
            .field("log2tbl", &self.log2tbl)
            .field("latex", &self.latex)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        log2log: Vec<String>,
        log2tbl: Vec<String>,
        latex: Vec<String>,
        cwd: PathBuf,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            log2log,
            log2tbl,
            latex,
            cwd,
            runner,
        }
    }

    /// `log2log normalize [-i] <output> <input>`
    pub fn normalize(
        &self,
        variant: FormatVariant,
        output: &Path,
        input: &Path,
    ) -> Result<(), DispatchError> {
        self.log2log_op("normalize", variant, output, &[input])
    }

    /// `log2log pickle [-i] <output> <input>`
    pub fn pickle(
        &self,
        variant: FormatVariant,
        output: &Path,
        input: &Path,
    ) -> Result<(), DispatchError> {
        self.log2log_op("pickle", variant, output, &[input])
    }

    /// `log2log sum [-i] <output> <inputs...>`
    pub fn sum(
        &self,
        variant: FormatVariant,
        output: &Path,
        inputs: &[PathBuf],
    ) -> Result<(), DispatchError> {
        let inputs: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
        self.log2log_op("sum", variant, output, &inputs)
    }

    /// `log2log best -i <output> <input>`. Best-selection always reads
    /// incantation logs and writes a plain log.
    pub fn best(&self, output: &Path, input: &Path) -> Result<(), DispatchError> {
        self.log2log_op("best", FormatVariant::Incantations, output, &[input])
    }

    /// `log2tbl <kind> [-p] [-o <output>] [-d <entries>] <inputs...>`
    pub fn table(&self, table: &ReportTable) -> Result<(), DispatchError> {
        let mut args: Vec<OsString> = vec![table.kind.as_str().into()];
        if table.positive_only {
            args.push(constants::POSITIVE_FLAG.into());
        }
        if let Some(ref out) = table.output {
            args.push("-o".into());
            args.push(out.as_os_str().to_owned());
        }
        if let Some(ref dir) = table.entries_dir {
            if table.kind.takes_entries_dir() {
                args.push("-d".into());
                args.push(dir.as_os_str().to_owned());
            } else {
                tracing::warn!(kind = %table.kind, "Table kind takes no entries directory; ignoring -d");
            }
        }
        args.extend(table.inputs.iter().map(|p| p.as_os_str().to_owned()));

        // Incantation kinds treat -o as a basename and add their own suffixes.
        let outputs = match table.output {
            Some(ref out) if !table.kind.is_incantation() => vec![out.clone()],
            _ => Vec::new(),
        };
        self.dispatch(
            format!("table:{}", table.kind),
            "log2tbl",
            &self.log2tbl,
            args,
            outputs,
        )
    }

    /// Run the configured LaTeX command on `tex`.
    pub fn latex(&self, tex: &Path) -> Result<(), DispatchError> {
        let outputs = vec![tex.with_extension("pdf")];
        self.dispatch(
            "latex".to_string(),
            "latex",
            &self.latex,
            vec![tex.as_os_str().to_owned()],
            outputs,
        )
    }

    fn log2log_op(
        &self,
        op: &'static str,
        variant: FormatVariant,
        output: &Path,
        inputs: &[&Path],
    ) -> Result<(), DispatchError> {
        let mut args: Vec<OsString> = vec![op.into()];
        if let Some(flag) = variant.flag() {
            args.push(flag.into());
        }
        args.push(output.as_os_str().to_owned());
        args.extend(inputs.iter().map(|p| p.as_os_str().to_owned()));
        self.dispatch(
            op.to_string(),
            "log2log",
            &self.log2log,
            args,
            vec![output.to_path_buf()],
        )
    }

    fn dispatch(
        &self,
        operation: String,
        tool: &'static str,
        prefix: &[String],
        args: Vec<OsString>,
        outputs: Vec<PathBuf>,
    ) -> Result<(), DispatchError> {
        let (program, lead) = prefix
            .split_first()
            .ok_or(DispatchError::EmptyCommand { tool })?;
        let mut all_args: Vec<OsString> = lead.iter().map(OsString::from).collect();
        all_args.extend(args);

        let invocation = Invocation {
            operation,
            program: program.clone(),
            args: all_args,
            cwd: self.cwd.clone(),
            outputs,
        };
        tracing::info!(
            operation = %invocation.operation,
            command = %invocation,
            "Running stage"
        );
        self.runner.run(&invocation).map_err(|e| {
            tracing::error!(operation = %invocation.operation, error = %e, "Stage failed");
            e
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TableKind;

    fn dispatcher() -> (Dispatcher, Arc<RecordingRunner>) {
        let rec = Arc::new(RecordingRunner::new());
        let d = Dispatcher::new(
            vec!["python3".into(), "log2log.py".into()],
            vec!["log2tbl.py".into()],
            vec!["pdflatex".into()],
            PathBuf::from("/work"),
            Box::new(Arc::clone(&rec)),
        );
        (d, rec)
    }

    #[test]
    fn test_normalize_argument_order() {
        let (d, rec) = dispatcher();
        d.normalize(
            FormatVariant::Incantations,
            Path::new("r/a.txt.norm"),
            Path::new("r/a.txt"),
        )
        .unwrap();
        let inv = &rec.invocations()[0];
        assert_eq!(inv.program, "python3");
        assert_eq!(
            inv.arg_strings(),
            vec!["log2log.py", "normalize", "-i", "r/a.txt.norm", "r/a.txt"]
        );
        assert_eq!(inv.cwd, PathBuf::from("/work"));
        assert_eq!(inv.outputs, vec![PathBuf::from("r/a.txt.norm")]);
    }

    #[test]
    fn test_default_variant_has_no_flag() {
        let (d, rec) = dispatcher();
        d.sum(
            FormatVariant::Default,
            Path::new("sum.pkl"),
            &[PathBuf::from("a.pkl"), PathBuf::from("b.pkl")],
        )
        .unwrap();
        assert_eq!(
            rec.invocations()[0].arg_strings(),
            vec!["log2log.py", "sum", "sum.pkl", "a.pkl", "b.pkl"]
        );
    }

    #[test]
    fn test_best_always_uses_incantation_flag() {
        let (d, rec) = dispatcher();
        d.best(Path::new("a.best.pkl"), Path::new("a.sed.pkl")).unwrap();
        assert_eq!(
            rec.invocations()[0].arg_strings(),
            vec!["log2log.py", "best", "-i", "a.best.pkl", "a.sed.pkl"]
        );
    }

    #[test]
    fn test_table_arguments() {
        let (d, rec) = dispatcher();
        let table = ReportTable::new(TableKind::TwoLevel, vec![PathBuf::from("sum.pkl")])
            .positive_only(true)
            .output("two-level-pos.html")
            .entries_dir("entries");
        d.table(&table).unwrap();
        let inv = &rec.invocations()[0];
        assert_eq!(inv.program, "log2tbl.py");
        assert_eq!(
            inv.arg_strings(),
            vec!["two-level", "-p", "-o", "two-level-pos.html", "-d", "entries", "sum.pkl"]
        );
        assert_eq!(inv.operation, "table:two-level");
    }

    #[test]
    fn test_entries_dir_dropped_for_plain_incantation_kinds() {
        let (d, rec) = dispatcher();
        let table = ReportTable::new(TableKind::IncantationsFlat, vec![PathBuf::from("sum.pkl")])
            .entries_dir("entries");
        d.table(&table).unwrap();
        assert_eq!(
            rec.invocations()[0].arg_strings(),
            vec!["incantations-flat", "sum.pkl"]
        );
    }

    #[test]
    fn test_incantation_table_output_is_a_basename() {
        let (d, rec) = dispatcher();
        let table = ReportTable::new(TableKind::IncantationsFlat, vec![PathBuf::from("r/x.txt.pkl")])
            .output("r/x");
        d.table(&table).unwrap();
        assert!(rec.invocations()[0].outputs.is_empty());
    }

    #[test]
    fn test_empty_command_is_error() {
        let d = Dispatcher::new(
            Vec::new(),
            vec!["log2tbl.py".into()],
            vec!["pdflatex".into()],
            PathBuf::from("."),
            Box::new(RecordingRunner::new()),
        );
        let err = d
            .pickle(FormatVariant::Default, Path::new("a.pkl"), Path::new("a.norm"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::EmptyCommand { tool: "log2log" }));
    }

    #[test]
    fn test_recording_runner_failure() {
        let rec = RecordingRunner::new().failing_on(" sum ");
        let d = Dispatcher::new(
            vec!["log2log.py".into()],
            vec!["log2tbl.py".into()],
            vec!["pdflatex".into()],
            PathBuf::from("."),
            Box::new(rec),
        );
        let err = d
            .sum(FormatVariant::Default, Path::new("sum.pkl"), &[PathBuf::from("a.pkl")])
            .unwrap_err();
        assert!(matches!(err, DispatchError::Failed { code: Some(1), .. }));
    }

    #[test]
    fn test_process_runner_reports_spawn_failure() {
        let inv = Invocation {
            operation: "normalize".into(),
            program: "/nonexistent/litmuslog-tool".into(),
            args: Vec::new(),
            cwd: std::env::temp_dir(),
            outputs: Vec::new(),
        };
        let err = ProcessRunner.run(&inv).unwrap_err();
        assert!(matches!(err, DispatchError::Spawn { .. }));
    }

    #[test]
    fn test_display_quotes_special_arguments() {
        let inv = Invocation {
            operation: "pickle".into(),
            program: "log2log.py".into(),
            args: vec!["pickle".into(), "my results/a.pkl".into(), "it's".into()],
            cwd: PathBuf::from("."),
            outputs: Vec::new(),
        };
        assert_eq!(
            inv.to_string(),
            r"log2log.py pickle 'my results/a.pkl' 'it'\''s'"
        );
    }
}
