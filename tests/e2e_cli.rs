// LitmusLog - tests/e2e_cli.rs
//
// End-to-end tests for the `litmuslog` binary's exit codes.
//
// These run the built binary against an empty temporary root. Every case
// here must fail before any tool is spawned, so no log2log/log2tbl is
// needed on PATH.

use std::path::Path;
use std::process::{Command, Output};

// =============================================================================
// Helpers
// =============================================================================

fn litmuslog(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_litmuslog"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run litmuslog")
}

fn entries(root: &Path) -> usize {
    std::fs::read_dir(root).expect("read root").count()
}

// =============================================================================
// process-inc
// =============================================================================

/// An unknown incantation kind exits 1 with usage and creates nothing.
#[test]
fn e2e_unknown_inc_kind_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = litmuslog(dir.path(), &["process-inc", "pdf"]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("pdf"), "{stderr}");
    assert!(stderr.contains("process-inc"), "{stderr}");
    assert!(out.stdout.is_empty());
    assert_eq!(entries(dir.path()), 0);
}

/// A missing incantation kind is a usage error too.
#[test]
fn e2e_missing_inc_kind_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = litmuslog(dir.path(), &["process-inc"]);

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(entries(dir.path()), 0);
}

// =============================================================================
// clap usage
// =============================================================================

/// Unknown subcommands exit 1; --help exits 0.
#[test]
fn e2e_usage_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(litmuslog(dir.path(), &["frobnicate"]).status.code(), Some(1));
    assert_eq!(litmuslog(dir.path(), &["--help"]).status.code(), Some(0));
}
