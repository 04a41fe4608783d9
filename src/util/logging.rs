// LitmusLog - util/logging.rs
//
// Structured logging with runtime-selectable debug mode.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [logging] level = "debug"
//
// Output: stderr only. Stdout is reserved for dry-run command listings.

use super::constants;
use tracing_subscriber::EnvFilter;

/// Where the active filter directive came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Env,
    Level(String),
}

/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
fn directive(env_set: bool, debug_flag: bool, config_level: Option<&str>) -> Directive {
    if env_set {
        Directive::Env
    } else if debug_flag {
        Directive::Level("debug".to_string())
    } else {
        Directive::Level(
            config_level
                .unwrap_or(constants::DEFAULT_LOG_LEVEL)
                .to_string(),
        )
    }
}

/// Initialise the logging subsystem. Safe to call more than once; later
/// calls are ignored.
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = match directive(
        std::env::var_os("RUST_LOG").is_some(),
        debug_flag,
        config_level,
    ) {
        Directive::Env => EnvFilter::from_default_env(),
        Directive::Level(level) => EnvFilter::new(level),
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug_flag)
        .with_file(debug_flag)
        .with_line_number(debug_flag)
        .compact()
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            app = constants::APP_NAME,
            version = constants::APP_VERSION,
            "Logging initialised"
        );
    }
}
