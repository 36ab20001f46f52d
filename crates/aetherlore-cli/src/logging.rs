//! Logging setup
//!
//! Level comes from `AETHERLORE_LOG` (default `warn`). Output goes to the
//! configured log file, or to stderr when none is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use aetherlore_core::Config;

const LOG_ENV: &str = "AETHERLORE_LOG";
const DEFAULT_LEVEL: &str = "warn";

/// Install the global subscriber (ignored if one is already set)
pub fn init(config: &Config) {
    let level = std::env::var(LOG_ENV)
        .ok()
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    let Some(ref log_path) = config.log_file else {
        install(filter(&level), std::io::stderr, true);
        return;
    };

    match OpenOptions::new().create(true).append(true).open(log_path) {
        Ok(file) => {
            install(filter(&level), Mutex::new(file), false);
            info!("Logging to {:?}", log_path);
        }
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            install(filter(&level), std::io::stderr, true);
        }
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("aetherlore_core={0},aetherlore_cli={0}", level))
}

fn install<W>(filter: EnvFilter, writer: W, ansi: bool)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init();
}
