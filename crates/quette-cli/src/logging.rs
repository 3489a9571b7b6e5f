//! File logging for debugging

use std::fs::File;

use tracing::info;
use tracing_subscriber::EnvFilter;

use quette_core::Config;

/// Send `tracing` output to the log file when QUETTE_LOG is set
///
/// QUETTE_LOG holds the level (e.g. `debug`). Logging never goes to the
/// terminal so it can't interleave with command output.
pub fn init(config: &Config) {
    let Ok(log_level) = std::env::var("QUETTE_LOG") else {
        return;
    };

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::options().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "quette_core={},quette_cli={}",
        log_level, log_level
    ));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging to {:?}", log_path);
}
