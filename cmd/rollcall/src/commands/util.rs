//! Utility functions for CLI commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use tracing::debug;

use rollcall_attendance::{AttendanceService, Config, PrecomputedExtractor, WarmupReport};
use rollcall_faceindex::{FileStorage, IndexRegistry};
use rollcall_roster::{AttendanceLog, RedbRoster, StudentStore};

use crate::Cli;

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    Ok(Config::load(cli.config.as_deref().map(Path::new))?)
}

/// Opens the stores under the configured data directory and prepares every
/// course index.
pub fn open_service(cli: &Cli) -> anyhow::Result<(AttendanceService, Vec<WarmupReport>)> {
    let cfg = get_config(cli)?;
    print_verbose(cli, &format!("Using config: {}", cfg.path().display()));
    print_verbose(cli, &format!("Data directory: {}", cfg.data_dir.display()));

    let db_path = cfg.database_path();
    let roster = Arc::new(
        RedbRoster::open(&db_path)
            .with_context(|| format!("open roster database {}", db_path.display()))?,
    );
    let registry = Arc::new(IndexRegistry::new(
        cfg.registry_config(),
        Arc::new(FileStorage::new(cfg.index_dir())),
    ));
    let extractor = Arc::new(PrecomputedExtractor::new(cfg.embedding_dim));

    let service = AttendanceService::new(
        cfg,
        Arc::clone(&roster) as Arc<dyn StudentStore>,
        roster as Arc<dyn AttendanceLog>,
        registry,
        extractor,
    );
    let reports = service.init();
    debug!(courses = reports.len(), "service ready");
    Ok((service, reports))
}

/// Reads an image (embedding) file.
pub fn read_image(path: &str) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read image {path}"))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, as_json: bool) -> anyhow::Result<()> {
    let output = if as_json {
        serde_json::to_string_pretty(result)? + "\n"
    } else {
        serde_yaml::to_string(result)?
    };
    print!("{}", output);
    Ok(())
}

/// Prints verbose message if verbose mode is enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}
