//! CLI command dispatch: `init`, `start`, `save`, `load`.
//!
//! A collaborator, not part of the storage engine (spec.md §1): it parses
//! arguments, loads configuration, opens an [`crate::engine::Engine`], and
//! hands off to the HTTP adapter or a one-shot snapshot operation.

pub mod args;
pub mod errors;

pub use args::{Cli, Command};
pub use errors::{CliError, CliResult};

use std::path::Path;

use crate::config::AppConfig;
use crate::engine::Engine;
use crate::http_server::HttpServer;
use crate::observability::Logger;

/// Dispatches a parsed [`Command`] to its handler.
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Init { config } => init(&config),
        Command::Start { config } => start(&config),
        Command::Save { config, to } => save(&config, &to),
        Command::Load { config, from } => load(&config, &from),
    }
}

/// Scaffolds a starter config file at `path`. Fails if one already exists,
/// so a second `init` never clobbers an operator's tuned settings.
fn init(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::already_initialized());
    }
    AppConfig::default().save(path)?;
    Logger::info("CLI_INIT", &[("config", &path.display().to_string())]);
    Ok(())
}

fn load_config(path: &Path) -> CliResult<AppConfig> {
    if !path.exists() {
        return Err(CliError::new(
            errors::CliErrorCode::NotInitialized,
            format!("no config file at {}; run `ledgerdb init` first", path.display()),
        ));
    }
    Ok(AppConfig::load(path)?)
}

/// Recovers from the latest checkpoint plus WAL tail, starts the background
/// checkpoint worker, and serves HTTP until the process is interrupted.
fn start(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(config.engine)?;
    engine.start_background_workers();

    let runtime = tokio::runtime::Runtime::new().map_err(|e| {
        CliError::new(errors::CliErrorCode::EngineError, format!("failed to start async runtime: {e}"))
    })?;
    let server = HttpServer::new(engine.clone(), config.http);

    let result = runtime.block_on(server.start());
    engine.stop_background_workers();
    result.map_err(|e| CliError::new(errors::CliErrorCode::EngineError, format!("http server error: {e}")))
}

/// Boots the engine (recovering current state), writes a checkpoint snapshot
/// to `to`, and exits without serving.
fn save(config_path: &Path, to: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(config.engine)?;
    engine.save_to_file(to)?;
    Logger::info("CLI_SAVE", &[("path", &to.display().to_string())]);
    Ok(())
}

/// Boots the engine, replaces its state with the snapshot at `from`, writes
/// that state back out as the engine's own checkpoint, and exits.
fn load(config_path: &Path, from: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let engine = Engine::open(config.engine)?;
    engine.load_from_file(from)?;
    engine.stop_background_workers();
    Logger::info("CLI_LOAD", &[("path", &from.display().to_string())]);
    Ok(())
}
