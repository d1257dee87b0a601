use std::path::PathBuf;

use haulvoice_core::config::{AppConfig, LoadOptions, LogFormat};

use crate::commands::CommandResult;
use crate::session;

pub fn run(
    role: Option<String>,
    email: Option<String>,
    config_path: Option<PathBuf>,
) -> CommandResult {
    // Fatal misconfiguration is surfaced once, before any interactive work.
    let config = match AppConfig::load(LoadOptions {
        config_path,
        require_file: false,
        overrides: Default::default(),
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "start",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "start",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(session::run(config, role, email)) {
        Ok(()) => CommandResult::success("start", "session ended"),
        Err(error) => CommandResult::failure("start", "session", error.to_string(), 4),
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    let init_result = match config.logging.format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .compact()
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .pretty()
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_target(false)
            .with_max_level(log_level)
            .json()
            .try_init(),
    };

    if init_result.is_err() {
        tracing::debug!("logging already initialized");
    }
}
