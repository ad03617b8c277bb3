//! Logging bootstrap for the rendezvous binaries.
//!
//! Libraries in this workspace only use the [`log`] facade. A binary calls
//! [`init`] once at startup to install a `free_log_client` layer that prints
//! to the console and, optionally, to a log file.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};

use free_log_client::FreeLogLayer;
use thiserror::Error;

pub use free_log_client;
pub use log;

#[cfg(feature = "macros")]
mod macros;

#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: &str = "rendezvous=trace";
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: &str = "rendezvous=info";

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Logs(#[from] free_log_client::LogsInitError),
    #[error(transparent)]
    BuildLogsConfig(#[from] free_log_client::BuildLogsConfigError),
    #[error(transparent)]
    BuildFileWriterConfig(#[from] free_log_client::BuildFileWriterConfigError),
    #[error("Failed to create log directory {path:?}: {source}")]
    CreateLogDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Installs the global logger.
///
/// When `filename` is given and `RENDEZVOUS_LOG_DIR` is set, debug-level logs
/// are also written to `$RENDEZVOUS_LOG_DIR/<filename>`.
///
/// # Errors
///
/// * If the log directory cannot be created
/// * If the `free_log_client` configuration is invalid
/// * If a global logger was already installed
pub fn init(filename: Option<&str>) -> Result<FreeLogLayer, InitError> {
    let env = |name: &str| std::env::var(name).ok();

    let mut logs_config = free_log_client::LogsConfig::builder();

    if let Some(path) = filename.and_then(|filename| log_file_path(env, filename)) {
        if let Some(log_dir) = path.parent() {
            create_log_dir(log_dir)?;
        }
        logs_config = logs_config.with_file_writer(
            free_log_client::FileWriterConfig::builder()
                .file_path(path)
                .log_level(free_log_client::Level::Debug),
        )?;
    }

    let layer = free_log_client::init(logs_config.env_filter(log_filter(env).as_str()))?;

    Ok(layer)
}

fn create_log_dir(log_dir: &Path) -> Result<(), InitError> {
    std::fs::create_dir_all(log_dir).map_err(|source| InitError::CreateLogDir {
        path: log_dir.to_path_buf(),
        source,
    })
}

/// `RENDEZVOUS_LOG`, then `RUST_LOG`, then the build's default level.
fn log_filter(env: impl Fn(&str) -> Option<String>) -> String {
    env("RENDEZVOUS_LOG")
        .or_else(|| env("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

fn log_file_path(env: impl Fn(&str) -> Option<String>, filename: &str) -> Option<PathBuf> {
    let Some(log_dir) = env("RENDEZVOUS_LOG_DIR").filter(|dir| !dir.is_empty()) else {
        log::debug!("init: RENDEZVOUS_LOG_DIR not set, not writing {filename}");
        return None;
    };

    Some(PathBuf::from(log_dir).join(filename))
}
