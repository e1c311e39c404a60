//! Command-line settings of the task server and the optional seed file.
//!
//! Every setting is a clap flag with an environment fallback. The seed file
//! is a JSON object mapping user ids to task lists; it is read once at
//! startup to prefill the repository.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use taskpad_proto::task::Task;

/// Address used when neither `--bind` nor `TASKPAD_SERVER_ADDR` is set.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Tasks to preload, keyed by user id.
pub type Seed = HashMap<String, Vec<Task>>;

/// Errors raised while reading the seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// The file could not be read.
    #[error("failed to read seed file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a user-to-tasks JSON object.
    #[error("seed file {path} is malformed: {source}")]
    Parse {
        /// Path that was read.
        path: PathBuf,
        /// Underlying decode error.
        source: serde_json::Error,
    },
}

/// Settings of the task server.
#[derive(clap::Parser, Debug, Clone)]
#[command(version, about = "Taskpad task server")]
pub struct ServerArgs {
    /// Address to listen on.
    #[arg(short, long, env = "TASKPAD_SERVER_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// JSON file of tasks per user to load at startup.
    #[arg(long, env = "TASKPAD_SERVER_SEED")]
    pub seed: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[arg(long, env = "TASKPAD_SERVER_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerArgs {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR.to_string(),
            seed: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerArgs {
    /// Reads the seed file, or returns an empty seed when none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] if the configured file cannot be read or decoded.
    pub fn load_seed(&self) -> Result<Seed, SeedError> {
        self.seed.as_deref().map_or_else(|| Ok(Seed::new()), read_seed)
    }
}

/// Reads and decodes the seed file at `path`.
///
/// # Errors
///
/// Returns [`SeedError`] if the file cannot be read or decoded.
pub fn read_seed(path: &Path) -> Result<Seed, SeedError> {
    let contents = std::fs::read(path).map_err(|source| SeedError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&contents).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
