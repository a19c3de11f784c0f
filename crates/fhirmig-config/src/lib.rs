//! # fhirmig-config
//!
//! Run configuration for the `fhirmig` CLI: an optional TOML file layered
//! under `FHIRMIG_`-prefixed environment variables, with the defaults the
//! migration team actually runs with (chunks of 1000, five workers).

use std::path::PathBuf;

use config::{Config, Environment, File};
use fhirmig_engine::Mode;
use serde::{Deserialize, Serialize};

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration for one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Records (or groups, for grouped input) per chunk.
    pub chunk_size: usize,
    /// Maximum chunks in flight.
    pub worker_count: usize,
    /// Create new records, or update ones that already exist.
    pub mode: Mode,
    /// Only show ignore and error output.
    pub quiet: bool,
    /// Directory holding input files and outcome logs.
    pub data_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            worker_count: 5,
            mode: Mode::Create,
            quiet: false,
            data_dir: PathBuf::from("data_migration"),
        }
    }
}

impl RunConfig {
    /// Loads configuration from an optional TOML file plus environment
    /// variable overrides (e.g. `FHIRMIG_WORKER_COUNT=10`).
    ///
    /// A missing file is not an error; defaults apply. An explicitly named
    /// file that does not exist is skipped the same way, matching how the
    /// server treats its optional config.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let pathbuf = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fhirmig.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }

        builder = builder.add_source(Environment::with_prefix("FHIRMIG").try_parsing(true));

        let cfg: RunConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values the engine would refuse anyway, before any work runs.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::validation("chunk_size must be at least 1"));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::validation("worker_count must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.chunk_size, 1000);
        assert_eq!(cfg.worker_count, 5);
        assert_eq!(cfg.mode, Mode::Create);
        assert!(!cfg.quiet);
        assert_eq!(cfg.data_dir, PathBuf::from("data_migration"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let cfg = RunConfig::load(Some(std::path::Path::new("/nonexistent/fhirmig.toml"))).unwrap();
        assert_eq!(cfg.chunk_size, 1000);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fhirmig.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "chunk_size = 250\nworker_count = 8\nmode = \"update\"\ndata_dir = \"/tmp/mig\""
        )
        .unwrap();

        let cfg = RunConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.chunk_size, 250);
        assert_eq!(cfg.worker_count, 8);
        assert_eq!(cfg.mode, Mode::Update);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/mig"));
    }

    #[test]
    fn test_zero_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fhirmig.toml");
        std::fs::write(&path, "chunk_size = 0").unwrap();

        let err = RunConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
