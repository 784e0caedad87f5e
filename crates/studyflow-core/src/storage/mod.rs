mod config;
pub mod database;

pub use config::{AnalyticsConfig, Config, ProfileConfig, TimerConfig};
pub use database::{Database, StoredUser};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the StudyFlow data directory, creating it if needed.
///
/// Resolution order:
/// - `STUDYFLOW_DATA_DIR`, verbatim
/// - `~/.config/studyflow-dev/` when `STUDYFLOW_ENV=dev`
/// - `~/.config/studyflow/`
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYFLOW_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYFLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyflow-dev")
            } else {
                base_dir.join("studyflow")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
