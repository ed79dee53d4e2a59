use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DB_FILE: &str = "guess23.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("guess23"),
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Defaults with the global flags applied on top.
    pub fn from_args(data_dir: Option<PathBuf>, verbose: bool) -> Self {
        let mut config = Self::default();
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        config.verbose = verbose;
        config
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn log_filter(&self) -> String {
        let level = if self.verbose { "debug" } else { "info" };
        format!(
            "guess23={},guess23_game={},guess23_core={}",
            level, level, level
        )
    }
}
