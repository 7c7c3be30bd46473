use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Root of the directory tree to scan for FITS files.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Where the keyword/fingerprint store lives.
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Disk location of the per-run work queue; safe to delete between runs.
    #[serde(default = "default_queue_path")]
    pub queue_path: String,
    /// Emit a progress line every this many processed files.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// Optional per-run stats CSV (appended to).
    #[serde(default)]
    pub stats_csv_path: Option<String>,
}

fn default_root_path() -> String {
    ".".to_string()
}

fn default_store_path() -> String {
    "kwhistos.db".to_string()
}

fn default_queue_path() -> String {
    "$work_queue$".to_string()
}

fn default_progress_interval() -> u64 {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            root_path: default_root_path(),
            store_path: default_store_path(),
            queue_path: default_queue_path(),
            progress_interval: default_progress_interval(),
            stats_csv_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<AppConfig, ConfigError> {
        // Add configuration values from a file named 'Config.toml', if present
        let builder = Config::builder()
            .add_source(ConfigFile::with_name("Config").required(false))
            .build()?;

        builder.try_deserialize::<AppConfig>()
    }
}
