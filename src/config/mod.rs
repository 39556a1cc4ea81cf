use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Rows persisted per batch write inside the import transaction
    #[serde(default = "default_batch_size")]
    pub import_batch_size: usize,

    /// Maximum import jobs processing at once (0 disables the limit)
    #[serde(default = "default_max_concurrent")]
    pub import_max_concurrent: usize,

    /// Advisory throughput floor in rows/second; slower imports only log a warning
    #[serde(default = "default_minimum_tps")]
    pub import_minimum_tps: f64,

    /// Directory for staged uploads. Defaults to the OS temp dir.
    pub import_scratch_dir: Option<PathBuf>,

    /// Bound of the hand-off queue between uploads and import workers
    #[serde(default = "default_queue_capacity")]
    pub import_queue_capacity: usize,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrent() -> usize {
    1
}

fn default_minimum_tps() -> f64 {
    10.0
}

fn default_queue_capacity() -> usize {
    32
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Settings consumed by the import pipeline.
    pub fn import_settings(&self) -> ImportSettings {
        ImportSettings {
            batch_size: self.import_batch_size,
            max_concurrent_imports: self.import_max_concurrent,
            minimum_tps: self.import_minimum_tps,
            scratch_dir: self
                .import_scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            queue_capacity: self.import_queue_capacity,
        }
    }
}

/// Tuning knobs of the bulk import pipeline.
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub batch_size: usize,
    pub max_concurrent_imports: usize,
    pub minimum_tps: f64,
    pub scratch_dir: PathBuf,
    pub queue_capacity: usize,
}

impl ImportSettings {
    /// Batch size with the floor of one row applied.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrent_imports: default_max_concurrent(),
            minimum_tps: default_minimum_tps(),
            scratch_dir: std::env::temp_dir(),
            queue_capacity: default_queue_capacity(),
        }
    }
}
