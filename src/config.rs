use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for ProteogenomiX
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProteogenomixConfig {
    /// Stage timing and failure policy
    pub pipeline: PipelineConfig,
    /// Upload constraints
    pub upload: UploadConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delay before the first stage
    pub start_delay_ms: u64,
    /// Delays before each later stage, in order
    pub stage_delays_ms: Vec<u64>,
    /// Store the demonstration biomarker instead of failing when evaluation errors
    pub fallback_on_evaluation_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 1000,
            stage_delays_ms: vec![2000, 3000, 2000],
            fallback_on_evaluation_error: false,
        }
    }
}

impl PipelineConfig {
    /// Delay before each of the four steps. Missing stage delays repeat the last one given.
    pub fn step_delays(&self) -> [Duration; 4] {
        let stage = |i: usize| {
            self.stage_delays_ms
                .get(i)
                .or(self.stage_delays_ms.last())
                .copied()
                .unwrap_or(self.start_delay_ms)
        };

        [
            Duration::from_millis(self.start_delay_ms),
            Duration::from_millis(stage(0)),
            Duration::from_millis(stage(1)),
            Duration::from_millis(stage(2)),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted upload
    pub max_file_size_bytes: u64,
    /// Accepted file extensions, without the leading dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 100 * 1024 * 1024,
            allowed_extensions: ["csv", "tsv", "fasta", "fa", "fas", "vcf", "txt"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://.proteogenomix/proteogenomix.db".to_string(),
            max_connections: 10,
            auto_migrate: true,
        }
    }
}

impl ProteogenomixConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (proteogenomix.toml, .proteogenomix-rc)
    /// 3. Environment variables (prefixed with PROTEOGENOMIX_)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load) with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut builder = Config::builder();

        let toml_file = dir.join("proteogenomix.toml");
        if toml_file.exists() {
            builder = builder.add_source(File::from(toml_file));
        }

        let rc_file = dir.join(".proteogenomix-rc");
        if rc_file.exists() {
            builder = builder.add_source(File::from(rc_file).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("PROTEOGENOMIX")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("pipeline.stage_delays_ms")
                .with_list_parse_key("upload.allowed_extensions")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ProteogenomixConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = ProteogenomixConfig::load_env_file();
        ProteogenomixConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ProteogenomixConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
