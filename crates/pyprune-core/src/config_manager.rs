use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::PruneError {
    fn from(err: ConfigError) -> Self {
        crate::PruneError::Config(err.to_string())
    }
}

/// Main configuration for pyprune
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PruneConfig {
    /// Source tree scanning
    #[serde(default)]
    pub scan: ScanConfig,

    /// Installed-distribution metadata lookup
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Manifest handling and allow-list
    #[serde(default)]
    pub prune: ManifestConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions treated as Python source (without the dot)
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Glob patterns excluded from the scan
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Parse files on a thread pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Worker threads for the parallel scan
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source_extensions: default_source_extensions(),
            exclude_patterns: default_exclude_patterns(),
            parallel: default_parallel(),
            threads: default_threads(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Query the interpreter for distribution metadata
    #[serde(default = "default_metadata_enabled")]
    pub enabled: bool,

    /// Python interpreter; auto-detected from the project's `.venv` when unset
    #[serde(default)]
    pub python: Option<String>,

    /// Upper bound for the metadata query, 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: default_metadata_enabled(),
            python: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    /// Interpreter used for the metadata query.
    ///
    /// An explicit setting wins, then the project's virtual environment,
    /// then whatever `python3` (`python` on Windows) resolves to on `PATH`.
    pub fn interpreter(&self, project_root: &Path) -> PathBuf {
        if let Some(python) = &self.python {
            return PathBuf::from(python);
        }

        let venv = if cfg!(windows) {
            project_root.join(".venv").join("Scripts").join("python.exe")
        } else {
            project_root.join(".venv").join("bin").join("python")
        };
        if venv.is_file() {
            return venv;
        }

        PathBuf::from(if cfg!(windows) { "python" } else { "python3" })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Manifest file name inside the project directory
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Extra names appended to the development-tooling allow-list
    #[serde(default)]
    pub keep: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            keep: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_source_extensions() -> Vec<String> {
    vec!["py".to_string()]
}
fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.venv/**".to_string(),
        "**/venv/**".to_string(),
        "**/.git/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/.tox/**".to_string(),
        "**/.pytest_cache/**".to_string(),
        "**/build/**".to_string(),
        "**/dist/**".to_string(),
        "**/node_modules/**".to_string(),
    ]
}
fn default_parallel() -> bool {
    true
}
fn default_threads() -> usize {
    num_cpus::get()
}
fn default_metadata_enabled() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_manifest() -> String {
    "requirements.txt".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}

fn is_plain_level(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error" | "off")
}

/// Local config file name looked up in the project directory.
pub const LOCAL_CONFIG_FILE: &str = ".pyprune.toml";

/// Configuration manager with defaults, file lookup and env overrides
pub struct ConfigManager {
    config: PruneConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables
    /// 2. Config file (`<project>/.pyprune.toml`, then `~/.pyprune/config.toml`)
    /// 3. Defaults
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let (config, config_path) = Self::load_config_file(project_root)?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match &config_path {
            Some(path) => info!("Config file: {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_config_file(project_root: &Path) -> Result<(PruneConfig, Option<PathBuf>), ConfigError> {
        let local_config = project_root.join(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            let config = Self::read_toml_file(&local_config)?;
            return Ok((config, Some(local_config)));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".pyprune").join("config.toml");
            if user_config.is_file() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((PruneConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<PruneConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: PruneConfig) -> PruneConfig {
        if let Ok(python) = std::env::var("PYPRUNE_PYTHON") {
            config.metadata.python = Some(python);
        }
        if let Ok(timeout) = std::env::var("PYPRUNE_METADATA_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                config.metadata.timeout_secs = secs;
            }
        }
        if let Ok(manifest) = std::env::var("PYPRUNE_MANIFEST") {
            config.prune.manifest = manifest;
        }
        // full filter directives are read by the subscriber itself
        if let Ok(level) = std::env::var("RUST_LOG") {
            if is_plain_level(&level) {
                config.logging.level = level;
            }
        }
        config
    }

    fn validate_config(config: &PruneConfig) -> Result<(), ConfigError> {
        if config.scan.source_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "scan.source_extensions must list at least one extension".to_string(),
            ));
        }

        if config.prune.manifest.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prune.manifest must not be empty".to_string(),
            ));
        }

        let level = config.logging.level.as_str();
        // directives such as `pyprune_engine=debug` are passed through
        if !is_plain_level(level) && !level.contains('=') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                level
            )));
        }

        Ok(())
    }

    pub fn config(&self) -> &PruneConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
