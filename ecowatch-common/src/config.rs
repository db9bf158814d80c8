//! Configuration loading and root folder resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The TOML file is optional. A missing default file is silently skipped and a
//! malformed default file is logged and ignored; an explicitly requested file
//! must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ROOT_FOLDER: &str = "ECOWATCH_ROOT_FOLDER";
pub const ENV_BIND_ADDRESS: &str = "ECOWATCH_BIND_ADDRESS";

const DATABASE_FILE: &str = "ecowatch.db";
const IMAGES_DIR: &str = "images";

/// Bootstrap configuration as written in `ecowatch.toml`
///
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database and stored images
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Upper bound for a multipart upload body
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    #[serde(default)]
    pub gemini: GeminiSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[gemini]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeminiSection {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    /// No timeout is applied when unset
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// `[logging]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

/// Settings for the generative AI client
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` when no source provided a non-blank key
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Option<Duration>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub gemini: GeminiConfig,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge command line, environment, TOML and defaults
    pub fn resolve(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let root_folder = overrides
            .root_folder
            .clone()
            .or_else(|| env_var(ENV_ROOT_FOLDER).map(PathBuf::from))
            .or(toml_config.root_folder)
            .unwrap_or_else(default_root_folder);

        let bind_address = overrides
            .bind_address
            .clone()
            .or_else(|| env_var(ENV_BIND_ADDRESS))
            .or(toml_config.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let env_port = match env_var(ENV_PORT) {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|e| {
                Error::Config(format!("{} is not a valid port ({}): {}", ENV_PORT, raw, e))
            })?),
            None => None,
        };
        let port = overrides
            .port
            .or(env_port)
            .or(toml_config.port)
            .unwrap_or(DEFAULT_PORT);

        let api_key = env_var(ENV_API_KEY)
            .filter(|key| is_valid_key(key))
            .or_else(|| toml_config.gemini.api_key.filter(|key| is_valid_key(key)));

        let gemini = GeminiConfig {
            api_key,
            model: toml_config
                .gemini
                .model
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: toml_config
                .gemini
                .base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            request_timeout: toml_config
                .gemini
                .request_timeout_secs
                .map(Duration::from_secs),
        };

        let log_level = overrides
            .log_level
            .clone()
            .unwrap_or(toml_config.logging.level);

        Ok(Self {
            root_folder,
            bind_address,
            port,
            max_upload_bytes: toml_config
                .max_upload_bytes
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            gemini,
            log_level,
        })
    }

    /// SQLite database file inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Directory holding uploaded report images
    pub fn images_dir(&self) -> PathBuf {
        self.root_folder.join(IMAGES_DIR)
    }

    /// Create the root folder and image directory if missing
    pub fn ensure_directories(&self) -> Result<()> {
        let images_dir = self.images_dir();
        if !images_dir.exists() {
            std::fs::create_dir_all(&images_dir)?;
            info!("Created data directories under {}", self.root_folder.display());
        }
        Ok(())
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Default configuration file path for the platform
///
/// `~/.config/ecowatch/ecowatch.toml` on Linux, the platform config dir elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ecowatch").join("ecowatch.toml"))
}

/// Read and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Where the TOML configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Path named on the command line or in `ECOWATCH_CONFIG`
    Explicit(PathBuf),
    /// Platform default location
    DefaultFile(PathBuf),
    /// No file at the default location
    Absent,
    /// Default file present but unreadable or malformed; defaults used instead
    Ignored { path: PathBuf, reason: String },
}

impl ConfigSource {
    /// Report the load outcome
    ///
    /// Loading runs before the subscriber is installed, so the caller logs
    /// the outcome once logging is up.
    pub fn log(&self) {
        match self {
            ConfigSource::Explicit(path) | ConfigSource::DefaultFile(path) => {
                info!("Loaded configuration from {}", path.display())
            }
            ConfigSource::Absent => info!("No configuration file; using defaults"),
            ConfigSource::Ignored { path, reason } => {
                warn!("Ignoring unreadable config file {}: {}", path.display(), reason)
            }
        }
    }
}

/// TOML configuration plus where it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub toml: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    fn defaults(source: ConfigSource) -> Self {
        Self {
            toml: TomlConfig::default(),
            source,
        }
    }
}

/// Load the TOML configuration, tolerating a missing default file
///
/// `explicit` is a path named by the operator; it must exist and parse.
/// Without one, the platform default location is tried and any failure there
/// falls back to an empty configuration, recorded as [`ConfigSource::Ignored`].
/// Nothing is logged here; see [`ConfigSource::log`].
pub fn load_config_file(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            toml: load_toml_config(path)?,
            source: ConfigSource::Explicit(path.to_path_buf()),
        });
    }

    match default_config_path() {
        Some(path) if path.exists() => Ok(load_default_file(path)),
        _ => Ok(LoadedConfig::defaults(ConfigSource::Absent)),
    }
}

fn load_default_file(path: PathBuf) -> LoadedConfig {
    match load_toml_config(&path) {
        Ok(toml) => LoadedConfig {
            toml,
            source: ConfigSource::DefaultFile(path),
        },
        Err(e) => LoadedConfig::defaults(ConfigSource::Ignored {
            path,
            reason: e.to_string(),
        }),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("ecowatch"))
        .unwrap_or_else(|| PathBuf::from("./ecowatch_data"))
}
