//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a small TOML file. Root folder is
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`RTC_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: defaults are used and a warning logged.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "RTC_ROOT_FOLDER";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5730;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "rtc.db";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("rate-the-clip"))
            .unwrap_or_else(|| PathBuf::from("./rate-the-clip"));

        Self {
            root_folder,
            port: DEFAULT_PORT,
        }
    }
}

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database and media tree (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port (optional)
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
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

/// Media locator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Clip duration the locator aims for, in seconds
    #[serde(default = "default_target_duration")]
    pub target_duration_secs: f64,

    /// Accepted clip extensions (case-insensitive, no dot)
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Accepted still image extensions (case-insensitive, no dot)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Duration probe executable
    #[serde(default = "default_probe_binary")]
    pub probe_binary: String,

    /// Remove rated clip directories when a rating session completes
    #[serde(default)]
    pub purge_rated_clips: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: default_target_duration(),
            video_extensions: default_video_extensions(),
            image_extensions: default_image_extensions(),
            probe_binary: default_probe_binary(),
            purge_rated_clips: false,
        }
    }
}

/// Leaderboard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    /// Look-back window for the position change indicator
    #[serde(default = "default_position_window_hours")]
    pub position_window_hours: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            position_window_hours: default_position_window_hours(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target_duration() -> f64 {
    5.0
}

fn default_video_extensions() -> Vec<String> {
    vec!["mov".to_string()]
}

fn default_image_extensions() -> Vec<String> {
    vec!["jpg".to_string()]
}

fn default_probe_binary() -> String {
    "ffprobe".to_string()
}

fn default_position_window_hours() -> u32 {
    24
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path, or the default location
    ///
    /// Missing file → defaults with a warning. Unreadable or invalid file → error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let target = self.media.target_duration_secs;
        if !target.is_finite() || target <= 0.0 {
            return Err(Error::Config(format!(
                "media.target_duration_secs must be a positive number, got {}",
                target
            )));
        }
        if self.media.video_extensions.is_empty() {
            return Err(Error::Config("media.video_extensions must not be empty".to_string()));
        }
        if self.media.image_extensions.is_empty() {
            return Err(Error::Config("media.image_extensions must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Default configuration file path (`<config dir>/rate-the-clip/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("rate-the-clip").join("config.toml"))
}

/// Resolves the root folder from CLI, environment, TOML and compiled defaults
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_config: &TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_root: toml_config.root_folder.clone(),
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder tree and names the paths inside it
///
/// Layout:
/// - `<root>/rtc.db`
/// - `<root>/faces/<person>/` still images
/// - `<root>/interactions/<person>/` interaction clips
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn faces_dir(&self) -> PathBuf {
        self.root_folder.join("faces")
    }

    pub fn interactions_dir(&self) -> PathBuf {
        self.root_folder.join("interactions")
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Create the root folder and media subdirectories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [self.root_folder.clone(), self.faces_dir(), self.interactions_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }
}
