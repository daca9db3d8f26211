//! Configuration management
//!
//! TOML file with per-field defaults; every section and key is optional.

use anyhow::{Context, Result};
use censor_engine::Redactor;
use censor_ocr::EngineConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables checked for the bot token, in order
pub const TOKEN_VARS: [&str; 2] = ["TOKEN", "TELOXIDE_TOKEN"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,

    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub redaction: RedactionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token; falls back to the environment
    pub token: Option<String>,

    /// Animation URL sent with the "please wait" notice
    pub wait_animation: Option<String>,

    /// Idle time after which an unfinished session is dropped; 0 keeps them forever
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
}

/// OCR service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Redaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// RGB fill painted over matched text
    #[serde(default = "default_fill")]
    pub fill: [u8; 3],
}

/// Log output besides stderr
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Plain-text copy of the log, e.g. `logs.txt`
    pub file: Option<PathBuf>,
}

/// Transient image storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

// Default value functions
fn default_session_timeout_secs() -> u64 { 600 }
fn default_endpoint() -> String { EngineConfig::default().endpoint }
fn default_languages() -> Vec<String> { EngineConfig::default().languages }
fn default_timeout_secs() -> u64 { EngineConfig::default().timeout.as_secs() }
fn default_fill() -> [u8; 3] { censor_engine::FILL_COLOR.0 }
fn default_images_dir() -> PathBuf { PathBuf::from("images") }

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            wait_animation: None,
            session_timeout_secs: default_session_timeout_secs(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            languages: default_languages(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self { fill: default_fill() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config TOML {}", path.display()))
    }

    /// The explicit path, else the default location when a file exists there
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| Self::default_path().filter(|path| path.exists()))
    }

    /// Load `path`, or defaults when there is no file
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// `<config dir>/censor/censor.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("censor").join("censor.toml"))
    }

    /// Token from the config file, else from the environment
    pub fn resolve_token(&self) -> Option<String> {
        self.resolve_token_with(|name| std::env::var(name).ok())
    }

    fn resolve_token_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.bot
            .token
            .clone()
            .or_else(|| TOKEN_VARS.iter().find_map(|name| lookup(name)))
            .filter(|token| !token.trim().is_empty())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            endpoint: self.ocr.endpoint.clone(),
            languages: self.ocr.languages.clone(),
            timeout: Duration::from_secs(self.ocr.timeout_secs),
        }
    }

    /// `None` when sessions never expire
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.bot.session_timeout_secs > 0).then(|| Duration::from_secs(self.bot.session_timeout_secs))
    }

    pub fn redactor(&self) -> Redactor {
        Redactor::new(image::Rgb(self.redaction.fill))
    }

    pub fn wait_animation(&self) -> Result<Option<Url>> {
        self.bot
            .wait_animation
            .as_deref()
            .map(|url| Url::parse(url).with_context(|| format!("Invalid wait_animation URL '{}'", url)))
            .transpose()
    }
}
