//! Persistent component configuration model and defaults.

use std::path::Path;

use log::info;

/// Root configuration persisted to `reelsync.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Share-link encoding preferences.
    pub share: ShareConfig,
    #[serde(default)]
    /// Synchronized transport preferences.
    pub playback: PlaybackConfig,
}

/// Query-string layout used when saving and restoring playlists.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ShareConfig {
    /// Page address used when building a complete share link.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Query parameter carrying the encoded playlist token.
    #[serde(default = "default_token_param")]
    pub token_param: String,
    /// Prefix of the indexed legacy parameters (`video0`, `video1`, ...).
    #[serde(default = "default_legacy_param_prefix")]
    pub legacy_param_prefix: String,
    /// Separator between url and start time inside a legacy parameter value.
    #[serde(default = "default_legacy_delimiter")]
    pub legacy_delimiter: char,
}

/// What a natural end of one entry does to the shared play/pause state.
#[derive(Debug, Clone, Copy, serde::Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndBehavior {
    /// Any entry finishing flips the shared mode to stopped.
    #[default]
    StopAll,
    /// Ends are recorded but the shared mode is left alone.
    EntryOnly,
}

/// Transport preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub end_behavior: EndBehavior,
    /// Fractional digits kept when capturing a player position as start time.
    #[serde(default = "default_capture_decimals")]
    pub capture_decimals: u32,
}

/// Failures while reading or creating the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize failed: {0}")]
    Serialize(#[from] toml::ser::Error),
}

const MAX_CAPTURE_DECIMALS: u32 = 6;

fn default_base_url() -> String {
    "http://localhost/".to_string()
}

fn default_token_param() -> String {
    "id".to_string()
}

fn default_legacy_param_prefix() -> String {
    "video".to_string()
}

fn default_legacy_delimiter() -> char {
    '|'
}

fn default_capture_decimals() -> u32 {
    2
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_param: default_token_param(),
            legacy_param_prefix: default_legacy_param_prefix(),
            legacy_delimiter: default_legacy_delimiter(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            end_behavior: EndBehavior::default(),
            capture_decimals: default_capture_decimals(),
        }
    }
}

/// Replaces unusable values with defaults.
pub fn sanitize_config(mut config: Config) -> Config {
    if config.share.base_url.trim().is_empty() {
        config.share.base_url = default_base_url();
    }
    if config.share.token_param.trim().is_empty() {
        config.share.token_param = default_token_param();
    }
    if config.share.legacy_param_prefix.trim().is_empty() {
        config.share.legacy_param_prefix = default_legacy_param_prefix();
    }
    config.playback.capture_decimals = config.playback.capture_decimals.min(MAX_CAPTURE_DECIMALS);
    config
}

/// Parses config text, falling back to defaults for missing sections.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(sanitize_config(toml::from_str::<Config>(content)?))
}

/// Reads the config file, writing the defaults first when it does not exist.
pub fn load_or_create_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        info!(
            "Config file not found. Creating default config. path={}",
            path.display()
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string(&Config::default())?)?;
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
