//! Configuration management
//!
//! Loads and validates the optional TOML configuration file. A missing file
//! means built-in defaults; the file is never written by `dasw`.

use color_eyre::eyre::{self, Context, ContextCompat, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::display::DEFAULT_MAX_DISPLAYS;
use crate::policy::DEFAULT_PROXY_DEVICE_NAME;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "DASW_CONFIG";

/// Upper bound for `max_displays`
const MAX_DISPLAYS_LIMIT: u32 = 256;

/// Upper bound for `settle_ms`
const MAX_SETTLE_MS: u64 = 10_000;

// ============================================================================
// Public Configuration Types
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub settings: Settings,
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Exact name of the proxy output device
    pub proxy_device: String,
    /// Bound on the active display list
    pub max_displays: u32,
    /// Window for coalescing bursts of display callbacks
    pub settle_ms: u64,
    pub apply_on_startup: bool,
    pub notify_switch: bool,
    pub notify_errors: bool,
    pub notify_daemon: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        SettingsFile::default().into()
    }
}

// ============================================================================
// Config File Deserialization (TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: SettingsFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    #[serde(default = "default_proxy_device")]
    proxy_device: String,
    #[serde(default = "default_max_displays")]
    max_displays: u32,
    #[serde(default = "default_settle_ms")]
    settle_ms: u64,
    #[serde(default = "default_true")]
    apply_on_startup: bool,
    #[serde(default = "default_true")]
    notify_switch: bool,
    #[serde(default = "default_true")]
    notify_errors: bool,
    #[serde(default)]
    notify_daemon: bool,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_proxy_device() -> String {
    DEFAULT_PROXY_DEVICE_NAME.to_string()
}

fn default_max_displays() -> u32 {
    DEFAULT_MAX_DISPLAYS
}

fn default_settle_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            proxy_device: default_proxy_device(),
            max_displays: default_max_displays(),
            settle_ms: default_settle_ms(),
            apply_on_startup: true,
            notify_switch: true,
            notify_errors: true,
            notify_daemon: false,
            log_level: default_log_level(),
        }
    }
}

impl From<SettingsFile> for Settings {
    fn from(file: SettingsFile) -> Self {
        Self {
            proxy_device: file.proxy_device,
            max_displays: file.max_displays,
            settle_ms: file.settle_ms,
            apply_on_startup: file.apply_on_startup,
            notify_switch: file.notify_switch,
            notify_errors: file.notify_errors,
            notify_daemon: file.notify_daemon,
            log_level: file.log_level,
        }
    }
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration from `$DASW_CONFIG` or the default config path
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined, or the
    /// file exists but cannot be read, parsed, or validated.
    pub fn load() -> Result<Self> {
        let path = Self::get_config_path()?;
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from_path(&path)
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    /// Returns an error on malformed TOML, unknown keys, or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config_file: ConfigFile =
            toml::from_str(contents).context("Failed to parse config TOML")?;

        let config = Self {
            settings: config_file.settings.into(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let settings = &self.settings;

        match settings.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => eyre::bail!(
                "Invalid log_level '{level}'. Must be: error, warn, info, debug, or trace"
            ),
        }

        if settings.proxy_device.trim().is_empty() {
            eyre::bail!("proxy_device must not be empty");
        }

        if !(1..=MAX_DISPLAYS_LIMIT).contains(&settings.max_displays) {
            eyre::bail!(
                "max_displays must be between 1 and {MAX_DISPLAYS_LIMIT}, got {}",
                settings.max_displays
            );
        }

        if settings.settle_ms > MAX_SETTLE_MS {
            eyre::bail!(
                "settle_ms must be at most {MAX_SETTLE_MS}, got {}",
                settings.settle_ms
            );
        }

        Ok(())
    }

    /// Config file location: `$DASW_CONFIG`, else `<config dir>/dasw/config.toml`
    ///
    /// # Errors
    /// Returns an error if no config directory exists for this user.
    pub fn get_config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        Ok(dirs::config_dir()
            .context("Could not determine config directory")?
            .join("dasw")
            .join("config.toml"))
    }

    /// Print a human-readable summary of the configuration
    pub fn print_summary(&self) {
        println!("✓ Configuration valid\n");

        let s = &self.settings;
        println!("Settings:");
        println!("  proxy_device: {:?}", s.proxy_device);
        println!("  max_displays: {}", s.max_displays);
        println!("  settle_ms: {}", s.settle_ms);
        println!("  apply_on_startup: {}", s.apply_on_startup);
        println!("  notify_switch: {}", s.notify_switch);
        println!("  notify_errors: {}", s.notify_errors);
        println!("  notify_daemon: {}", s.notify_daemon);
        println!("  log_level: {}", s.log_level);

        if let Ok(path) = Self::get_config_path() {
            let origin = if path.exists() { "" } else { " (not present, defaults)" };
            println!("\nConfig: {}{}", path.display(), origin);
        }
    }
}
