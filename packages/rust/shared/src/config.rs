//! Application configuration for LeadMatrix.
//!
//! User config lives at `~/.leadmatrix/leadmatrix.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LeadMatrixError, Result};
use crate::types::GeoBias;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadmatrix.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadmatrix";

// ---------------------------------------------------------------------------
// Config structs (matching leadmatrix.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation engine settings.
    #[serde(default)]
    pub engine: EngineSection,

    /// Geolocation bias settings.
    #[serde(default)]
    pub geolocation: GeolocationSection,

    /// Session store settings.
    #[serde(default)]
    pub session: SessionSection,

    /// CSV export settings.
    #[serde(default)]
    pub export: ExportSection,
}

/// `[engine]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Generative Language API origin.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature. Kept low: extraction, not creative writing.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "gemini-3-flash-preview".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_temperature() -> f32 {
    0.1
}

/// How the operator position is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationMode {
    /// IP-based lookup against `lookup_url`.
    #[default]
    Ip,
    /// Use the configured `latitude` / `longitude`.
    Fixed,
    /// Never bias the query.
    Off,
}

/// `[geolocation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationSection {
    #[serde(default)]
    pub mode: GeolocationMode,

    /// Upper bound for one position lookup.
    #[serde(default = "default_geo_timeout")]
    pub timeout_ms: u64,

    /// JSON endpoint returning `lat`/`lon` for the caller's IP.
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Default for GeolocationSection {
    fn default() -> Self {
        Self {
            mode: GeolocationMode::default(),
            timeout_ms: default_geo_timeout(),
            lookup_url: default_lookup_url(),
            latitude: None,
            longitude: None,
        }
    }
}

fn default_geo_timeout() -> u64 {
    5_000
}
fn default_lookup_url() -> String {
    "http://ip-api.com/json".into()
}

/// `[session]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    /// Path to the session database (`~` is expanded).
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.leadmatrix/session.db".into()
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    /// Directory CSV exports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    ".".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Resolved API key. Empty when unset; the engine will reject the call.
    pub api_key: String,
}

impl From<&AppConfig> for EngineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.engine.base_url.clone(),
            model: config.engine.model.clone(),
            temperature: config.engine.temperature,
            api_key: resolve_api_key(config).unwrap_or_default(),
        }
    }
}

/// Runtime geolocation configuration.
#[derive(Debug, Clone)]
pub struct GeolocationConfig {
    pub mode: GeolocationMode,
    pub timeout_ms: u64,
    pub lookup_url: String,
    /// Coordinates for [`GeolocationMode::Fixed`].
    pub fixed: Option<GeoBias>,
}

impl From<&AppConfig> for GeolocationConfig {
    fn from(config: &AppConfig) -> Self {
        let geo = &config.geolocation;
        let fixed = match (geo.latitude, geo.longitude) {
            (Some(lat), Some(lng)) => Some(GeoBias::new(lat, lng)),
            _ => None,
        };
        Self {
            mode: geo.mode,
            timeout_ms: geo.timeout_ms,
            lookup_url: geo.lookup_url.clone(),
            fixed,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadmatrix/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadMatrixError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadmatrix/leadmatrix.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadMatrixError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        LeadMatrixError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    Url::parse(&config.engine.base_url).map_err(|e| {
        LeadMatrixError::config(format!(
            "invalid engine.base_url '{}': {e}",
            config.engine.base_url
        ))
    })?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadMatrixError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadMatrixError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadMatrixError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.engine.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(LeadMatrixError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        ))),
    }
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
