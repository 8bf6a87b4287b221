/// Configuration resolution module
///
/// This module handles:
/// - Reading the optional TOML config file
/// - Layering CLI flags over environment variables over the file over defaults
/// - Resolving the output directory and preference file locations
use crate::cli::{CliArgs, default_config_dir};
use crate::prefs::default_preferences_path;
use log::debug;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "CHEMDATA_API_URL";
pub const ENV_USERNAME: &str = "CHEMDATA_USERNAME";
pub const ENV_PASSWORD: &str = "CHEMDATA_PASSWORD";

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub output_dir: PathBuf,
    pub preferences_path: PathBuf,
    pub timeout: Duration,
    /// Keep preferences in the local file even with credentials
    pub local_prefs: bool,
}

impl AppConfig {
    /// Username and password, when both are known
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) if !u.is_empty() => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub preferences_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
}

/// Default location of the config file
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Read a config file.
///
/// A missing file is an empty config unless `required` (the user named it
/// with `--config`).
pub fn load_config_file(path: &Path, required: bool) -> Result<FileConfig, String> {
    if !path.exists() {
        if required {
            return Err(format!("Config file not found: {}", path.display()));
        }
        debug!("No config file at {}", path.display());
        return Ok(FileConfig::default());
    }

    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_config(&text).map_err(|e| format!("Invalid config file {}: {}", path.display(), e))
}

pub fn parse_config(text: &str) -> Result<FileConfig, String> {
    toml::from_str(text).map_err(|e| e.to_string())
}

/// Build the run configuration from CLI arguments, the process environment
/// and the config file
pub fn build_app_config(args: &CliArgs) -> Result<AppConfig, String> {
    let (path, required) = match args.config {
        Some(ref path) => (path.clone(), true),
        None => (default_config_path(), false),
    };
    let file = load_config_file(&path, required)?;
    resolve_config(args, file, |key| env::var(key).ok())
}

/// Layer CLI flags over `env` over `file` over defaults
pub fn resolve_config<F>(args: &CliArgs, file: FileConfig, env: F) -> Result<AppConfig, String>
where
    F: Fn(&str) -> Option<String>,
{
    let api_url = args
        .api_url
        .clone()
        .or_else(|| env(ENV_API_URL))
        .or(file.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let api_url = normalize_api_url(&api_url)?;

    let username = args.username.clone().or_else(|| env(ENV_USERNAME)).or(file.username);
    let password = args.password.clone().or_else(|| env(ENV_PASSWORD)).or(file.password);

    let output_dir = args.output_dir.clone().or(file.output_dir).unwrap_or_else(|| PathBuf::from("."));
    let preferences_path =
        args.preferences.clone().or(file.preferences_path).unwrap_or_else(default_preferences_path);

    let timeout_secs = args.timeout.or(file.timeout_secs).unwrap_or(DEFAULT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err("Timeout must be at least 1 second".to_string());
    }

    let config = AppConfig {
        api_url,
        username,
        password,
        output_dir,
        preferences_path,
        timeout: Duration::from_secs(timeout_secs),
        local_prefs: args.local_prefs,
    };
    debug!(
        "Resolved config: api_url={} user={:?} output_dir={} preferences={}",
        config.api_url,
        config.username,
        config.output_dir.display(),
        config.preferences_path.display()
    );
    Ok(config)
}

/// Trim trailing slashes and require an http(s) scheme
fn normalize_api_url(url: &str) -> Result<String, String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(format!("API URL must start with http:// or https://, got '{}'", url));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
