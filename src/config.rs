use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::logging::parse_flag;

const DEFAULT_ENV_PREFIX: &str = "RYD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub dislikes: DislikeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DislikeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for DislikeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            workers: default_workers(),
            separator: default_separator(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_api_url() -> String {
    "https://returnyoutubedislikeapi.com".into()
}

fn default_user_agent() -> String {
    format!("dislike-sync/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_workers() -> usize {
    2
}

fn default_separator() -> String {
    " | ".into()
}

/// Runtime view of `dislikes.enabled`.
pub trait FeatureFlag: Send + Sync {
    fn is_enabled(&self) -> bool;
}

/// Feature flag seeded from config that settings screens can flip later.
#[derive(Debug)]
pub struct FeatureToggle {
    enabled: AtomicBool,
}

impl FeatureToggle {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl FeatureFlag for FeatureToggle {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl From<&DislikeConfig> for FeatureToggle {
    fn from(cfg: &DislikeConfig) -> Self {
        Self::new(cfg.enabled)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "dislikes.enabled" => cfg.dislikes.enabled = parse_flag(&value),
        "dislikes.api_url" => {
            if !value.trim().is_empty() {
                cfg.dislikes.api_url = value.trim().to_string();
            }
        }
        "dislikes.user_agent" => {
            if !value.trim().is_empty() {
                cfg.dislikes.user_agent = value;
            }
        }
        "dislikes.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.dislikes.timeout = duration;
            }
        }
        "dislikes.workers" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.dislikes.workers = parsed;
            }
        }
        "dislikes.separator" => cfg.dislikes.separator = value,
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dislike-sync").join("config.yaml"))
}

pub fn save(path: Option<PathBuf>, cfg: &Config) -> Result<PathBuf> {
    anyhow::ensure!(
        !cfg.dislikes.api_url.trim().is_empty(),
        "config: dislikes.api_url is required"
    );

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}
