use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SCRATCH_DIR: &str = "temp_images";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const HF_BASE_URL: &str = "https://api-inference.huggingface.co";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub together_api_key: String,
    pub hf_token: String,
    pub database_url: Option<String>,
    pub port: u16,
    pub model_timeout: Duration,
    pub scratch_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub gemini_base_url: String,
    pub hf_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let gemini_api_key = first_set(&lookup, &["GEMINI_API_KEY", "gemini_api_key"])
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
        let together_api_key = first_set(&lookup, &["TOGETHER_AI_API_KEY"])
            .ok_or(ConfigError::Missing("TOGETHER_AI_API_KEY"))?;
        let hf_token = first_set(&lookup, &["HF_TOKEN", "hf_token"])
            .ok_or(ConfigError::Missing("HF_TOKEN"))?;

        let port = parse_or("PORT", first_set(&lookup, &["PORT"]), DEFAULT_PORT)?;
        let timeout_secs = parse_or(
            "MODEL_TIMEOUT_SECS",
            first_set(&lookup, &["MODEL_TIMEOUT_SECS"]),
            DEFAULT_MODEL_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "MODEL_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        let max_upload_bytes = parse_or(
            "MAX_UPLOAD_BYTES",
            first_set(&lookup, &["MAX_UPLOAD_BYTES"]),
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;

        Ok(Self {
            gemini_api_key,
            together_api_key,
            hf_token,
            database_url: first_set(&lookup, &["DATABASE_URL"]),
            port,
            model_timeout: Duration::from_secs(timeout_secs),
            scratch_dir: first_set(&lookup, &["SCRATCH_DIR"])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCRATCH_DIR)),
            max_upload_bytes,
            gemini_base_url: first_set(&lookup, &["GEMINI_BASE_URL"])
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            hf_base_url: first_set(&lookup, &["HF_BASE_URL"])
                .unwrap_or_else(|| HF_BASE_URL.to_string()),
        })
    }
}

fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .copied()
        .find_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
