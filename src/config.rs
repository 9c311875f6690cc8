//! Runtime configuration read from the environment (and `.env` via dotenv).

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEMO_KEY: &str = "DEMO_KEY";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub vision_model: String,
    pub text_model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Variables:
    /// - `GEMINI_API_KEY` (default `DEMO_KEY`, which serves canned answers)
    /// - `GEMINI_API_BASE`, `GEMINI_VISION_MODEL`, `GEMINI_TEXT_MODEL`
    /// - `GEMINI_TIMEOUT_SECS`, `MAX_UPLOAD_BYTES`, `PORT`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let string = |name: &str, default: &str| {
            lookup(name).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
        };

        let gemini = GeminiConfig {
            api_key: string("GEMINI_API_KEY", DEMO_KEY),
            base_url: string("GEMINI_API_BASE", DEFAULT_API_BASE).trim_end_matches('/').to_string(),
            vision_model: string("GEMINI_VISION_MODEL", DEFAULT_MODEL),
            text_model: string("GEMINI_TEXT_MODEL", DEFAULT_MODEL),
            timeout: Duration::from_secs(parse(&lookup, "GEMINI_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?),
        };

        Ok(Self {
            gemini,
            port: parse(&lookup, "PORT", DEFAULT_PORT)?,
            max_upload_bytes: parse(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        _ => Ok(default),
    }
}
