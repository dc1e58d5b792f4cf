//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `8080` |
//! | `LEXFLOW_CAPABILITIES_DIR` | unset |
//! | `LEXFLOW_MAX_BODY_BYTES` | 25 MiB |
//! | `GEMINI_MODEL` | `gemini-2.0-flash` |
//! | `GOOGLE_API_KEY` / `GEMINI_API_KEY` | unset |
//! | `GEMINI_BASE_URL` | Google endpoint |
//! | `GEMINI_TEMPERATURE` | unset |
//! | `GEMINI_TIMEOUT_SECS` | `120` |
//! | `GEMINI_MAX_RETRIES` | `2` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::llms::GeminiConfig;

pub const DEFAULT_PORT: u16 = 8080;

/// Request body limit. Scanned documents arrive base64-encoded inside JSON.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Everything the `server` binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub capabilities_dir: Option<PathBuf>,
    pub max_body_bytes: usize,
    pub backend: GeminiConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_var(&get, "PORT")?.unwrap_or(DEFAULT_PORT);
        let max_body_bytes: usize =
            parse_var(&get, "LEXFLOW_MAX_BODY_BYTES")?.unwrap_or(DEFAULT_MAX_BODY_BYTES);

        let mut backend = GeminiConfig::default();
        if let Some(model) = get("GEMINI_MODEL") {
            backend.model = model;
        }
        backend.api_key = get("GOOGLE_API_KEY").or_else(|| get("GEMINI_API_KEY"));
        if let Some(base_url) = get("GEMINI_BASE_URL") {
            backend.base_url = base_url.trim_end_matches('/').to_string();
        }
        backend.temperature = parse_var(&get, "GEMINI_TEMPERATURE")?;
        if let Some(secs) = parse_var::<u64, _>(&get, "GEMINI_TIMEOUT_SECS")? {
            backend.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var(&get, "GEMINI_MAX_RETRIES")? {
            backend.max_retries = retries;
        }

        Ok(Self {
            bind_addr: format!("0.0.0.0:{}", port),
            capabilities_dir: get("LEXFLOW_CAPABILITIES_DIR").map(PathBuf::from),
            max_body_bytes,
            backend,
        })
    }
}

fn parse_var<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
