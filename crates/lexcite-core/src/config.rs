use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{Context, Result};

use crate::expander::ResolveSettings;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_VERIFY_PREFIX_CHARS: usize = 40;
pub const DEFAULT_KEY_EXCERPT_CHARS: usize = 100;
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Client-side configuration for citation resolution.
/// Values come from the process environment, then a `.env` file in the working directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    /// Bearer token for the document API. Empty = unauthenticated.
    pub api_token: String,
    /// Per-request deadline for section and expansion fetches. 0 = no deadline.
    pub request_timeout_ms: u64,
    /// Leading excerpt characters that must appear in a fetched section.
    pub verify_prefix_chars: usize,
    /// Excerpt characters folded into each source key.
    pub key_excerpt_chars: usize,
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: String::new(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            verify_prefix_chars: DEFAULT_VERIFY_PREFIX_CHARS,
            key_excerpt_chars: DEFAULT_KEY_EXCERPT_CHARS,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(contents) = std::fs::read_to_string(path) else {
        return map;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn get(key: &str, dotenv: &HashMap<String, String>) -> Option<String> {
    std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
}

fn get_str(key: &str, dotenv: &HashMap<String, String>, default: &str) -> String {
    get(key, dotenv).unwrap_or_else(|| default.to_string())
}

fn get_parsed<T: std::str::FromStr>(
    key: &str,
    dotenv: &HashMap<String, String>,
    default: T,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key, dotenv) {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {v:?}")),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_dotenv(Path::new(".env"))
    }

    /// Like [`Config::from_env`] with an explicit `.env` path.
    pub fn from_env_with_dotenv(dotenv_path: &Path) -> Result<Self> {
        let dotenv = parse_dotenv(dotenv_path);

        let api_url = get_str("LEXCITE_API_URL", &dotenv, DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            anyhow::bail!("LEXCITE_API_URL must be an http(s) URL, got {api_url:?}");
        }

        let config = Self {
            api_url,
            api_token: get_str("LEXCITE_API_TOKEN", &dotenv, ""),
            request_timeout_ms: get_parsed(
                "LEXCITE_REQUEST_TIMEOUT_MS",
                &dotenv,
                DEFAULT_REQUEST_TIMEOUT_MS,
            )?,
            verify_prefix_chars: get_parsed(
                "LEXCITE_VERIFY_PREFIX_CHARS",
                &dotenv,
                DEFAULT_VERIFY_PREFIX_CHARS,
            )?,
            key_excerpt_chars: get_parsed(
                "LEXCITE_KEY_EXCERPT_CHARS",
                &dotenv,
                DEFAULT_KEY_EXCERPT_CHARS,
            )?,
            event_buffer: get_parsed("LEXCITE_EVENT_BUFFER", &dotenv, DEFAULT_EVENT_BUFFER)?,
        };
        tracing::debug!(
            api_url = %config.api_url,
            timeout_ms = config.request_timeout_ms,
            "loaded citation config"
        );
        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn resolve_settings(&self) -> ResolveSettings {
        ResolveSettings {
            verify_prefix_chars: self.verify_prefix_chars,
            key_excerpt_chars: self.key_excerpt_chars,
            request_timeout: self.request_timeout(),
        }
    }
}
