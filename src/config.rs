use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

/// Where applied events are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorMode {
    Local,
    Remote,
    Off,
}

impl FromStr for MirrorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(MirrorMode::Local),
            "remote" => Ok(MirrorMode::Remote),
            "off" | "none" => Ok(MirrorMode::Off),
            other => anyhow::bail!("unknown mirror mode {other:?}, expected local|remote|off"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,

    pub database_path: String,

    pub mirror_mode: MirrorMode,
    pub mirror_url: String,
    pub mirror_timeout_ms: u64,

    pub cache_path: String,
    pub cache_debounce_ms: u64,

    pub signal_stdin: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            http_port: parse_env("HTTP_PORT", "3000")?,
            log_level: env_or("LOG_LEVEL", "info"),

            database_path: env_or("DATABASE_PATH", "cricket.db"),

            mirror_mode: parse_env("MIRROR_MODE", "local")?,
            mirror_url: env_or("MIRROR_URL", "http://localhost:4000"),
            mirror_timeout_ms: parse_env("MIRROR_TIMEOUT_MS", "2000")?,

            cache_path: env_or("CACHE_PATH", "live_match.json"),
            cache_debounce_ms: parse_env("CACHE_DEBOUNCE_MS", "500")?,

            signal_stdin: parse_env("SIGNAL_STDIN", "false")?,
        })
    }

    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_millis(self.mirror_timeout_ms)
    }

    pub fn cache_debounce(&self) -> Duration {
        Duration::from_millis(self.cache_debounce_ms)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_or(key, default);
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("invalid value for {key}: {raw}"))
}
