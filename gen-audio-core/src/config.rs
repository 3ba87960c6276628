//! Process configuration loaded from the environment, in the spirit of the
//! teacher's `GenaConfig::load`/`config_path` (serde-backed, sensible
//! defaults, a single entry point called once at startup) but sourced from
//! env vars instead of a dotfile, per the external-interface list.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Settings shared by every binary in the workspace. Each binary calls
/// [`Config::from_env`] once at startup and fails fast if a required
/// variable is missing, matching `original_source`'s
/// `services/storage/env_validation.py` startup-validation pattern.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub secret_key: String,
    pub text_data_path: PathBuf,
    pub wav_data_path: PathBuf,
    pub ogg_data_path: PathBuf,
    pub session_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub signed_url_ttl: Duration,
    pub chunk_size_chars: usize,
    pub transcode_segment_seconds: f64,
    pub opus_bitrate_kbps: u32,
    pub debug_bypass_rate_limits: bool,
    pub admin_password: String,
    pub cors_origins: Vec<String>,
    pub api_base_url: String,
}

/// Parses an opus bitrate given as `"32k"` or a bare `"32"` (kbps).
fn parse_bitrate_kbps(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(['k', 'K']).unwrap_or(trimmed);
    digits
        .parse()
        .with_context(|| format!("invalid OPUS_BITRATE value {raw:?}"))
}

fn env_var(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("missing required environment variable {key}"))
}

fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from `.env` (if present) and the process
    /// environment. Returns an error naming the first missing required
    /// variable rather than panicking.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: env_var("DATABASE_URL")?,
            redis_url: env_var("REDIS_URL")?,
            secret_key: env_var("SECRET_KEY")?,
            text_data_path: PathBuf::from(env_var_or("TEXT_DATA_PATH", "/data/text")),
            wav_data_path: PathBuf::from(env_var_or("WAV_DATA_PATH", "/data/wav")),
            ogg_data_path: PathBuf::from(env_var_or("OGG_DATA_PATH", "/data/ogg")),
            session_token_ttl: Duration::from_secs(
                env_var_or("SESSION_TOKEN_TTL_SECS", "3600").parse()?,
            ),
            reset_token_ttl: Duration::from_secs(
                env_var_or("PASSWORD_RESET_EXPIRY", "15").parse::<u64>()? * 60,
            ),
            signed_url_ttl: Duration::from_secs(env_var_or("SIGNED_URL_TTL_SECS", "3600").parse()?),
            chunk_size_chars: env_var_or("CHUNK_SIZE_CHARS", "800").parse()?,
            transcode_segment_seconds: env_var_or("SEGMENT_DURATION", "3.14").parse()?,
            opus_bitrate_kbps: parse_bitrate_kbps(&env_var_or("OPUS_BITRATE", "32k"))?,
            debug_bypass_rate_limits: env_flag("GATEWAY_DEBUG_BYPASS_RATE_LIMITS", false),
            admin_password: env_var_or("ADMIN_PASSWORD", "admin123!"),
            cors_origins: env_var_or("CORS_ORIGINS", "http://localhost:3000,http://localhost:8000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            api_base_url: env_var_or("API_BASE_URL", "http://localhost:8000"),
        })
    }

    /// Install the tracing subscriber used by every binary: an env-filter
    /// layer defaulting to `info`, matching the teacher's single
    /// `env_logger::init()` call but carrying structured fields.
    pub fn init_tracing() {
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_target(true).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_recognizes_truthy_values() {
        unsafe {
            env::set_var("TEST_FLAG_ONE", "true");
            env::set_var("TEST_FLAG_TWO", "0");
        }
        assert!(env_flag("TEST_FLAG_ONE", false));
        assert!(!env_flag("TEST_FLAG_TWO", true));
        unsafe {
            env::remove_var("TEST_FLAG_ONE");
            env::remove_var("TEST_FLAG_TWO");
        }
    }

    #[test]
    fn env_var_or_falls_back_to_default() {
        assert_eq!(env_var_or("DEFINITELY_UNSET_VAR_XYZ", "fallback"), "fallback");
    }

    #[test]
    fn bitrate_parses_with_or_without_k_suffix() {
        assert_eq!(parse_bitrate_kbps("32k").unwrap(), 32);
        assert_eq!(parse_bitrate_kbps("64K").unwrap(), 64);
        assert_eq!(parse_bitrate_kbps("32").unwrap(), 32);
    }
}
