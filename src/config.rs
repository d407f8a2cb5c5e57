use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::validate::Limits;

/// Default listening port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 5000;

/// Central configuration loaded from environment variables.
///
/// Everything here is fixed for the lifetime of the process. The .env file
/// is loaded automatically at startup via dotenvy, so local overrides don't
/// need to be exported in the shell.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listening port (PORT, the variable most hosting platforms inject)
    pub port: u16,
    /// Bind address for the HTTP listener
    pub bind: String,
    /// Directory holding `text_vectorizer.json` and `text_model.json`
    pub model_dir: PathBuf,
    /// Class label the model uses for AI-written text
    pub ai_label: String,
    /// P(AI) at or above this value is reported as "AI Generated"
    pub threshold: f64,
    /// Requests admitted per client within `rate_window`
    pub rate_limit: u32,
    /// Sliding window for the per-client request count
    pub rate_window: Duration,
    /// Upper bound on distinct clients tracked by the rate limiter
    pub max_tracked_clients: usize,
    /// Minimum trimmed text length, in characters
    pub min_chars: usize,
    /// Maximum trimmed text length, in characters
    pub max_chars: usize,
    /// Request body cap (covers multipart uploads)
    pub max_upload_bytes: usize,
    /// Honour X-Forwarded-For when deriving the client identity.
    /// Only safe behind a reverse proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: "0.0.0.0".to_string(),
            model_dir: PathBuf::from("."),
            ai_label: "1".to_string(),
            threshold: 0.5,
            rate_limit: 5,
            rate_window: Duration::from_secs(60),
            max_tracked_clients: 10_000,
            min_chars: 10,
            max_chars: 10_000,
            max_upload_bytes: 10 * 1024 * 1024,
            trust_forwarded_for: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to `Config::default()`. A variable that is
    /// set but unparsable is an error rather than a silent default.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            port: parse_var("PORT", defaults.port)?,
            bind: env::var("AUTHORSHIP_BIND").unwrap_or(defaults.bind),
            model_dir: env::var("AUTHORSHIP_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            ai_label: env::var("AUTHORSHIP_AI_LABEL").unwrap_or(defaults.ai_label),
            threshold: parse_var("AUTHORSHIP_THRESHOLD", defaults.threshold)?,
            rate_limit: parse_var("AUTHORSHIP_RATE_LIMIT", defaults.rate_limit)?,
            rate_window: Duration::from_secs(parse_var(
                "AUTHORSHIP_RATE_WINDOW_SECS",
                defaults.rate_window.as_secs(),
            )?),
            max_tracked_clients: parse_var(
                "AUTHORSHIP_MAX_TRACKED_CLIENTS",
                defaults.max_tracked_clients,
            )?,
            min_chars: parse_var("AUTHORSHIP_MIN_CHARS", defaults.min_chars)?,
            max_chars: parse_var("AUTHORSHIP_MAX_CHARS", defaults.max_chars)?,
            max_upload_bytes: parse_var("AUTHORSHIP_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            trust_forwarded_for: parse_var(
                "AUTHORSHIP_TRUST_FORWARDED_FOR",
                defaults.trust_forwarded_for,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that would make the service misbehave.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            anyhow::bail!(
                "AUTHORSHIP_THRESHOLD must be between 0 and 1, got {}",
                self.threshold
            );
        }
        if self.rate_limit == 0 {
            anyhow::bail!("AUTHORSHIP_RATE_LIMIT must be at least 1");
        }
        if self.rate_window.is_zero() {
            anyhow::bail!("AUTHORSHIP_RATE_WINDOW_SECS must be at least 1");
        }
        if self.max_tracked_clients == 0 {
            anyhow::bail!("AUTHORSHIP_MAX_TRACKED_CLIENTS must be at least 1");
        }
        if self.min_chars > self.max_chars {
            anyhow::bail!(
                "AUTHORSHIP_MIN_CHARS ({}) is larger than AUTHORSHIP_MAX_CHARS ({})",
                self.min_chars,
                self.max_chars
            );
        }
        Ok(())
    }

    /// Text length limits enforced before classification.
    pub fn limits(&self) -> Limits {
        Limits {
            min_chars: self.min_chars,
            max_chars: self.max_chars,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
