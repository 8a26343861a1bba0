//! Service configuration.

use reword_core::Limits;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `GEMINI_API_KEYS` is absent or resolved to an empty pool.
    #[error("GEMINI_API_KEYS must contain at least one key")]
    MissingApiKeys,

    /// `GEMINI_API_KEYS` is set but cannot be parsed.
    #[error("GEMINI_API_KEYS is malformed: {0}")]
    MalformedApiKeys(String),
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/reword").
    pub data_dir: String,

    /// Ordered pool of Gemini API keys. Required, must be non-empty.
    pub gemini_api_keys: Vec<String>,

    /// Gemini model name.
    pub gemini_model: String,

    /// Bot username used to build invite deep links.
    pub bot_username: String,

    /// External verification URL shown in verification prompts.
    pub verification_link: String,

    /// Usage limits (verification threshold, daily limit, referral bonus).
    pub limits: Limits,

    /// Interactive-session TTL in seconds.
    pub session_ttl_seconds: i64,

    /// Interval between verification-prompt expiry sweeps, in seconds.
    pub sweep_interval_seconds: u64,

    /// HTTP request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Everything has a default except the Gemini key pool: a missing or
    /// empty `GEMINI_API_KEYS` is a startup failure, not something to limp
    /// along without.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_keys = std::env::var("GEMINI_API_KEYS").map_err(|_| ConfigError::MissingApiKeys)?;
        let gemini_api_keys = parse_api_keys(&raw_keys)?;
        if gemini_api_keys.is_empty() {
            return Err(ConfigError::MissingApiKeys);
        }

        Ok(Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/reword".into()),
            gemini_api_keys,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| reword_gemini::DEFAULT_MODEL.into()),
            bot_username: std::env::var("BOT_USERNAME")
                .unwrap_or_else(|_| "ParaphraseBot".into()),
            verification_link: std::env::var("VERIFICATION_LINK")
                .unwrap_or_else(|_| "https://example.com/verify".into()),
            limits: limits_from_env(),
            session_ttl_seconds: env_parse("SESSION_TTL_SECONDS", 86_400),
            sweep_interval_seconds: env_parse("SWEEP_INTERVAL_SECONDS", 3_600),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS", 30),
        })
    }
}

/// Parse the key pool.
///
/// Accepts a JSON array of strings, a JSON object (values are taken in
/// field order), or a plain comma-separated list.
fn parse_api_keys(raw: &str) -> Result<Vec<String>, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| ConfigError::MalformedApiKeys(e.to_string()))?;
        let keys = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        ConfigError::MalformedApiKeys("array entries must be strings".into())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(name, item)| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        ConfigError::MalformedApiKeys(format!("value of {name} must be a string"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(ConfigError::MalformedApiKeys(
                    "expected a JSON array or object".into(),
                ))
            }
        };
        Ok(keys)
    } else {
        Ok(trimmed
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect())
    }
}

fn limits_from_env() -> Limits {
    let defaults = Limits::default();
    Limits {
        verification_threshold: env_parse(
            "VERIFICATION_THRESHOLD",
            defaults.verification_threshold,
        ),
        daily_limit: env_parse("DAILY_LIMIT", defaults.daily_limit),
        referral_bonus: env_parse("REFERRAL_BONUS", defaults.referral_bonus),
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_json_array() {
        let keys = parse_api_keys(r#"["k1", "k2"]"#).unwrap();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn api_keys_json_object_values() {
        let keys = parse_api_keys(r#"{"primary": "k1", "secondary": "k2"}"#).unwrap();
        assert_eq!(keys, vec!["k1", "k2"]);
    }

    #[test]
    fn api_keys_comma_separated() {
        let keys = parse_api_keys("k1, k2 ,k3").unwrap();
        assert_eq!(keys, vec!["k1", "k2", "k3"]);
    }

    #[test]
    fn api_keys_bad_json_rejected() {
        assert!(matches!(
            parse_api_keys(r#"[1, 2]"#),
            Err(ConfigError::MalformedApiKeys(_))
        ));
        assert!(matches!(
            parse_api_keys("[oops"),
            Err(ConfigError::MalformedApiKeys(_))
        ));
    }
}
