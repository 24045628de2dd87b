//! Configuration types, built from environment variables.
//!
//! Everything is validated up front: a missing required value or an
//! unparsable schedule is a startup error and the service never enters its
//! run loop.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{DEFAULT_TEMPERATURE, LlmConfig};
use crate::mail::GmailAuth;
use crate::mail::gmail::DEFAULT_GMAIL_BASE_URL;
use crate::pipeline::processor::DEFAULT_MAX_RESULTS;
use crate::scheduler;

/// Placeholder key for local model servers that ignore authentication.
pub const DEFAULT_LLM_API_KEY: &str = "sk-local-key";

/// Every five minutes.
pub const DEFAULT_CRON_SCHEDULE: &str = "*/5 * * * *";

pub const DEFAULT_TOKEN_PATH: &str = "token.json";

/// Hard cap on `MAX_RESULTS_PER_RUN` (the Gmail list endpoint's page limit).
const MAX_RESULTS_LIMIT: u32 = 500;

/// Where Gmail credentials come from.
#[derive(Debug, Clone)]
pub enum GmailCredentials {
    /// `GMAIL_ACCESS_TOKEN`.
    AccessToken(SecretString),
    /// `GMAIL_TOKEN_PATH` (an `authorized_user` token file).
    TokenFile(PathBuf),
}

/// Mail provider configuration.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub base_url: String,
    pub credentials: GmailCredentials,
}

impl GmailConfig {
    /// Build the token source. Reads the token file if one is configured.
    pub fn auth(&self) -> Result<GmailAuth, ConfigError> {
        match &self.credentials {
            GmailCredentials::AccessToken(token) => Ok(GmailAuth::Static(token.clone())),
            GmailCredentials::TokenFile(path) => GmailAuth::from_token_file(path),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub gmail: GmailConfig,
    /// Schedule expression as given (for display).
    pub cron_expression: String,
    pub schedule: cron::Schedule,
    pub max_results: u32,
    /// Directory for a daily-rolling log file, if file logging is wanted.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let base_url = require("LLM_BASE_URL")?;
        let model = require("LLM_MODEL")?;
        let api_key = get("LLM_API_KEY").unwrap_or_else(|| DEFAULT_LLM_API_KEY.to_string());

        let temperature = match get("LLM_TEMPERATURE") {
            Some(raw) => {
                let value: f32 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "LLM_TEMPERATURE".into(),
                    message: format!("'{raw}' is not a number"),
                })?;
                if !(0.0..=2.0).contains(&value) {
                    return Err(ConfigError::InvalidValue {
                        key: "LLM_TEMPERATURE".into(),
                        message: format!("{value} is outside 0.0..=2.0"),
                    });
                }
                value
            }
            None => DEFAULT_TEMPERATURE,
        };

        let cron_expression =
            get("CRON_SCHEDULE").unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.to_string());
        let schedule = scheduler::parse_schedule(&cron_expression)?;

        let max_results = match get("MAX_RESULTS_PER_RUN") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| (1..=MAX_RESULTS_LIMIT).contains(n))
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "MAX_RESULTS_PER_RUN".into(),
                    message: format!("'{raw}' must be an integer in 1..={MAX_RESULTS_LIMIT}"),
                })?,
            None => DEFAULT_MAX_RESULTS,
        };

        let credentials = match get("GMAIL_ACCESS_TOKEN") {
            Some(token) => GmailCredentials::AccessToken(SecretString::from(token)),
            None => GmailCredentials::TokenFile(PathBuf::from(
                get("GMAIL_TOKEN_PATH").unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string()),
            )),
        };

        Ok(Self {
            llm: LlmConfig {
                base_url,
                api_key: SecretString::from(api_key),
                model,
                temperature,
            },
            gmail: GmailConfig {
                base_url: get("GMAIL_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GMAIL_BASE_URL.to_string()),
                credentials,
            },
            cron_expression,
            schedule,
            max_results,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("LLM_BASE_URL", "http://localhost:11434/v1"),
        ("LLM_MODEL", "gemma3"),
    ];

    fn with_required(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.llm.model, "gemma3");
        assert_eq!(config.llm.api_key.expose_secret(), DEFAULT_LLM_API_KEY);
        assert_eq!(config.llm.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(config.cron_expression, DEFAULT_CRON_SCHEDULE);
        assert_eq!(config.max_results, 10);
        assert_eq!(config.gmail.base_url, DEFAULT_GMAIL_BASE_URL);
        assert!(matches!(
            config.gmail.credentials,
            GmailCredentials::TokenFile(ref p) if p == &PathBuf::from("token.json")
        ));
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn missing_base_url_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("LLM_MODEL", "gemma3")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "LLM_BASE_URL"));
    }

    #[test]
    fn blank_model_counts_as_missing() {
        let err = AppConfig::from_lookup(lookup(&[
            ("LLM_BASE_URL", "http://localhost:8080/v1"),
            ("LLM_MODEL", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "LLM_MODEL"));
    }

    #[test]
    fn invalid_cron_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&with_required(&[("CRON_SCHEDULE", "every five minutes")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "CRON_SCHEDULE"));
    }

    #[test]
    fn temperature_is_validated() {
        let config =
            AppConfig::from_lookup(lookup(&with_required(&[("LLM_TEMPERATURE", "0.4")]))).unwrap();
        assert_eq!(config.llm.temperature, 0.4);

        let err = AppConfig::from_lookup(lookup(&with_required(&[("LLM_TEMPERATURE", "hot")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LLM_TEMPERATURE"));

        let err = AppConfig::from_lookup(lookup(&with_required(&[("LLM_TEMPERATURE", "3.5")])))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn max_results_is_bounded() {
        let config =
            AppConfig::from_lookup(lookup(&with_required(&[("MAX_RESULTS_PER_RUN", "25")]))).unwrap();
        assert_eq!(config.max_results, 25);

        for bad in ["0", "501", "-3", "ten"] {
            let err = AppConfig::from_lookup(lookup(&with_required(&[("MAX_RESULTS_PER_RUN", bad)])))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }), "{bad}");
        }
    }

    #[test]
    fn access_token_takes_precedence_over_token_file() {
        let config = AppConfig::from_lookup(lookup(&with_required(&[
            ("GMAIL_ACCESS_TOKEN", "ya29.abc"),
            ("GMAIL_TOKEN_PATH", "/etc/labeler/token.json"),
        ])))
        .unwrap();
        assert!(matches!(
            config.gmail.credentials,
            GmailCredentials::AccessToken(ref t) if t.expose_secret() == "ya29.abc"
        ));
        assert!(config.gmail.auth().is_ok());
    }

    #[test]
    fn missing_token_file_fails_auth_construction() {
        let config = AppConfig::from_lookup(lookup(&with_required(&[(
            "GMAIL_TOKEN_PATH",
            "/nonexistent/token.json",
        )])))
        .unwrap();
        assert!(matches!(
            config.gmail.auth().unwrap_err(),
            ConfigError::MissingRequired { .. }
        ));
    }

    #[test]
    fn optional_paths_and_urls() {
        let config = AppConfig::from_lookup(lookup(&with_required(&[
            ("LOG_DIR", "/var/log/inbox-labeler"),
            ("GMAIL_API_BASE_URL", "http://127.0.0.1:9000"),
            ("LLM_API_KEY", "sk-real"),
        ])))
        .unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/inbox-labeler")));
        assert_eq!(config.gmail.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.llm.api_key.expose_secret(), "sk-real");
    }
}
