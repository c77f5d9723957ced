//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Client configuration, read from `DERSIMIZ_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server origin, without the `/api/v1` suffix.
    pub api_url: String,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Location of the local credential database.
    pub db_path: PathBuf,
    /// Support unread-count polling interval.
    pub support_poll_interval: Duration,
    /// Approval-status polling interval (tutors only).
    pub approval_poll_interval: Duration,
    /// ISO country code sent with OTP requests.
    pub country_code: String,
    /// Dialing prefix prepended to national phone numbers.
    pub phone_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            http_timeout: Duration::from_secs(30),
            db_path: PathBuf::from("./data/dersimiz.db"),
            support_poll_interval: Duration::from_secs(20),
            approval_poll_interval: Duration::from_secs(30),
            country_code: "TR".to_string(),
            phone_prefix: "+90".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup. Unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("DERSIMIZ_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_url);

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "DERSIMIZ_API_URL".to_string(),
                message: format!("expected an http(s) URL, got {api_url:?}"),
            });
        }

        let secs = |key: &str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("expected a positive number of seconds, got {raw:?}"),
                    }),
            }
        };

        Ok(Self {
            api_url,
            http_timeout: secs("DERSIMIZ_HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
            db_path: lookup("DERSIMIZ_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            support_poll_interval: secs(
                "DERSIMIZ_SUPPORT_POLL_SECS",
                defaults.support_poll_interval,
            )?,
            approval_poll_interval: secs(
                "DERSIMIZ_APPROVAL_POLL_SECS",
                defaults.approval_poll_interval,
            )?,
            country_code: lookup("DERSIMIZ_COUNTRY_CODE").unwrap_or(defaults.country_code),
            phone_prefix: lookup("DERSIMIZ_PHONE_PREFIX").unwrap_or(defaults.phone_prefix),
        })
    }

    /// Versioned API base, e.g. `http://localhost:3000/api/v1`.
    pub fn api_base(&self) -> String {
        format!("{}/api/v1", self.api_url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.api_base(), "http://localhost:3000/api/v1");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.support_poll_interval, Duration::from_secs(20));
        assert_eq!(config.approval_poll_interval, Duration::from_secs(30));
        assert_eq!(config.country_code, "TR");
        assert_eq!(config.phone_prefix, "+90");
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DERSIMIZ_API_URL", "https://api.example.com/"),
            ("DERSIMIZ_HTTP_TIMEOUT_SECS", "5"),
            ("DERSIMIZ_DB_PATH", "/tmp/x.db"),
        ]))
        .unwrap();
        assert_eq!(config.api_base(), "https://api.example.com/api/v1");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn rejects_bad_values() {
        let err = ClientConfig::from_lookup(lookup(&[("DERSIMIZ_API_URL", "ftp://nope")]));
        assert!(err.is_err());

        let err = ClientConfig::from_lookup(lookup(&[("DERSIMIZ_SUPPORT_POLL_SECS", "0")]));
        assert!(matches!(err, Err(ConfigError::InvalidValue { key, .. }) if key == "DERSIMIZ_SUPPORT_POLL_SECS"));
    }
}
