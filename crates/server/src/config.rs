//! Environment-driven server configuration, validated once at startup.

use crate::error::ConfigError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://hapi.humdata.org/api/v2";
pub const DEFAULT_OPENAPI_URL: &str = "https://hapi.humdata.org/openapi.json";
pub const DEFAULT_TIMEOUT_SECS: f64 = 30.0;
pub const DEFAULT_RATE_LIMIT_REQUESTS: usize = 10;
pub const DEFAULT_RATE_LIMIT_PERIOD_SECS: f64 = 60.0;
pub const DEFAULT_APP_NAME: &str = "hdx-mcp-server";
pub const DEFAULT_APP_EMAIL: &str = "assistant@example.com";
pub const DEFAULT_MAX_REF_DEPTH: usize = 10;

#[derive(Clone, PartialEq)]
pub struct ServerConfig {
    pub api_key: String,
    pub base_url: String,
    /// http(s) URL or local file path.
    pub openapi_url: String,
    pub timeout: Duration,
    pub rate_limit_requests: usize,
    pub rate_limit_period: Duration,
    pub app_name: String,
    pub app_email: String,
    pub max_ref_depth: usize,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("openapi_url", &self.openapi_url)
            .field("timeout", &self.timeout)
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("rate_limit_period", &self.rate_limit_period)
            .field("app_name", &self.app_name)
            .field("app_email", &self.app_email)
            .field("max_ref_depth", &self.max_ref_depth)
            .finish()
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `HDX_API_KEY` is absent or blank, and
    /// [`ConfigError::Invalid`] for unparseable or out-of-range values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    ///
    /// Values are trimmed. Blank optional values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get("HDX_API_KEY").ok_or_else(|| ConfigError::Missing {
            key: "HDX_API_KEY".to_string(),
        })?;

        let base_url = get("HDX_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validate_http_url("HDX_BASE_URL", &base_url)?;

        let openapi_url =
            get("HDX_OPENAPI_URL").unwrap_or_else(|| DEFAULT_OPENAPI_URL.to_string());
        if openapi_url.starts_with("http://") || openapi_url.starts_with("https://") {
            validate_http_url("HDX_OPENAPI_URL", &openapi_url)?;
        }

        let timeout = parse_seconds("HDX_TIMEOUT", get("HDX_TIMEOUT"), DEFAULT_TIMEOUT_SECS)?;
        let rate_limit_requests = parse_count(
            "HDX_RATE_LIMIT_REQUESTS",
            get("HDX_RATE_LIMIT_REQUESTS"),
            DEFAULT_RATE_LIMIT_REQUESTS,
        )?;
        let rate_limit_period = parse_seconds(
            "HDX_RATE_LIMIT_PERIOD",
            get("HDX_RATE_LIMIT_PERIOD"),
            DEFAULT_RATE_LIMIT_PERIOD_SECS,
        )?;
        let max_ref_depth = parse_count(
            "HDX_MAX_REF_DEPTH",
            get("HDX_MAX_REF_DEPTH"),
            DEFAULT_MAX_REF_DEPTH,
        )?;

        Ok(Self {
            api_key,
            base_url,
            openapi_url,
            timeout,
            rate_limit_requests,
            rate_limit_period,
            app_name: get("HDX_APP_NAME").unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            app_email: get("HDX_APP_EMAIL").unwrap_or_else(|| DEFAULT_APP_EMAIL.to_string()),
            max_ref_depth,
        })
    }
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid(key, value, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(key, value, "must be an http or https URL"));
    }
    Ok(())
}

fn parse_seconds(key: &str, raw: Option<String>, default: f64) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs_f64(default));
    };
    let secs: f64 = raw
        .parse()
        .map_err(|_| invalid(key, &raw, "expected a number of seconds"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(invalid(key, &raw, "must be greater than zero"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, &raw, e.to_string()))
}

fn parse_count(key: &str, raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let n: usize = raw
        .parse()
        .map_err(|_| invalid(key, &raw, "expected a positive integer"))?;
    if n == 0 {
        return Err(invalid(key, &raw, "must be at least 1"));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let cfg = ServerConfig::from_lookup(lookup(&[("HDX_API_KEY", "k")])).unwrap();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.openapi_url, DEFAULT_OPENAPI_URL);
        assert_eq!(cfg.timeout, Duration::from_secs(30));
        assert_eq!(cfg.rate_limit_requests, 10);
        assert_eq!(cfg.rate_limit_period, Duration::from_secs(60));
        assert_eq!(cfg.app_name, "hdx-mcp-server");
        assert_eq!(cfg.app_email, "assistant@example.com");
        assert_eq!(cfg.max_ref_depth, 10);
    }

    #[test]
    fn missing_empty_or_blank_key_names_the_key() {
        for pairs in [vec![], vec![("HDX_API_KEY", "")], vec![("HDX_API_KEY", "  \t\n")]] {
            let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Missing {
                    key: "HDX_API_KEY".to_string()
                }
            );
            assert!(err.to_string().contains("HDX_API_KEY"));
        }
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("HDX_API_KEY", "  secret-key \n"),
            ("HDX_RATE_LIMIT_REQUESTS", " 2 "),
            ("HDX_RATE_LIMIT_PERIOD", "1.5"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_key, "secret-key");
        assert_eq!(cfg.rate_limit_requests, 2);
        assert_eq!(cfg.rate_limit_period, Duration::from_millis(1500));
    }

    #[test]
    fn invalid_numbers_name_the_key() {
        for (key, value) in [
            ("HDX_TIMEOUT", "soon"),
            ("HDX_TIMEOUT", "-1"),
            ("HDX_RATE_LIMIT_REQUESTS", "0"),
            ("HDX_RATE_LIMIT_PERIOD", "0"),
            ("HDX_MAX_REF_DEPTH", "ten"),
        ] {
            let err =
                ServerConfig::from_lookup(lookup(&[("HDX_API_KEY", "k"), (key, value)])).unwrap_err();
            match err {
                ConfigError::Invalid { key: k, .. } => assert_eq!(k, key),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn base_url_must_be_http() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("HDX_API_KEY", "k"),
            ("HDX_BASE_URL", "ftp://example.org"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn openapi_location_may_be_a_file() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("HDX_API_KEY", "k"),
            ("HDX_OPENAPI_URL", "./openapi.yaml"),
        ]))
        .unwrap();
        assert_eq!(cfg.openapi_url, "./openapi.yaml");
    }

    #[test]
    fn debug_output_hides_the_key() {
        let cfg = ServerConfig::from_lookup(lookup(&[("HDX_API_KEY", "top-secret")])).unwrap();
        assert!(!format!("{cfg:?}").contains("top-secret"));
    }
}
