use std::env;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use airiss_core::ai::DEFAULT_MODEL;
use axum::http::HeaderValue;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Server settings, read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// CORS origin. `None` allows any origin.
    pub client_origin: Option<HeaderValue>,
    pub max_upload_bytes: usize,
    /// Rows analyzed in parallel within one job.
    pub analysis_concurrency: usize,
    /// Used when a request turns AI feedback on without its own key.
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_endpoint: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            client_origin: None,
            max_upload_bytes: 20 * 1024 * 1024,
            analysis_concurrency: 4,
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_endpoint: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let client_origin = match get("CLIENT_URL") {
            Some(url) => Some(url.parse::<HeaderValue>().map_err(|e| ConfigError {
                var: "CLIENT_URL",
                value: url.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let analysis_concurrency: usize =
            parse_var(&get, "ANALYSIS_CONCURRENCY", defaults.analysis_concurrency)?;
        if analysis_concurrency == 0 {
            return Err(ConfigError {
                var: "ANALYSIS_CONCURRENCY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: parse_var(&get, "AIRISS_HOST", defaults.host)?,
            port: parse_var(&get, "AIRISS_PORT", defaults.port)?,
            client_origin,
            max_upload_bytes: parse_var(&get, "AIRISS_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            analysis_concurrency,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_endpoint: get("OPENAI_ENDPOINT"),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn parse_var<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
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
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr(), "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
        assert!(config.client_origin.is_none());
        assert_eq!(config.analysis_concurrency, 4);
        assert_eq!(config.openai_model, DEFAULT_MODEL);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("AIRISS_HOST", "0.0.0.0"),
            ("AIRISS_PORT", "9090"),
            ("CLIENT_URL", "http://localhost:5173"),
            ("ANALYSIS_CONCURRENCY", "2"),
            ("OPENAI_API_KEY", "  sk-live  "),
            ("OPENAI_MODEL", ""),
        ]))
        .unwrap();
        assert_eq!(config.addr(), "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
        assert_eq!(
            config.client_origin,
            Some(HeaderValue::from_static("http://localhost:5173"))
        );
        assert_eq!(config.analysis_concurrency, 2);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-live"));
        assert_eq!(config.openai_model, DEFAULT_MODEL);
    }

    #[test]
    fn bad_values_name_the_variable() {
        let err = Config::from_lookup(lookup(&[("AIRISS_PORT", "eighty")])).unwrap_err();
        assert_eq!(err.var, "AIRISS_PORT");

        let err = Config::from_lookup(lookup(&[("ANALYSIS_CONCURRENCY", "0")])).unwrap_err();
        assert_eq!(err.var, "ANALYSIS_CONCURRENCY");
    }
}
