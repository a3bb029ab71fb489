//! Configuration management for Warden Core

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration. Domain cache and reload notifications are
    /// disabled when absent.
    pub redis: Option<RedisConfig>,
    /// OAuth2 grant lifetimes and reissue policy
    pub grants: GrantConfig,
    /// Name of the bootstrap master domain
    pub master_domain_name: String,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Whether storing a new access token for an existing session key replaces
/// the live token of that session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReissuePolicy {
    /// Always replace (default).
    #[default]
    Always,
    /// Never replace; several live tokens may share a session key.
    Never,
    /// Replace only when the request was issued for one of these grant types.
    GrantTypes(BTreeSet<String>),
}

impl ReissuePolicy {
    pub fn replaces(&self, grant_type: Option<&str>) -> bool {
        match self {
            ReissuePolicy::Always => true,
            ReissuePolicy::Never => false,
            ReissuePolicy::GrantTypes(types) => grant_type.is_some_and(|gt| types.contains(gt)),
        }
    }
}

/// Grant types a `GrantTypes` reissue policy may name
pub const KNOWN_GRANT_TYPES: &[&str] = &[
    "authorization_code",
    "client_credentials",
    "implicit",
    "password",
    "refresh_token",
    "urn:ietf:params:oauth:grant-type:device_code",
    "urn:ietf:params:oauth:grant-type:jwt-bearer",
    "urn:ietf:params:oauth:grant-type:saml2-bearer",
    "urn:ietf:params:oauth:grant-type:token-exchange",
];

impl std::str::FromStr for ReissuePolicy {
    type Err = String;

    /// `always`, `never`, or a comma-separated list of grant types
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(ReissuePolicy::Always),
            "never" => Ok(ReissuePolicy::Never),
            "" => Err("Empty reissue policy".to_string()),
            other => {
                let types: BTreeSet<String> = other
                    .split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                if types.is_empty() {
                    return Err(format!("Unknown reissue policy: {}", s));
                }
                if let Some(unknown) = types
                    .iter()
                    .find(|t| !KNOWN_GRANT_TYPES.contains(&t.as_str()))
                {
                    return Err(format!(
                        "Unknown reissue policy or grant type '{}' in: {}",
                        unknown, s
                    ));
                }
                Ok(ReissuePolicy::GrantTypes(types))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrantConfig {
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub authorization_code_ttl_secs: i64,
    pub reissue_policy: ReissuePolicy,
    pub purge_interval_secs: u64,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 2_592_000,
            authorization_code_ttl_secs: 300,
            reissue_policy: ReissuePolicy::default(),
            purge_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
    /// Listen address of the Prometheus scrape endpoint
    pub metrics_addr: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_addr: "0.0.0.0:9464".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = GrantConfig::default();

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            redis: env::var("REDIS_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| RedisConfig { url }),
            grants: GrantConfig {
                access_token_ttl_secs: parse_env(
                    "GRANT_ACCESS_TOKEN_TTL_SECS",
                    defaults.access_token_ttl_secs,
                )?,
                refresh_token_ttl_secs: parse_env(
                    "GRANT_REFRESH_TOKEN_TTL_SECS",
                    defaults.refresh_token_ttl_secs,
                )?,
                authorization_code_ttl_secs: parse_env(
                    "GRANT_AUTHORIZATION_CODE_TTL_SECS",
                    defaults.authorization_code_ttl_secs,
                )?,
                reissue_policy: match env::var("GRANT_REISSUE_POLICY") {
                    Ok(value) => value
                        .parse()
                        .map_err(|e: String| anyhow::anyhow!(e))
                        .context("Invalid GRANT_REISSUE_POLICY")?,
                    Err(_) => ReissuePolicy::default(),
                },
                purge_interval_secs: parse_env(
                    "GRANT_PURGE_INTERVAL_SECS",
                    defaults.purge_interval_secs,
                )?,
            },
            master_domain_name: env::var("MASTER_DOMAIN_NAME")
                .unwrap_or_else(|_| "admin".to_string()),
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
                metrics_addr: env::var("METRICS_ADDR")
                    .unwrap_or_else(|_| "0.0.0.0:9464".to_string()),
            },
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        Err(_) => Ok(default),
    }
}
