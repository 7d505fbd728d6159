use std::net::SocketAddr;

use anyhow::{bail, Context, Result};

use crate::api::tokens::TOKEN_LIFETIME_DAYS;
use crate::db::DbConfig;

/// Signing secret used when `RSVP_DEV` is on and no secret is configured.
pub const DEV_JWT_SECRET: &str = "rsvp-dev-secret-do-not-use-in-production";

/// Which `Store` implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub store: StoreBackend,
    pub jwt_secret: String,
    /// True when `jwt_secret` is [`DEV_JWT_SECRET`].
    pub dev_secret: bool,
    pub token_lifetime_days: i64,
    pub database: DbConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut listen_addr: SocketAddr = var("RSVP_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:5000".to_string())
            .parse()
            .context("RSVP_LISTEN_ADDR is not a socket address")?;

        if let Some(port) = var("PORT") {
            listen_addr.set_port(port.parse().context("PORT is not a port number")?);
        }

        let log_level = var("RSVP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_mode = var("RSVP_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let store = match var("RSVP_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("RSVP_STORE must be 'postgres' or 'memory', got '{other}'"),
        };

        let (jwt_secret, dev_secret) = match var("RSVP_JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => (secret, false),
            None if dev_mode => (DEV_JWT_SECRET.to_string(), true),
            None => {
                bail!("RSVP_JWT_SECRET must be set (or enable RSVP_DEV for a development secret)")
            }
        };

        let token_lifetime_days = match var("RSVP_TOKEN_TTL_DAYS") {
            Some(raw) => {
                let days: i64 = raw.parse().context("RSVP_TOKEN_TTL_DAYS is not a number")?;
                if days <= 0 {
                    bail!("RSVP_TOKEN_TTL_DAYS must be positive");
                }
                days
            }
            None => TOKEN_LIFETIME_DAYS,
        };

        let defaults = DbConfig::default();
        let database = DbConfig {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url.clone()),
            max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            min_connections: var("DB_MIN_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_connections),
            ..defaults
        };

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            store,
            jwt_secret,
            dev_secret,
            token_lifetime_days,
            database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_in_dev_mode() {
        let config = Config::from_lookup(lookup(&[("RSVP_DEV", "true")])).unwrap();
        assert_eq!(config.listen_addr.port(), 5000);
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert!(config.dev_secret);
        assert_eq!(config.token_lifetime_days, 7);
    }

    #[test]
    fn test_secret_required_outside_dev_mode() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("RSVP_JWT_SECRET", "s3cret"),
            ("RSVP_LISTEN_ADDR", "0.0.0.0:8080"),
            ("PORT", "9000"),
            ("RSVP_STORE", "memory"),
            ("RSVP_TOKEN_TTL_DAYS", "1"),
            ("DATABASE_URL", "postgres://db/events"),
        ]))
        .unwrap();

        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(config.store, StoreBackend::Memory);
        assert!(!config.dev_secret);
        assert_eq!(config.token_lifetime_days, 1);
        assert_eq!(config.database.database_url, "postgres://db/events");
    }

    #[test]
    fn test_unknown_store_is_rejected() {
        let result = Config::from_lookup(lookup(&[("RSVP_DEV", "1"), ("RSVP_STORE", "mongo")]));
        assert!(result.is_err());
    }
}
