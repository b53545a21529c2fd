//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Shortest accepted `JWT_SECRET`.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Default token lifetime: seven days.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// HMAC secret for auth tokens.
    pub jwt_secret: String,
    /// Auth token lifetime in seconds.
    pub token_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `NEIGHBORS_ADDR` | Server bind address | `127.0.0.1:3000` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:neighbors.db?mode=rwc` |
    /// | `JWT_SECRET` | Token signing secret, at least 32 chars | (required) |
    /// | `TOKEN_TTL_SECS` | Token lifetime in seconds | `604800` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr = lookup("NEIGHBORS_ADDR")
            .unwrap_or_else(|| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url =
            lookup("SQLITE_PATH").unwrap_or_else(|| "sqlite:neighbors.db?mode=rwc".to_string());

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::MissingJwtSecret)?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::WeakJwtSecret);
        }

        let token_ttl_secs = match lookup("TOKEN_TTL_SECS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTokenTtl)?,
            None => DEFAULT_TOKEN_TTL_SECS,
        };

        Ok(Self {
            addr,
            database_url,
            jwt_secret,
            token_ttl_secs,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid NEIGHBORS_ADDR format")]
    InvalidAddr,

    #[error("JWT_SECRET environment variable is required")]
    MissingJwtSecret,

    #[error("JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters")]
    WeakJwtSecret,

    #[error("TOKEN_TTL_SECS must be a positive integer")]
    InvalidTokenTtl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(config.addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.database_url, "sqlite:neighbors.db?mode=rwc");
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", SECRET),
            ("NEIGHBORS_ADDR", "0.0.0.0:8080"),
            ("SQLITE_PATH", "sqlite::memory:"),
            ("TOKEN_TTL_SECS", "3600"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.token_ttl_secs, 3600);
    }

    #[test]
    fn test_secret_required() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::MissingJwtSecret)
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "short")])),
            Err(ConfigError::WeakJwtSecret)
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("NEIGHBORS_ADDR", "nope")])),
            Err(ConfigError::InvalidAddr)
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("JWT_SECRET", SECRET), ("TOKEN_TTL_SECS", "-1")])),
            Err(ConfigError::InvalidTokenTtl)
        ));
    }
}
