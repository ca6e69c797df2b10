use anyhow::{Context, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_WS_PORT: u16 = 8080;
const DEFAULT_HTTP_PORT: u16 = 8081;
const DEFAULT_HOST: &str = "127.0.0.1";

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DB_IDLE_TIMEOUT_SECS: u64 = 600;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_ISSUER: &str = "parley-server";

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3005";

// Frame and payload limits. A live frame carries one event plus codec
// overhead, so the message text budget and the WebSocket frame budget are
// the same constant.
pub const MAX_WEBSOCKET_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB
pub const MAX_MESSAGE_TEXT_BYTES: usize = MAX_WEBSOCKET_MESSAGE_SIZE;

// ============================================================================
// Configuration Structures
// ============================================================================

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool (seconds)
    pub acquire_timeout_secs: u64,
    /// Timeout for idle connections before they are closed (seconds)
    pub idle_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Log raw user identifiers instead of salted hashes
    pub log_user_ids: bool,
    /// Salt for `log_safe_id` hashes
    pub hash_salt: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Bind address for both listeners
    pub host: String,
    /// WebSocket listener port
    pub ws_port: u16,
    /// HTTP API listener port
    pub http_port: u16,
    /// Postgres connection string
    pub database_url: String,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Access token TTL in hours
    pub token_ttl_hours: i64,
    /// Token issuer claim
    pub issuer: String,
    /// Origins allowed by the HTTP API's CORS policy
    pub cors_allowed_origins: Vec<String>,
    pub db: DbConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let cors_allowed_origins = env_or("CORS_ALLOWED_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            host: env_or("HOST", DEFAULT_HOST),
            ws_port: env_parse("WS_PORT", DEFAULT_WS_PORT)?,
            http_port: env_parse("HTTP_PORT", DEFAULT_HTTP_PORT)?,
            database_url,
            jwt_secret,
            token_ttl_hours: env_parse("TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?,
            issuer: env_or("TOKEN_ISSUER", DEFAULT_ISSUER),
            cors_allowed_origins,
            db: DbConfig {
                max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
                acquire_timeout_secs: env_parse(
                    "DB_ACQUIRE_TIMEOUT_SECS",
                    DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
                )?,
                idle_timeout_secs: env_parse(
                    "DB_IDLE_TIMEOUT_SECS",
                    DEFAULT_DB_IDLE_TIMEOUT_SECS,
                )?,
            },
            logging: LoggingConfig {
                log_user_ids: env_parse("LOG_USER_IDS", false)?,
                hash_salt: env_or("LOG_HASH_SALT", "parley-log-salt"),
            },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_to_default() {
        assert_eq!(env_parse("PARLEY_TEST_UNSET_VAR", 42u16).unwrap(), 42);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        std::env::set_var("PARLEY_TEST_BAD_PORT", "not-a-port");
        assert!(env_parse("PARLEY_TEST_BAD_PORT", 0u16).is_err());
        std::env::remove_var("PARLEY_TEST_BAD_PORT");
    }
}
