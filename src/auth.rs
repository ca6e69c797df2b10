use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub jti: String, // JWT ID (unique per token)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub iss: String, // Issuer
}

/// Verifies bearer credentials and mints tokens for tooling and tests.
///
/// HS256 with a single shared secret. Token verification is synchronous so
/// it can run inside the WebSocket handshake callback.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_hours: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.jwt_secret.trim().is_empty() {
            return Err(AppError::Config("JWT secret is empty".to_string()));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_ttl_hours: config.token_ttl_hours,
            issuer: config.issuer.clone(),
        })
    }

    /// Creates a signed bearer token for the given identity.
    pub fn create_token(&self, user_id: &Uuid) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + Duration::hours(self.token_ttl_hours)).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verifies a bearer token and returns its claims.
    ///
    /// Expired and malformed tokens come back as distinct
    /// `jsonwebtoken::errors::ErrorKind`s inside `AppError::Jwt`, so callers
    /// can tell a re-authentication case from a hard failure.
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Verifies a token and parses its subject as a user identity.
    pub fn verify_identity(&self, token: &str) -> AppResult<Uuid> {
        let claims = self.verify_token(token)?;
        Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Auth("Token subject is not a valid identity".to_string()))
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, LoggingConfig};

    fn test_config(secret: &str) -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            ws_port: 0,
            http_port: 0,
            database_url: "postgres://unused".to_string(),
            jwt_secret: secret.to_string(),
            token_ttl_hours: 1,
            issuer: "parley-server".to_string(),
            cors_allowed_origins: vec![],
            db: DbConfig {
                max_connections: 1,
                acquire_timeout_secs: 1,
                idle_timeout_secs: 1,
            },
            logging: LoggingConfig {
                log_user_ids: true,
                hash_salt: "salt".to_string(),
            },
        }
    }

    #[test]
    fn token_roundtrip() {
        let auth = AuthManager::new(&test_config("secret-a")).unwrap();
        let user_id = Uuid::new_v4();

        let token = auth.create_token(&user_id).unwrap();
        let verified = auth.verify_identity(&token).unwrap();

        assert_eq!(verified, user_id);
    }

    #[test]
    fn token_from_wrong_secret_is_rejected() {
        let minted_by = AuthManager::new(&test_config("secret-a")).unwrap();
        let verified_by = AuthManager::new(&test_config("secret-b")).unwrap();

        let token = minted_by.create_token(&Uuid::new_v4()).unwrap();
        assert!(matches!(
            verified_by.verify_token(&token),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = AuthManager::new(&test_config("secret-a")).unwrap();
        assert!(auth.verify_token("not-a-token").is_err());
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
