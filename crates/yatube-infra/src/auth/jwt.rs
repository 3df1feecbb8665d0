//! JWT token service: session cookies and password reset links.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use yatube_core::ports::{AuthError, TokenClaims, TokenService, password_fingerprint};

const DEFAULT_SECRET: &str = "change-me-in-production";
const SESSION_PURPOSE: &str = "session";
const RESET_PURPOSE: &str = "password_reset";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub reset_timeout_days: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            expiration_hours: 24 * 14,
            reset_timeout_days: 3,
            issuer: "yatube".to_string(),
        }
    }
}

/// Claims as they travel inside the token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    exp: i64,
    iat: i64,
    iss: String,
    purpose: String,
    /// Tail of the password hash; the token dies once the password changes.
    fp: String,
}

pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        if config.secret == DEFAULT_SECRET {
            tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
        }

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }

    fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn decode(&self, token: &str, purpose: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?
            .claims;

        if claims.purpose != purpose {
            return Err(AuthError::InvalidToken(format!(
                "expected a {} token",
                purpose
            )));
        }
        Ok(claims)
    }

    fn claims(
        &self,
        user_id: i32,
        username: &str,
        password_hash: &str,
        lifetime: TimeDelta,
        purpose: &str,
    ) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            purpose: purpose.to_string(),
            fp: password_fingerprint(password_hash),
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue_session(
        &self,
        user_id: i32,
        username: &str,
        password_hash: &str,
    ) -> Result<String, AuthError> {
        let claims = self.claims(
            user_id,
            username,
            password_hash,
            TimeDelta::hours(self.config.expiration_hours),
            SESSION_PURPOSE,
        );
        self.encode(&claims)
    }

    fn validate_session(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = self.decode(token, SESSION_PURPOSE)?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|e: std::num::ParseIntError| AuthError::InvalidToken(e.to_string()))?;

        Ok(TokenClaims {
            user_id,
            username: claims.username,
            exp: claims.exp,
            password_fingerprint: claims.fp,
        })
    }

    fn issue_password_reset(
        &self,
        user_id: i32,
        password_hash: &str,
    ) -> Result<String, AuthError> {
        let claims = self.claims(
            user_id,
            "",
            password_hash,
            TimeDelta::days(self.config.reset_timeout_days),
            RESET_PURPOSE,
        );
        self.encode(&claims)
    }

    fn validate_password_reset(
        &self,
        token: &str,
        user_id: i32,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        let claims = self.decode(token, RESET_PURPOSE)?;

        if claims.sub != user_id.to_string() {
            return Err(AuthError::InvalidToken("token belongs to another user".into()));
        }
        if claims.fp != password_fingerprint(password_hash) {
            return Err(AuthError::InvalidToken("password already changed".into()));
        }
        Ok(())
    }

    fn session_seconds(&self) -> i64 {
        self.config.expiration_hours * 3600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            expiration_hours: 1,
            reset_timeout_days: 3,
            issuer: "test-issuer".to_string(),
        }
    }

    #[test]
    fn test_session_round_trip() {
        let service = JwtTokenService::new(test_config());

        let token = service.issue_session(5, "auth", "$argon2id$hash-one").unwrap();
        let claims = service.validate_session(&token).unwrap();

        assert_eq!(claims.user_id, 5);
        assert_eq!(claims.username, "auth");
        assert!(claims.matches_password("$argon2id$hash-one"));
    }

    #[test]
    fn test_session_dies_with_password_change() {
        let service = JwtTokenService::new(test_config());
        let token = service.issue_session(5, "auth", "$argon2id$hash-one").unwrap();

        let claims = service.validate_session(&token).unwrap();
        assert!(!claims.matches_password("$argon2id$hash-two"));
    }

    #[test]
    fn test_validate_invalid_token() {
        let service = JwtTokenService::new(test_config());

        let result = service.validate_session("invalid-token");

        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_validate_wrong_issuer_token() {
        let service1 = JwtTokenService::new(JwtConfig {
            issuer: "issuer1".to_string(),
            ..test_config()
        });
        let service2 = JwtTokenService::new(JwtConfig {
            issuer: "issuer2".to_string(),
            ..test_config()
        });

        let token = service1.issue_session(1, "auth", "hash").unwrap();
        assert!(service2.validate_session(&token).is_err());
    }

    #[test]
    fn test_reset_token_is_not_a_session() {
        let service = JwtTokenService::new(test_config());
        let token = service.issue_password_reset(5, "$argon2id$hash-one").unwrap();

        assert!(service.validate_session(&token).is_err());
        assert!(
            service
                .validate_password_reset(&token, 5, "$argon2id$hash-one")
                .is_ok()
        );
    }

    #[test]
    fn test_reset_token_dies_with_password_change() {
        let service = JwtTokenService::new(test_config());
        let token = service.issue_password_reset(5, "$argon2id$hash-one").unwrap();

        assert!(
            service
                .validate_password_reset(&token, 5, "$argon2id$hash-two")
                .is_err()
        );
        assert!(
            service
                .validate_password_reset(&token, 6, "$argon2id$hash-one")
                .is_err()
        );
    }

    #[test]
    fn test_session_seconds() {
        let service = JwtTokenService::new(JwtConfig {
            expiration_hours: 24,
            ..test_config()
        });

        assert_eq!(service.session_seconds(), 86400);
    }
}
