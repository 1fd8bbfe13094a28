//! JWT Token Service
//!
//! Issues and verifies the signed, time-limited credentials handed out at
//! login. Verification is a pure function of the token, the configured secret
//! and the current time.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;

/// JWT Claims structure containing the subject and token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// User unique identifier
    pub sub: Uuid,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
    /// Token issuer
    pub iss: String,
}

/// A freshly signed token and its validity window
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Whole seconds between issuance and expiry
    pub fn lifetime_seconds(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Why a presented token was refused
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token rejected: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl JwtService {
    /// Create a new JWT service from the auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret);
        let decoding_key = DecodingKey::from_secret(secret);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // Expiry is judged exactly at check time.
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.issuer.clone(),
            ttl: config.token_ttl,
        }
    }

    /// Generate a token for a user with the configured lifetime
    pub fn create_token(&self, user_id: Uuid) -> Result<IssuedToken> {
        self.issue(user_id, self.ttl)
    }

    /// Generate a token for a user that expires `ttl` from now
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed(e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    fn service(secret: &str) -> JwtService {
        JwtService::new(&AuthConfig::new(secret, Duration::seconds(60)))
    }

    #[test]
    fn test_jwt_roundtrip() {
        let jwt_service = service("test_secret");
        let user_id = Uuid::new_v4();

        let issued = jwt_service.create_token(user_id).unwrap();
        let claims = jwt_service.validate_token(&issued.token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "bearer-auth-server");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 60);
        assert_eq!(issued.lifetime_seconds(), 60);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let jwt_service = service("test_secret");
        let issued = jwt_service
            .issue(Uuid::new_v4(), Duration::seconds(-30))
            .unwrap();

        let err = jwt_service.validate_token(&issued.token).unwrap_err();
        assert!(matches!(err, TokenError::Expired), "got {err:?}");
    }

    #[test]
    fn garbage_is_malformed() {
        let jwt_service = service("test_secret");
        for token in ["", "garbage", "a.b.c", "invalid.token.here"] {
            let err = jwt_service.validate_token(token).unwrap_err();
            assert!(matches!(err, TokenError::Malformed(_)), "{token}: {err:?}");
        }
    }

    #[test]
    fn different_secret_is_malformed() {
        let issued = service("secret1").create_token(Uuid::new_v4()).unwrap();
        let err = service("secret2").validate_token(&issued.token).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn expired_token_with_wrong_secret_is_malformed() {
        let issued = service("secret1")
            .issue(Uuid::new_v4(), Duration::seconds(-30))
            .unwrap();
        let err = service("secret2").validate_token(&issued.token).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn tampered_payload_is_malformed() {
        let jwt_service = service("test_secret");
        let issued = jwt_service.create_token(Uuid::new_v4()).unwrap();

        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();
        let forged = Claims {
            sub: Uuid::new_v4(),
            iat: 0,
            exp: i64::from(i32::MAX),
            iss: "bearer-auth-server".to_string(),
        };
        let forged_json = serde_json::to_vec(&forged).unwrap();
        parts[1] = URL_SAFE_NO_PAD.encode(forged_json);
        let tampered = parts.join(".");

        let err = jwt_service.validate_token(&tampered).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn foreign_issuer_is_malformed() {
        let mut other = AuthConfig::new("test_secret", Duration::seconds(60));
        other.issuer = "someone-else".to_string();
        let issued = JwtService::new(&other).create_token(Uuid::new_v4()).unwrap();

        let err = service("test_secret").validate_token(&issued.token).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }
}
