//! JWT service for access token generation and validation
//!
//! Tokens are signed with RS256. The auth service holds the private key and
//! issues tokens; the api service only holds the public key and verifies
//! them. Every token carries a `jti` so it can be revoked on logout.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{error::TokenError, role::Role};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens, absent on verify-only services
    pub private_key: Option<String>,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Token expiration time in seconds (default: 1 day)
    pub token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key (PEM) or path to a PEM file, optional
    /// - `JWT_PUBLIC_KEY`: Public key (PEM) or path to a PEM file
    /// - `JWT_TOKEN_EXPIRY`: Token expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self, TokenError> {
        let private_key = match std::env::var("JWT_PRIVATE_KEY") {
            Ok(value) => Some(read_pem(&value)?),
            Err(_) => None,
        };

        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .map_err(|_| TokenError::Key("JWT_PUBLIC_KEY environment variable not set".into()))?;
        let public_key = read_pem(&public_key)?;

        let token_expiry = std::env::var("JWT_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        Ok(JwtConfig {
            private_key,
            public_key,
            token_expiry,
        })
    }
}

/// Inline PEM is used as-is, anything else is treated as a file path
fn read_pem(value: &str) -> Result<String, TokenError> {
    if value.starts_with("-----BEGIN") {
        return Ok(value.to_string());
    }

    std::fs::read_to_string(value)
        .map(|pem| pem.trim().to_string())
        .map_err(|e| TokenError::Key(format!("Failed to read key file {}: {}", value, e)))
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// User role at the time of issue
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token id, used for revocation
    pub jti: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self, TokenError> {
        let encoding_key = config
            .private_key
            .as_deref()
            .map(|pem| EncodingKey::from_rsa_pem(pem.as_bytes()))
            .transpose()
            .map_err(|e| TokenError::Key(format!("Invalid private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())
            .map_err(|e| TokenError::Key(format!("Invalid public key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Issue an access token for a user
    pub fn issue_token(&self, user_id: Uuid, role: Role) -> Result<String, TokenError> {
        let encoding_key = self
            .encoding_key
            .as_ref()
            .ok_or(TokenError::SigningDisabled)?;
        let now = now_secs()?;

        let claims = Claims {
            sub: user_id,
            role,
            iat: now,
            exp: now + self.config.token_expiry,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::RS256), &claims, encoding_key)?;
        Ok(token)
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Seconds until the token expires, zero if it already has
    pub fn remaining_lifetime(&self, claims: &Claims) -> Result<u64, TokenError> {
        Ok(claims.exp.saturating_sub(now_secs()?))
    }

    /// Get the token expiry time
    pub fn token_expiry(&self) -> u64 {
        self.config.token_expiry
    }
}

fn now_secs() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| TokenError::Clock)
}

/// RSA key pair used by tests across the workspace
#[doc(hidden)]
pub mod test_keys {
    pub const PRIVATE_KEY: &str = include_str!("../test-keys/private.pem");
    pub const PUBLIC_KEY: &str = include_str!("../test-keys/public.pem");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn signing_service() -> JwtService {
        JwtService::new(JwtConfig {
            private_key: Some(test_keys::PRIVATE_KEY.to_string()),
            public_key: test_keys::PUBLIC_KEY.to_string(),
            token_expiry: 3600,
        })
        .unwrap()
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let service = signing_service();
        let user_id = Uuid::new_v4();

        let token = service.issue_token(user_id, Role::Admin).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(Uuid::parse_str(&claims.jti).is_ok());
        assert!(service.remaining_lifetime(&claims).unwrap() <= 3600);
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let service = signing_service();
        let user_id = Uuid::new_v4();

        let a = service.issue_token(user_id, Role::User).unwrap();
        let b = service.issue_token(user_id, Role::User).unwrap();
        let a = service.validate_token(&a).unwrap();
        let b = service.validate_token(&b).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn verify_only_service_cannot_sign() {
        let service = JwtService::new(JwtConfig {
            private_key: None,
            public_key: test_keys::PUBLIC_KEY.to_string(),
            token_expiry: 3600,
        })
        .unwrap();

        let result = service.issue_token(Uuid::new_v4(), Role::User);
        assert!(matches!(result, Err(TokenError::SigningDisabled)));

        let token = signing_service()
            .issue_token(Uuid::new_v4(), Role::User)
            .unwrap();
        assert!(service.validate_token(&token).is_ok());
    }

    #[test]
    fn rejects_expired_token() {
        let service = signing_service();
        let now = now_secs().unwrap();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::User,
            iat: now - 7200,
            exp: now - 3600,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            service.encoding_key.as_ref().unwrap(),
        )
        .unwrap();

        assert!(matches!(
            service.validate_token(&token),
            Err(TokenError::Invalid(_))
        ));
        assert_eq!(service.remaining_lifetime(&claims).unwrap(), 0);
    }

    #[test]
    fn rejects_tampered_token() {
        let service = signing_service();
        let token = service.issue_token(Uuid::new_v4(), Role::User).unwrap();
        let tampered = format!("{}x", token);

        assert!(service.validate_token(&tampered).is_err());
        assert!(service.validate_token("garbage").is_err());
    }

    #[test]
    fn rejects_invalid_key_material() {
        let result = JwtService::new(JwtConfig {
            private_key: None,
            public_key: "-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----".into(),
            token_expiry: 60,
        });
        assert!(matches!(result, Err(TokenError::Key(_))));
    }

    #[test]
    #[serial]
    fn test_jwt_config_from_env() {
        unsafe {
            std::env::remove_var("JWT_PRIVATE_KEY");
            std::env::set_var("JWT_PUBLIC_KEY", test_keys::PUBLIC_KEY);
            std::env::remove_var("JWT_TOKEN_EXPIRY");
        }

        let config = JwtConfig::from_env().unwrap();
        assert!(config.private_key.is_none());
        assert_eq!(config.public_key, test_keys::PUBLIC_KEY);
        assert_eq!(config.token_expiry, 86400);

        unsafe {
            std::env::set_var("JWT_PUBLIC_KEY", "/definitely/missing/key.pem");
        }
        assert!(matches!(JwtConfig::from_env(), Err(TokenError::Key(_))));

        unsafe {
            std::env::remove_var("JWT_PUBLIC_KEY");
        }
        assert!(JwtConfig::from_env().is_err());
    }
}
