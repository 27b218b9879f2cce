//! JWT token generation and validation
//!
//! HS256 tokens carrying the user's identity and permission level.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::permissions::PermissionLevel;
use crate::types::ShowroomError;

/// JWT claims carried in every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's document ID (hex ObjectId)
    pub sub: String,
    /// User identifier (email)
    pub identifier: String,
    /// Permission level granted to this token
    pub permission_level: PermissionLevel,
    /// Issued-at (unix seconds)
    pub iat: u64,
    /// Expiry (unix seconds)
    pub exp: u64,
}

/// Input for token generation
#[derive(Debug, Clone)]
pub struct TokenInput {
    pub user_id: String,
    pub identifier: String,
    pub permission_level: PermissionLevel,
}

/// Issues and validates HS256 access tokens
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: u64,
}

impl JwtValidator {
    /// Create a validator from a shared secret
    pub fn new(secret: &str, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Generate a signed token for the given input
    pub fn generate_token(&self, input: TokenInput) -> Result<String, ShowroomError> {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: input.user_id,
            identifier: input.identifier,
            permission_level: input.permission_level,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ShowroomError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verify a token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, ShowroomError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| ShowroomError::Auth(format!("Invalid token: {}", e)))
    }
}

/// Extract a bearer token from an Authorization header value
pub fn extract_token_from_header(header: Option<&str>) -> Option<&str> {
    let header = header?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret", 3600)
    }

    fn input() -> TokenInput {
        TokenInput {
            user_id: "64b64a2f9d1c2a0001abcdef".to_string(),
            identifier: "user@example.com".to_string(),
            permission_level: PermissionLevel::Authenticated,
        }
    }

    #[test]
    fn test_round_trip() {
        let jwt = validator();
        let token = jwt.generate_token(input()).unwrap();
        let claims = jwt.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "64b64a2f9d1c2a0001abcdef");
        assert_eq!(claims.identifier, "user@example.com");
        assert_eq!(claims.permission_level, PermissionLevel::Authenticated);
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = validator().generate_token(input()).unwrap();
        let other = JwtValidator::new("different-secret", 3600);
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(validator().verify_token("not.a.jwt").is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(
            extract_token_from_header(Some("bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(None), None);
    }
}
