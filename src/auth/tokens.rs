//! Locally issued access/refresh JWTs (HS256)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("expected {expected:?} token")]
    WrongType { expected: TokenType },
}

#[derive(Debug)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub fn issue_token(
    secret: &str,
    user_id: &str,
    token_type: TokenType,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (now + ttl).timestamp().max(0) as usize,
        iat: now.timestamp().max(0) as usize,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn issue_pair(config: &AppConfig, user_id: &str) -> Result<TokenPair, TokenError> {
    Ok(TokenPair {
        access: issue_token(
            &config.jwt_secret,
            user_id,
            TokenType::Access,
            config.access_token_ttl,
        )?,
        refresh: issue_token(
            &config.jwt_secret,
            user_id,
            TokenType::Refresh,
            config.refresh_token_ttl,
        )?,
    })
}

/// Verify signature and expiry, then check the token type
pub fn decode_token(secret: &str, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;

    if decoded.claims.token_type != expected {
        return Err(TokenError::WrongType { expected });
    }
    Ok(decoded.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key";

    #[test]
    fn test_access_token_decodes() {
        let token = issue_token(SECRET, "U_ABC123", TokenType::Access, Duration::minutes(5))
            .unwrap();
        let claims = decode_token(SECRET, &token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "U_ABC123");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_fails() {
        let token = issue_token(SECRET, "U_ABC123", TokenType::Access, Duration::minutes(5))
            .unwrap();
        assert!(matches!(
            decode_token("wrong_secret_key", &token, TokenType::Access),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let token = issue_token(SECRET, "U_ABC123", TokenType::Refresh, Duration::days(1))
            .unwrap();
        assert!(matches!(
            decode_token(SECRET, &token, TokenType::Access),
            Err(TokenError::WrongType { .. })
        ));
        assert!(decode_token(SECRET, &token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_expired_token_fails() {
        let token = issue_token(SECRET, "U_ABC123", TokenType::Access, Duration::hours(-2))
            .unwrap();
        assert!(decode_token(SECRET, &token, TokenType::Access).is_err());
    }

    #[test]
    fn test_pair_tokens_are_distinct() {
        let config = AppConfig {
            jwt_secret: SECRET.to_string(),
            ..AppConfig::default()
        };
        let pair = issue_pair(&config, "U_ABC123").unwrap();
        assert_ne!(pair.access, pair.refresh);
    }

    #[test]
    fn test_foreign_claims_are_rejected() {
        // Supabase-style claims carry no token_type
        #[derive(Serialize)]
        struct ForeignClaims {
            sub: String,
            exp: usize,
            role: String,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &ForeignClaims {
                sub: "remote".to_string(),
                exp: 9999999999,
                role: "authenticated".to_string(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(decode_token(SECRET, &token, TokenType::Access).is_err());
    }
}
