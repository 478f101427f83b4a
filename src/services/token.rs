use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::entities::users;

/// Roles allowed to moderate reviews.
const MODERATOR_ROLES: [&str; 2] = ["admin", "moderator"];

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// The caller behind a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| MODERATOR_ROLES.contains(&role))
    }

    /// True when the caller is `user_id` or an admin.
    #[must_use]
    pub fn can_manage(&self, user_id: &str) -> bool {
        self.user_id == user_id || self.is_admin()
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_expiry_hours)
    }

    #[must_use]
    pub fn expires_in_secs(&self) -> i64 {
        self.expiry.num_seconds()
    }

    pub fn issue(&self, user: &users::Model) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            },
        )?;

        Ok(data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Option<&str>) -> users::Model {
        users::Model {
            id: "u-1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            role: role.map(str::to_string),
            is_active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let tokens = TokenService::new("a-test-secret-of-decent-length", 1);
        let token = tokens.issue(&user(Some("moderator"))).unwrap();

        let identity = tokens.verify(&token).unwrap();
        assert_eq!(identity.user_id, "u-1");
        assert_eq!(identity.email, "ada@example.com");
        assert!(identity.is_moderator());
        assert!(!identity.is_admin());
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let ours = TokenService::new("a-test-secret-of-decent-length", 1);
        let theirs = TokenService::new("some-other-secret-entirely", 1);
        let token = theirs.issue(&user(None)).unwrap();

        assert!(matches!(ours.verify(&token), Err(TokenError::Invalid(_))));
        assert!(matches!(ours.verify("garbage"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_rejects_expired_token() {
        let tokens = TokenService::new("a-test-secret-of-decent-length", 1);
        let past = Utc::now() - Duration::hours(3);
        let token = tokens
            .sign(&Claims {
                sub: "u-1".to_string(),
                email: "ada@example.com".to_string(),
                role: None,
                exp: (past + Duration::hours(1)).timestamp(),
                iat: past.timestamp(),
            })
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_can_manage() {
        let member = Identity {
            user_id: "u-1".to_string(),
            email: "a@b.c".to_string(),
            role: None,
        };
        let admin = Identity {
            role: Some("admin".to_string()),
            ..member.clone()
        };

        assert!(member.can_manage("u-1"));
        assert!(!member.can_manage("u-2"));
        assert!(admin.can_manage("u-2"));
        assert!(admin.is_moderator());
    }
}
