/// JWT Claims structure
///
/// Payload shared by access and refresh tokens. The `token_type` claim keeps
/// one kind from being accepted where the other is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::Role;
use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub token_type: TokenType,
    /// Unique token id; two tokens minted in the same second still differ
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: String,
        role: Role,
        token_type: TokenType,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            role,
            token_type,
            jti: Uuid::new_v4().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// # Errors
    /// Returns `TokenInvalid` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(token_type: TokenType) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "test@example.com".to_string(),
            Role::User,
            token_type,
            3600,
            "test".to_string(),
        )
    }

    #[test]
    fn test_claims_creation() {
        let c = claims(TokenType::Access);

        assert_eq!(c.email, "test@example.com");
        assert_eq!(c.iss, "test");
        assert_eq!(c.token_type, TokenType::Access);
        assert_eq!(c.exp - c.iat, 3600);
        assert!(c.exp > chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_each_token_gets_its_own_jti() {
        assert_ne!(claims(TokenType::Refresh).jti, claims(TokenType::Refresh).jti);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut c = claims(TokenType::Access);
        c.sub = "invalid-uuid".to_string();

        assert!(c.user_id().is_err());
    }

    #[test]
    fn test_token_type_serializes_lowercase() {
        let json = serde_json::to_value(claims(TokenType::Refresh)).unwrap();
        assert_eq!(json["token_type"], "refresh");
        assert_eq!(json["role"], "user");
    }
}
