/// JWT Token Generation and Validation
///
/// Access tokens are short-lived and signed with `access_secret`; refresh
/// tokens are long-lived and signed with `refresh_secret`.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenType};
use crate::configuration::JwtSettings;
use crate::domain::user::Role;
use crate::error::{AppError, AuthError};

/// Generate a new access token for a user
///
/// # Errors
/// Returns error if token generation fails
pub fn generate_access_token(
    user_id: &Uuid,
    email: &str,
    role: Role,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        email.to_string(),
        role,
        TokenType::Access,
        config.access_token_expiry,
        config.issuer.clone(),
    );

    sign(&claims, &config.access_secret)
}

/// Generate a new refresh token for a user
pub fn generate_refresh_jwt(
    user_id: &Uuid,
    email: &str,
    role: Role,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        email.to_string(),
        role,
        TokenType::Refresh,
        config.refresh_token_expiry,
        config.issuer.clone(),
    );

    sign(&claims, &config.refresh_secret)
}

/// Validate and extract claims from an access token
///
/// # Errors
/// Returns `TokenExpired` or `TokenInvalid` if the token is expired, tampered
/// with, issued by someone else, or is a refresh token.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    verify(token, &config.access_secret, &config.issuer, TokenType::Access)
}

/// Validate and extract claims from a refresh token
pub fn validate_refresh_jwt(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    verify(token, &config.refresh_secret, &config.issuer, TokenType::Refresh)
}

fn sign(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

fn verify(
    token: &str,
    secret: &str,
    issuer: &str,
    expected: TokenType,
) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Auth(AuthError::TokenExpired),
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })?;

    if claims.token_type != expected {
        tracing::warn!(token_type = ?claims.token_type, "JWT used as the wrong token type");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            access_secret: "test-access-secret-at-least-32-characters".to_string(),
            refresh_secret: "test-refresh-secret-at-least-32-characters".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();
        let email = "test@example.com";

        let token = generate_access_token(&user_id, email, Role::Admin, &config)
            .expect("Failed to generate token");
        let claims = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, email);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn test_invalid_token() {
        let config = get_test_config();
        let result = validate_access_token("invalid.token.here", &config);

        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenInvalid))));
    }

    #[test]
    fn test_tampered_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = generate_access_token(&user_id, "test@example.com", Role::User, &config)
            .expect("Failed to generate token");

        let tampered = format!("{}X", token);
        assert!(validate_access_token(&tampered, &config).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let mut config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = generate_access_token(&user_id, "test@example.com", Role::User, &config)
            .expect("Failed to generate token");

        config.issuer = "wrong-issuer".to_string();
        assert!(validate_access_token(&token, &config).is_err());
    }

    #[test]
    fn test_expired_token_is_reported_as_expired() {
        let mut config = get_test_config();
        config.access_token_expiry = -120;
        let token = generate_access_token(&Uuid::new_v4(), "a@example.com", Role::User, &config)
            .expect("Failed to generate token");

        let result = validate_access_token(&token, &config);
        assert!(matches!(result, Err(AppError::Auth(AuthError::TokenExpired))));
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let refresh = generate_refresh_jwt(&user_id, "a@example.com", Role::User, &config)
            .expect("Failed to generate token");
        let access = generate_access_token(&user_id, "a@example.com", Role::User, &config)
            .expect("Failed to generate token");

        assert!(validate_refresh_jwt(&refresh, &config).is_ok());
        assert!(validate_access_token(&refresh, &config).is_err());
        assert!(validate_refresh_jwt(&access, &config).is_err());
    }

    #[test]
    fn test_same_secret_still_rejects_wrong_type() {
        let mut config = get_test_config();
        config.refresh_secret = config.access_secret.clone();
        let refresh = generate_refresh_jwt(&Uuid::new_v4(), "a@example.com", Role::User, &config)
            .expect("Failed to generate token");

        assert!(validate_access_token(&refresh, &config).is_err());
    }
}
