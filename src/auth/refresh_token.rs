/// Refresh Token Management
///
/// Each user has at most one live refresh token. Only its SHA-256 hash is
/// stored on the user row:
/// - login and refresh overwrite it (the previous token stops working)
/// - logout and password reset clear it
/// - rotation is a compare-and-swap on the old hash, so two concurrent
///   refreshes with the same token cannot both succeed

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Hash a token using SHA-256 (hex encoded).
///
/// Also used for one-time verification and reset tokens.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Store `token` as the user's only refresh token, replacing any previous one.
pub async fn store_refresh_token<'e, E>(
    executor: E,
    user_id: Uuid,
    token: &str,
    expiry_seconds: i64,
) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    let expires_at = Utc::now() + Duration::seconds(expiry_seconds);

    sqlx::query(
        r#"
        UPDATE users
        SET refresh_token_hash = $1, refresh_token_expires_at = $2, updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(hash_token(token))
    .bind(expires_at)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Replace `old_token` with `new_token` if and only if `old_token` is the
/// user's current, unexpired refresh token.
///
/// # Errors
/// `TokenInvalid` when the stored token differs, was cleared, or expired
pub async fn rotate_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    old_token: &str,
    new_token: &str,
    expiry_seconds: i64,
) -> Result<(), AppError> {
    let expires_at = Utc::now() + Duration::seconds(expiry_seconds);

    let result = sqlx::query(
        r#"
        UPDATE users
        SET refresh_token_hash = $1, refresh_token_expires_at = $2, updated_at = NOW()
        WHERE id = $3
          AND is_active = true
          AND refresh_token_hash = $4
          AND refresh_token_expires_at > NOW()
        "#,
    )
    .bind(hash_token(new_token))
    .bind(expires_at)
    .bind(user_id)
    .bind(hash_token(old_token))
    .execute(pool)
    .await?;

    if result.rows_affected() != 1 {
        tracing::warn!(user_id = %user_id, "Refresh token is not the user's current token");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }

    Ok(())
}

/// Clear the user's refresh token (logout).
pub async fn revoke_refresh_token<'e, E>(executor: E, user_id: Uuid) -> Result<(), AppError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE users
        SET refresh_token_hash = NULL, refresh_token_expires_at = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .execute(executor)
    .await?;

    tracing::info!(user_id = %user_id, "Refresh token revoked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("some-refresh-token");
        let hash2 = hash_token("some-refresh-token");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "some-refresh-token");
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
