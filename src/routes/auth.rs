/// Authentication Routes
///
/// Registration, login, refresh-token rotation, logout, the current user,
/// email verification and password reset.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLog};
use crate::auth::{
    generate_access_token, generate_refresh_jwt, hash_password, revoke_refresh_token,
    rotate_refresh_token, store_refresh_token, validate_refresh_jwt, verify_against_dummy,
    verify_password, LockoutPolicy, OneTimeToken, TokenPurpose,
};
use crate::configuration::JwtSettings;
use crate::domain::user::{AuthenticatedUser, Role, UserCredentials, UserProfile};
use crate::email_client::EmailClient;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::validators::{is_valid_email, is_valid_username};

const PROFILE_COLUMNS: &str =
    "id, email, username, role, is_verified, is_active, last_login_at, created_at";

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

struct TokenPair {
    access_token: String,
    refresh_token: String,
}

fn issue_tokens(user: &UserProfile, jwt_config: &JwtSettings) -> Result<TokenPair, AppError> {
    let role = Role::parse(&user.role)
        .map_err(|_| AppError::Internal(format!("Stored role '{}' is unknown", user.role)))?;

    Ok(TokenPair {
        access_token: generate_access_token(&user.id, &user.email, role, jwt_config)?,
        refresh_token: generate_refresh_jwt(&user.id, &user.email, role, jwt_config)?,
    })
}

fn auth_response(tokens: TokenPair, user: UserProfile, jwt_config: &JwtSettings) -> AuthResponse {
    AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
        user,
    }
}

/// POST /api/v1/auth/register
///
/// # Errors
/// - 400: invalid email, username or weak password
/// - 409: email or username already taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let email = is_valid_email(&form.email)?;
    let username = is_valid_username(&form.username)?;
    let password_hash = hash_password(&form.password)?;
    let verification = OneTimeToken::new(TokenPurpose::EmailVerification);

    let mut transaction = pool.begin().await?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        r#"
        INSERT INTO users (id, email, username, password_hash,
                           verification_token_hash, verification_token_expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        PROFILE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&email)
    .bind(&username)
    .bind(&password_hash)
    .bind(verification.token_hash())
    .bind(verification.expires_at())
    .fetch_one(&mut transaction)
    .await
    .map_err(|e| {
        let e = AppError::from(e);
        context.log_error(&e);
        e
    })?;

    let tokens = issue_tokens(&user, jwt_config.get_ref())?;
    store_refresh_token(
        &mut transaction,
        user.id,
        &tokens.refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    transaction.commit().await?;

    if let Err(e) = email_client
        .send_verification_email(&user.email, verification.token())
        .await
    {
        tracing::warn!(
            request_id = %context.request_id,
            user_id = %user.id,
            error = %e,
            "Verification email could not be sent"
        );
    }

    AuditLog::success(AuditAction::Register, "User registered")
        .with_user_id(user.id)
        .with_email(&user.email)
        .emit();

    Ok(HttpResponse::Created().json(auth_response(tokens, user, jwt_config.get_ref())))
}

/// POST /api/v1/auth/login
///
/// Unknown email and wrong password produce the same 401. Every failure
/// counts towards the lockout; a locked account answers 403 until the lock
/// lapses. Success overwrites the stored refresh token.
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    lockout: web::Data<LockoutPolicy>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let email = is_valid_email(&form.email)?;
    let now = Utc::now();

    let credentials = sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, email, username, password_hash, role, is_active, login_attempts, lock_until
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?;

    let credentials = match credentials {
        Some(c) => c,
        None => {
            verify_against_dummy(&form.password);
            AuditLog::failure(AuditAction::Login, "Unknown email")
                .with_email(&email)
                .emit();
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }
    };

    if !credentials.is_active {
        return Err(AppError::Auth(AuthError::AccountInactive));
    }

    if lockout.is_locked(credentials.lock_until, now) {
        AuditLog::failure(AuditAction::Login, "Login attempt on locked account")
            .with_user_id(credentials.id)
            .emit();
        return Err(AppError::Auth(AuthError::AccountLocked));
    }

    if !verify_password(&form.password, &credentials.password_hash)? {
        let failure = lockout.register_failure(credentials.login_attempts, now);
        sqlx::query(
            "UPDATE users SET login_attempts = $1, lock_until = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(failure.login_attempts)
        .bind(failure.lock_until)
        .bind(credentials.id)
        .execute(pool.get_ref())
        .await?;

        if failure.lock_until.is_some() {
            AuditLog::success(AuditAction::AccountLocked, "Too many failed login attempts")
                .with_user_id(credentials.id)
                .emit();
        }
        AuditLog::failure(AuditAction::Login, "Invalid password")
            .with_user_id(credentials.id)
            .emit();
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let mut transaction = pool.begin().await?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        r#"
        UPDATE users
        SET login_attempts = 0, lock_until = NULL, last_login_at = NOW(), updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        PROFILE_COLUMNS
    ))
    .bind(credentials.id)
    .fetch_one(&mut transaction)
    .await?;

    let tokens = issue_tokens(&user, jwt_config.get_ref())?;
    store_refresh_token(
        &mut transaction,
        user.id,
        &tokens.refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    transaction.commit().await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User logged in successfully"
    );
    AuditLog::success(AuditAction::Login, "User logged in")
        .with_user_id(user.id)
        .emit();

    Ok(HttpResponse::Ok().json(auth_response(tokens, user, jwt_config.get_ref())))
}

/// POST /api/v1/auth/refresh
///
/// The presented token must be the user's current one; it is replaced by the
/// new token, so replaying it afterwards yields 401.
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let claims = validate_refresh_jwt(&form.refresh_token, jwt_config.get_ref())
        .map_err(|_| AppError::Auth(AuthError::TokenInvalid))?;
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .filter(|u| u.is_active)
    .ok_or(AppError::Auth(AuthError::TokenInvalid))?;

    let tokens = issue_tokens(&user, jwt_config.get_ref())?;

    if let Err(e) = rotate_refresh_token(
        pool.get_ref(),
        user.id,
        &form.refresh_token,
        &tokens.refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await
    {
        AuditLog::failure(AuditAction::Refresh, "Refresh token is not the current token")
            .with_user_id(user.id)
            .emit();
        return Err(e);
    }

    AuditLog::success(AuditAction::Refresh, "Tokens rotated")
        .with_user_id(user.id)
        .emit();

    Ok(HttpResponse::Ok().json(auth_response(tokens, user, jwt_config.get_ref())))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    user: AuthenticatedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    revoke_refresh_token(pool.get_ref(), user.id).await?;

    AuditLog::success(AuditAction::Logout, "User logged out")
        .with_user_id(user.id)
        .emit();

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out",
    }))
}

/// GET /api/v1/auth/me
pub async fn get_current_user(
    user: AuthenticatedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(user.id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/auth/verify-email?token=...
pub async fn verify_email(
    query: web::Query<VerifyEmailQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = sqlx::query_as::<_, (Uuid,)>(
        r#"
        UPDATE users
        SET is_verified = TRUE,
            verification_token_hash = NULL,
            verification_token_expires_at = NULL,
            updated_at = NOW()
        WHERE verification_token_hash = $1 AND verification_token_expires_at > NOW()
        RETURNING id
        "#,
    )
    .bind(OneTimeToken::hash(&query.token))
    .fetch_optional(pool.get_ref())
    .await?
    .map(|(id,)| id)
    .ok_or_else(|| AppError::invalid("token", "is invalid or expired"))?;

    AuditLog::success(AuditAction::VerifyEmail, "Email verified")
        .with_user_id(user_id)
        .emit();

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Email verified",
    }))
}

/// POST /api/v1/auth/forgot-password
///
/// Always answers 200 so the endpoint cannot be used to probe for accounts.
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let reset = OneTimeToken::new(TokenPurpose::PasswordReset);

    let user_id = sqlx::query_as::<_, (Uuid,)>(
        r#"
        UPDATE users
        SET reset_token_hash = $1, reset_token_expires_at = $2, updated_at = NOW()
        WHERE email = $3 AND is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(reset.token_hash())
    .bind(reset.expires_at())
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?
    .map(|(id,)| id);

    if let Some(user_id) = user_id {
        if let Err(e) = email_client
            .send_password_reset_email(&email, reset.token())
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Password reset email could not be sent");
        }
        AuditLog::success(AuditAction::PasswordResetRequested, "Password reset requested")
            .with_user_id(user_id)
            .emit();
    }

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "If the account exists, a password reset email has been sent",
    }))
}

/// POST /api/v1/auth/reset-password
///
/// Also clears the refresh token and any lockout.
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let password_hash = hash_password(&form.password)?;

    let user_id = sqlx::query_as::<_, (Uuid,)>(
        r#"
        UPDATE users
        SET password_hash = $1,
            reset_token_hash = NULL,
            reset_token_expires_at = NULL,
            refresh_token_hash = NULL,
            refresh_token_expires_at = NULL,
            login_attempts = 0,
            lock_until = NULL,
            updated_at = NOW()
        WHERE reset_token_hash = $2 AND reset_token_expires_at > NOW()
        RETURNING id
        "#,
    )
    .bind(&password_hash)
    .bind(OneTimeToken::hash(&form.token))
    .fetch_optional(pool.get_ref())
    .await?
    .map(|(id,)| id)
    .ok_or_else(|| AppError::invalid("token", "is invalid or expired"))?;

    AuditLog::success(AuditAction::PasswordReset, "Password reset")
        .with_user_id(user_id)
        .emit();

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password has been reset",
    }))
}
