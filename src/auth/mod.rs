/// Authentication module
///
/// Handles JWT access/refresh tokens, password hashing, the single stored
/// refresh token per user, login lockout and one-time mail tokens.

mod claims;
mod jwt;
mod lockout;
mod one_time_token;
mod password;
mod refresh_token;

pub use claims::{Claims, TokenType};
pub use jwt::{generate_access_token, generate_refresh_jwt, validate_access_token, validate_refresh_jwt};
pub use lockout::{FailedAttempt, LockoutPolicy};
pub use one_time_token::{OneTimeToken, TokenPurpose};
pub use password::{hash_password, validate_password_strength, verify_against_dummy, verify_password};
pub use refresh_token::{hash_token, revoke_refresh_token, rotate_refresh_token, store_refresh_token};
