use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

string_enum! {
    pub enum Role ("role") {
        User => "user",
        Admin => "admin",
    }
}

/// Credential row as loaded for login and token checks.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
}

impl UserCredentials {
    pub fn role(&self) -> Result<Role, AppError> {
        Role::parse(&self.role)
            .map_err(|_| AppError::Internal(format!("Stored role '{}' is unknown", self.role)))
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Attached to the request by the JWT middleware after the user row was
/// loaded and found active.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Administrator role required"))
        }
    }

    /// Owners and admins may modify a resource.
    pub fn require_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Only the owner may modify this resource"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn test_admin_checks() {
        assert!(user(Role::Admin).require_admin().is_ok());
        assert!(user(Role::User).require_admin().is_err());
    }

    #[test]
    fn test_owner_checks() {
        let alice = user(Role::User);
        assert!(alice.require_owner(alice.id).is_ok());
        assert!(alice.require_owner(Uuid::new_v4()).is_err());
        assert!(user(Role::Admin).require_owner(Uuid::new_v4()).is_ok());
    }
}
