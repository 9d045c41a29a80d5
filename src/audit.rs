/// Audit trail for security-relevant account events
///
/// Entries are emitted as structured `tracing` events; failures are logged at
/// WARN so they stand out next to ordinary request logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Register,
    Login,
    Logout,
    Refresh,
    AccountLocked,
    VerifyEmail,
    PasswordResetRequested,
    PasswordReset,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Register => "REGISTER",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Refresh => "REFRESH",
            AuditAction::AccountLocked => "ACCOUNT_LOCKED",
            AuditAction::VerifyEmail => "VERIFY_EMAIL",
            AuditAction::PasswordResetRequested => "PASSWORD_RESET_REQUESTED",
            AuditAction::PasswordReset => "PASSWORD_RESET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub log_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub status: AuditStatus,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub message: String,
}

impl AuditLog {
    pub fn success(action: AuditAction, message: impl Into<String>) -> Self {
        Self::new(action, AuditStatus::Success, message)
    }

    pub fn failure(action: AuditAction, message: impl Into<String>) -> Self {
        Self::new(action, AuditStatus::Failure, message)
    }

    fn new(action: AuditAction, status: AuditStatus, message: impl Into<String>) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            status,
            user_id: None,
            email: None,
            message: message.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn emit(&self) {
        match self.status {
            AuditStatus::Failure => tracing::warn!(
                log_id = %self.log_id,
                action = self.action.as_str(),
                user_id = ?self.user_id,
                email = ?self.email,
                status = "FAILURE",
                message = %self.message,
                "Audit log entry"
            ),
            AuditStatus::Success => tracing::info!(
                log_id = %self.log_id,
                action = self.action.as_str(),
                user_id = ?self.user_id,
                email = ?self.email,
                status = "SUCCESS",
                message = %self.message,
                "Audit log entry"
            ),
        }
    }
}
