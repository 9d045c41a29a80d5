/// Input validators shared by every route
/// Features:
/// 1. DoS Protection: Input length limits
/// 2. Control character checks
/// 3. Format checks for emails, usernames, handles and URLs

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 30;
const MAX_URL_LENGTH: usize = 2048;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.]+$").unwrap();

    static ref HANDLE_REGEX: Regex = Regex::new(r"^[a-z0-9_]{3,30}$").unwrap();

    static ref URL_REGEX: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

/// Validates an email address and returns it trimmed and lowercased.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Validates a username: 3-30 characters of letters, digits, `_` and `.`
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    if trimmed.chars().count() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username".to_string(), MIN_USERNAME_LENGTH));
    }

    if trimmed.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a channel handle: 3-30 lowercase letters, digits or `_`
pub fn is_valid_handle(handle: &str) -> Result<String, ValidationError> {
    let normalized = handle.trim().trim_start_matches('@').to_lowercase();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("handle".to_string()));
    }

    if !HANDLE_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("handle".to_string()));
    }

    Ok(normalized)
}

/// Validates a required free-text field (titles, names, captions).
/// Returns the trimmed value.
pub fn validate_text(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();

    if trimmed.is_empty() && min > 0 {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if length < min {
        return Err(ValidationError::TooShort(field.to_string(), min));
    }

    if length > max {
        return Err(ValidationError::TooLong(field.to_string(), max));
    }

    if trimmed.contains('\0') {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Same as [`validate_text`] for optional fields; blank input becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_text(field, v, 0, max).map(Some),
    }
}

/// Validates an absolute http(s) URL.
pub fn is_valid_url(field: &str, url: &str) -> Result<String, ValidationError> {
    let trimmed = url.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.len() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_URL_LENGTH));
    }

    if !URL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}

pub fn validate_optional_url(
    field: &str,
    url: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    match url.map(str::trim) {
        None | Some("") => Ok(None),
        Some(u) => is_valid_url(field, u).map(Some),
    }
}

/// Rejects negative numbers.
pub fn non_negative<T>(field: &str, value: T) -> Result<T, ValidationError>
where
    T: PartialOrd + Default + Copy,
{
    if value < T::default() {
        return Err(ValidationError::InvalidValue(
            field.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(value)
}

/// Detects suspicious patterns in email addresses that might indicate phishing
fn has_suspicious_email_patterns(email: &str) -> bool {
    if let Some(at_pos) = email.find('@') {
        let local_part = &email[..at_pos];
        if local_part.len() > 64 {
            return true;
        }
    }

    if email.matches('@').count() != 1 {
        return true;
    }

    email.contains('\0')
}
