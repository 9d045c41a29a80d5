use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::auth::refresh_token::hash_token;

const TOKEN_LENGTH: usize = 48;

/// What a one-time token may be redeemed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::EmailVerification => Duration::hours(24),
            TokenPurpose::PasswordReset => Duration::hours(1),
        }
    }
}

/// Random token mailed to the user. Only `token_hash()` is persisted.
#[derive(Clone, Debug)]
pub struct OneTimeToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn new(purpose: TokenPurpose) -> Self {
        let token = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        Self {
            token,
            expires_at: Utc::now() + purpose.lifetime(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_hash(&self) -> String {
        hash_token(&self.token)
    }

    /// Hash of a token presented by a client, for lookup.
    pub fn hash(presented: &str) -> String {
        hash_token(presented.trim())
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = OneTimeToken::new(TokenPurpose::EmailVerification);

        assert_eq!(token.token().len(), TOKEN_LENGTH);
        assert!(token.token().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(token.token_hash(), hash_token(token.token()));
        assert_eq!(OneTimeToken::hash(&format!(" {} ", token.token())), token.token_hash());
        assert!(token.expires_at() > Utc::now());
    }

    #[test]
    fn test_reset_tokens_are_short_lived() {
        let reset = OneTimeToken::new(TokenPurpose::PasswordReset);
        let verify = OneTimeToken::new(TokenPurpose::EmailVerification);

        assert!(reset.expires_at() < verify.expires_at());
        assert!(reset.expires_at() <= Utc::now() + Duration::hours(1));
    }
}
