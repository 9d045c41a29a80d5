/// Login attempt counting and temporary account locks

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockoutPolicy {
    /// 0 disables locking
    pub max_attempts: i32,
    pub lock_duration: Duration,
}

/// New counter state after a failed login.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailedAttempt {
    pub login_attempts: i32,
    pub lock_until: Option<DateTime<Utc>>,
}

impl LockoutPolicy {
    pub fn new(max_attempts: i32, lock_duration_seconds: i64) -> Self {
        Self {
            max_attempts,
            lock_duration: Duration::seconds(lock_duration_seconds),
        }
    }

    pub fn is_locked(&self, lock_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.max_attempts > 0 && lock_until.map_or(false, |until| until > now)
    }

    /// Reaching the limit locks the account and resets the counter, so the
    /// next window starts from zero once the lock lapses.
    pub fn register_failure(&self, previous_attempts: i32, now: DateTime<Utc>) -> FailedAttempt {
        if self.max_attempts <= 0 {
            return FailedAttempt {
                login_attempts: previous_attempts.saturating_add(1),
                lock_until: None,
            };
        }

        let attempts = previous_attempts.saturating_add(1);
        if attempts >= self.max_attempts {
            FailedAttempt {
                login_attempts: 0,
                lock_until: Some(now + self.lock_duration),
            }
        } else {
            FailedAttempt {
                login_attempts: attempts,
                lock_until: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_until_limit_then_locks() {
        let policy = LockoutPolicy::new(3, 600);
        let now = Utc::now();

        let first = policy.register_failure(0, now);
        assert_eq!(first, FailedAttempt { login_attempts: 1, lock_until: None });

        let second = policy.register_failure(first.login_attempts, now);
        assert_eq!(second.login_attempts, 2);
        assert!(second.lock_until.is_none());

        let third = policy.register_failure(second.login_attempts, now);
        assert_eq!(third.login_attempts, 0);
        assert_eq!(third.lock_until, Some(now + Duration::seconds(600)));
        assert!(policy.is_locked(third.lock_until, now));
    }

    #[test]
    fn test_lock_lapses() {
        let policy = LockoutPolicy::new(3, 600);
        let now = Utc::now();
        let until = Some(now + Duration::seconds(600));

        assert!(policy.is_locked(until, now + Duration::seconds(599)));
        assert!(!policy.is_locked(until, now + Duration::seconds(601)));
        assert!(!policy.is_locked(None, now));
    }

    #[test]
    fn test_zero_disables_locking() {
        let policy = LockoutPolicy::new(0, 600);
        let now = Utc::now();

        let attempt = policy.register_failure(41, now);
        assert_eq!(attempt.login_attempts, 42);
        assert!(attempt.lock_until.is_none());
        assert!(!policy.is_locked(Some(now + Duration::hours(1)), now));
    }
}
