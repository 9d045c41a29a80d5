/// Security module for protecting against common web attacks
/// Features:
/// - Rate limiting per client IP (token bucket)
/// - Content-length validation (payload bomb protection)
/// - Security response headers

use actix_web::middleware::DefaultHeaders;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::configuration::SecuritySettings;
use crate::error::AppError;

/// Buckets untouched for this long are dropped when the table grows large.
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(600);
const PRUNE_THRESHOLD: usize = 10_000;
/// Minimum spacing between two prunes of the bucket table.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Max requests per minute per IP
    pub requests_per_minute: u32,
    /// Max content length in bytes
    pub max_content_length: u64,
}

impl From<&SecuritySettings> for RateLimitConfig {
    fn from(settings: &SecuritySettings) -> Self {
        Self {
            requests_per_minute: settings.requests_per_minute,
            max_content_length: settings.max_content_length,
        }
    }
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    capacity: u32,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    fn new(requests_per_minute: u32) -> Self {
        Self {
            tokens: requests_per_minute as f64,
            last_refill: Instant::now(),
            capacity: requests_per_minute,
            refill_rate: requests_per_minute as f64 / 60.0,
        }
    }

    fn try_take_token(&mut self) -> bool {
        let elapsed = self.last_refill.elapsed().as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity as f64);
        self.last_refill = Instant::now();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

struct BucketTable {
    buckets: HashMap<String, TokenBucket>,
    last_prune: Instant,
}

impl BucketTable {
    fn prune_if_due(&mut self) {
        if self.buckets.len() <= PRUNE_THRESHOLD || self.last_prune.elapsed() < PRUNE_INTERVAL {
            return;
        }
        self.buckets
            .retain(|_, bucket| bucket.last_refill.elapsed() < IDLE_BUCKET_TTL);
        self.last_prune = Instant::now();
    }
}

/// Rate limiter manager - tracks limits per IP address
pub struct RateLimiterManager {
    config: RateLimitConfig,
    limiters: Mutex<BucketTable>,
}

impl RateLimiterManager {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            limiters: Mutex::new(BucketTable {
                buckets: HashMap::new(),
                last_prune: Instant::now(),
            }),
        }
    }

    /// Check if a request from `ip` is allowed. A limit of 0 disables limiting.
    pub fn check_rate_limit(&self, ip: &str) -> Result<(), AppError> {
        if self.config.requests_per_minute == 0 {
            return Ok(());
        }

        let mut table = self.limiters.lock().unwrap_or_else(|e| e.into_inner());
        table.prune_if_due();

        let limiter = table
            .buckets
            .entry(ip.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.requests_per_minute));

        if limiter.try_take_token() {
            Ok(())
        } else {
            Err(AppError::RateLimited(format!(
                "Rate limit exceeded: max {} requests per minute",
                self.config.requests_per_minute
            )))
        }
    }

    pub fn check_content_length(&self, length: u64) -> Result<(), AppError> {
        if length > self.config.max_content_length {
            return Err(AppError::PayloadTooLarge(format!(
                "Content length {} exceeds maximum {}",
                length, self.config.max_content_length
            )));
        }
        Ok(())
    }
}

/// Security headers for HTTP responses
pub struct SecurityHeaders;

impl SecurityHeaders {
    pub fn get_headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("X-Content-Type-Options", "nosniff"),
            ("X-Frame-Options", "DENY"),
            ("X-XSS-Protection", "1; mode=block"),
            ("Content-Security-Policy", "default-src 'none'; frame-ancestors 'none'"),
            ("Referrer-Policy", "strict-origin-when-cross-origin"),
            ("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
        ]
    }

    pub fn middleware() -> DefaultHeaders {
        Self::get_headers()
            .into_iter()
            .fold(DefaultHeaders::new(), |headers, header| headers.add(header))
    }
}
