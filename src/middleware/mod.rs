/// Middleware module
///
/// Custom middleware for authentication and rate limiting.

mod jwt_middleware;
mod rate_limit;

pub use jwt_middleware::JwtMiddleware;
pub use rate_limit::RateLimitMiddleware;
