use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::CONTENT_LENGTH,
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::security::RateLimiterManager;

/// Rejects requests over the per-IP rate limit (429) or with a declared body
/// larger than the configured maximum (413).
pub struct RateLimitMiddleware {
    manager: Arc<RateLimiterManager>,
}

impl RateLimitMiddleware {
    pub fn new(manager: Arc<RateLimiterManager>) -> Self {
        Self { manager }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            manager: self.manager.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    manager: Arc<RateLimiterManager>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Forwarded headers are client-controlled; only the socket peer is trusted.
        let ip = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let content_length = req
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let checked = self.manager.check_rate_limit(&ip).and_then(|_| {
            content_length.map_or(Ok(()), |len| self.manager.check_content_length(len))
        });

        if let Err(e) = checked {
            tracing::warn!(client_ip = %ip, path = %req.path(), error = %e, "Request rejected");
            return Box::pin(async move { Err(e.into()) });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
