/// JWT Authentication Middleware
///
/// Validates the Bearer access token, loads the user row and injects an
/// [`AuthenticatedUser`] into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;
use std::rc::Rc;
use uuid::Uuid;

use crate::auth::validate_access_token;
use crate::configuration::JwtSettings;
use crate::domain::user::{AuthenticatedUser, Role};
use crate::error::{AppError, AuthError};

/// JWT middleware for protecting routes
pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
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
        let service = self.service.clone();
        let jwt_config = self.jwt_config.clone();

        // Unrouted paths fall through to the default 404 service.
        if !req.resource_map().has_resource(req.path()) {
            return Box::pin(async move { service.call(req).await });
        }

        Box::pin(async move {
            let token = bearer_token(&req).ok_or_else(|| {
                tracing::warn!(path = %req.path(), "Missing or invalid Authorization header");
                AppError::Auth(AuthError::MissingToken)
            })?;

            let claims = validate_access_token(&token, &jwt_config).map_err(|e| {
                tracing::warn!("JWT validation failed: {}", e);
                AppError::Auth(AuthError::TokenInvalid)
            })?;

            let pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| AppError::Internal("Database pool not configured".to_string()))?;

            let user = load_active_user(pool.get_ref(), claims.user_id()?).await?;

            tracing::debug!(user_id = %user.id, role = %user.role, "JWT validated successfully");
            req.extensions_mut().insert(user);

            service.call(req).await
        })
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// A deleted or deactivated user is treated like an invalid token.
async fn load_active_user(pool: &PgPool, user_id: Uuid) -> Result<AuthenticatedUser, AppError> {
    let row: Option<(Uuid, String, String, String, bool)> = sqlx::query_as(
        "SELECT id, email, username, role, is_active FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((id, email, username, role, true)) => Ok(AuthenticatedUser {
            id,
            email,
            username,
            role: Role::parse(&role).map_err(|_| AppError::Auth(AuthError::TokenInvalid))?,
        }),
        _ => Err(AppError::Auth(AuthError::TokenInvalid)),
    }
}

/// Extracts the user injected by [`JwtMiddleware`]; 401 when the route is not
/// behind the middleware.
impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(AppError::Auth(AuthError::MissingToken)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_bearer_token_parsing() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc.def.ghi"))
            .to_srv_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic dXNlcjpwYXNz"))
            .to_srv_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer "))
            .to_srv_request();
        assert_eq!(bearer_token(&req), None);

        assert_eq!(bearer_token(&TestRequest::default().to_srv_request()), None);
    }

    #[actix_web::test]
    async fn test_extractor_requires_injected_user() {
        let req = TestRequest::default().to_http_request();
        let result = AuthenticatedUser::extract(&req).await;
        assert!(result.is_err());

        let user = AuthenticatedUser {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            username: "alice".to_string(),
            role: Role::User,
        };
        req.extensions_mut().insert(user.clone());
        assert_eq!(AuthenticatedUser::extract(&req).await.unwrap(), user);
    }
}
