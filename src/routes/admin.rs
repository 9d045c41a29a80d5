use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::domain::user::{AuthenticatedUser, UserProfile};
use crate::error::AppError;
use crate::pagination::{PageQuery, Paginated};

/// GET /api/v1/admin/users
pub async fn list_users(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    user.require_admin()?;
    let pagination = query.pagination()?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await?;

    let users = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, email, username, role, is_verified, is_active, last_login_at, created_at
        FROM users
        ORDER BY created_at DESC, id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(users, pagination, total)))
}
