use actix_web::{web, HttpResponse};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::analytics::DateRangeQuery;
use crate::domain::instagram::{AnalyticsEventRow, CreateEventRequest, EventCounts};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;

/// POST /api/instagram/analytics/events
pub async fn create_event(
    user: AuthenticatedUser,
    body: web::Json<CreateEventRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let metadata = body.metadata()?;

    let row = sqlx::query_as::<_, AnalyticsEventRow>(
        r#"
        INSERT INTO analytics_events (id, post_id, user_id, event_type, metadata)
        SELECT $1, p.id, $3, $4, $5 FROM posts p WHERE p.id = $2
        RETURNING id, post_id, user_id, event_type, metadata, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(body.post_id)
    .bind(user.id)
    .bind(body.event_type.as_str())
    .bind(&metadata)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Post not found"))?;

    tracing::debug!(post_id = %row.post_id, event_type = %row.event_type, "Analytics event stored");

    Ok(HttpResponse::Created().json(row))
}

/// GET /api/instagram/analytics/posts/{post_id}
pub async fn post_event_counts(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool.get_ref())
        .await?;
    if exists.is_none() {
        return Err(AppError::not_found("Post not found"));
    }

    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT event_type, COUNT(*) FROM analytics_events WHERE post_id = $1 GROUP BY event_type",
    )
    .bind(post_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(EventCounts::from_rows(rows)))
}

/// GET /api/instagram/analytics/summary
pub async fn events_summary(
    query: web::Query<DateRangeQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;

    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT event_type, COUNT(*) FROM analytics_events WHERE TRUE",
    );
    if let Some(from) = query.from {
        builder.push(" AND created_at::date >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND created_at::date <= ").push_bind(to);
    }
    builder.push(" GROUP BY event_type");

    let rows = builder
        .build_query_as::<(String, i64)>()
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EventCounts::from_rows(rows)))
}
