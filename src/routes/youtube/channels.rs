use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::AuthenticatedUser;
use crate::domain::youtube::{
    ChannelView, CreateChannelRequest, NewChannel, SubscriptionView, VideoView,
};
use crate::error::AppError;
use crate::pagination::{PageQuery, Paginated};
use crate::routes::youtube::videos::video_view_select;

/// `video_count` covers public uploads only.
const CHANNEL_VIEW_SELECT: &str = r#"
    SELECT c.id, c.owner_id, c.handle, c.name, c.description, c.avatar_url,
           (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = c.id) AS subscriber_count,
           (SELECT COUNT(*) FROM videos v
             WHERE v.channel_id = c.id AND v.visibility = 'public') AS video_count,
           c.created_at
    FROM channels c
"#;

pub(crate) async fn fetch_channel(pool: &PgPool, channel_id: Uuid) -> Result<ChannelView, AppError> {
    sqlx::query_as::<_, ChannelView>(&format!("{} WHERE c.id = $1", CHANNEL_VIEW_SELECT))
        .bind(channel_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Channel not found"))
}

/// POST /api/youtube/channels
///
/// A duplicate handle surfaces as 409 through the unique index.
pub async fn create_channel(
    user: AuthenticatedUser,
    body: web::Json<CreateChannelRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let channel = NewChannel::try_from(body.into_inner())?;

    let (channel_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO channels (id, owner_id, handle, name, description, avatar_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&channel.handle)
    .bind(&channel.name)
    .bind(&channel.description)
    .bind(&channel.avatar_url)
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(channel_id = %channel_id, handle = %channel.handle, "Channel created");

    let view = fetch_channel(pool.get_ref(), channel_id).await?;
    Ok(HttpResponse::Created().json(view))
}

/// GET /api/youtube/channels
pub async fn list_channels(
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination()?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM channels")
        .fetch_one(pool.get_ref())
        .await?;

    let channels = sqlx::query_as::<_, ChannelView>(&format!(
        "{} ORDER BY c.created_at DESC, c.id DESC LIMIT $1 OFFSET $2",
        CHANNEL_VIEW_SELECT
    ))
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(channels, pagination, total)))
}

/// GET /api/youtube/channels/{id}
pub async fn get_channel(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let view = fetch_channel(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// GET /api/youtube/channels/{id}/videos
///
/// The owner also sees unlisted and private uploads.
pub async fn list_channel_videos(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination()?;
    let channel = fetch_channel(pool.get_ref(), path.into_inner()).await?;
    let is_owner = channel.owner_id == user.id;

    let (total,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM videos WHERE channel_id = $1 AND ($2 OR visibility = 'public')",
    )
    .bind(channel.id)
    .bind(is_owner)
    .fetch_one(pool.get_ref())
    .await?;

    let videos = sqlx::query_as::<_, VideoView>(&format!(
        r#"{}
        WHERE v.channel_id = $2 AND ($3 OR v.visibility = 'public')
        ORDER BY v.created_at DESC, v.id DESC
        LIMIT $4 OFFSET $5"#,
        video_view_select()
    ))
    .bind(user.id)
    .bind(channel.id)
    .bind(is_owner)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(videos, pagination, total)))
}

/// POST /api/youtube/channels/{id}/subscribe
///
/// Subscribing twice is a no-op.
pub async fn subscribe(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let channel = fetch_channel(pool.get_ref(), path.into_inner()).await?;
    if channel.owner_id == user.id {
        return Err(AppError::invalid(
            "channel_id",
            "cannot subscribe to your own channel",
        ));
    }

    sqlx::query(
        "INSERT INTO subscriptions (channel_id, subscriber_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(channel.id)
    .bind(user.id)
    .execute(pool.get_ref())
    .await?;

    let view = fetch_channel(pool.get_ref(), channel.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "channel_id": view.id,
        "subscribed": true,
        "subscriber_count": view.subscriber_count,
    })))
}

/// DELETE /api/youtube/channels/{id}/subscribe
pub async fn unsubscribe(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let channel = fetch_channel(pool.get_ref(), path.into_inner()).await?;

    sqlx::query("DELETE FROM subscriptions WHERE channel_id = $1 AND subscriber_id = $2")
        .bind(channel.id)
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    let view = fetch_channel(pool.get_ref(), channel.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "channel_id": view.id,
        "subscribed": false,
        "subscriber_count": view.subscriber_count,
    })))
}

/// GET /api/youtube/subscriptions
pub async fn my_subscriptions(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination()?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1")
        .bind(user.id)
        .fetch_one(pool.get_ref())
        .await?;

    let subscriptions = sqlx::query_as::<_, SubscriptionView>(
        r#"
        SELECT c.id AS channel_id, c.handle, c.name, s.created_at AS subscribed_at
        FROM subscriptions s
        JOIN channels c ON c.id = s.channel_id
        WHERE s.subscriber_id = $1
        ORDER BY s.created_at DESC, c.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(subscriptions, pagination, total)))
}
