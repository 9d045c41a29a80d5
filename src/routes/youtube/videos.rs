use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::user::AuthenticatedUser;
use crate::domain::youtube::{
    CreateVideoRequest, UpdateVideoRequest, VideoCommentRequest, VideoCommentView, VideoDraft,
    VideoListQuery, VideoView, Visibility,
};
use crate::error::AppError;
use crate::pagination::{PageQuery, Paginated, Pagination};
use crate::routes::escape_like;
use crate::routes::youtube::channels::fetch_channel;

const VIDEO_VIEW_HEAD: &str = r#"
    SELECT v.id, v.channel_id, c.handle AS channel_handle, c.owner_id, v.title, v.description,
           v.video_url, v.thumbnail_url, v.duration_seconds, v.visibility, v.tags, v.view_count,
           (SELECT COUNT(*) FROM video_likes l WHERE l.video_id = v.id) AS like_count,
           (SELECT COUNT(*) FROM video_comments m WHERE m.video_id = v.id) AS comment_count,
           EXISTS (SELECT 1 FROM video_likes l WHERE l.video_id = v.id AND l.user_id = "#;

const VIDEO_VIEW_TAIL: &str = r#") AS liked_by_me,
           v.created_at, v.updated_at
    FROM videos v
    JOIN channels c ON c.id = v.channel_id
"#;

/// `SELECT` for a `VideoView` with the viewer id bound as `$1`.
pub(crate) fn video_view_select() -> String {
    format!("{}$1{}", VIDEO_VIEW_HEAD, VIDEO_VIEW_TAIL)
}

fn push_video_view_select(builder: &mut QueryBuilder<'_, Postgres>, viewer_id: Uuid) {
    builder
        .push(VIDEO_VIEW_HEAD)
        .push_bind(viewer_id)
        .push(VIDEO_VIEW_TAIL);
}

fn push_search(builder: &mut QueryBuilder<'_, Postgres>, search: &Option<String>) {
    if let Some(search) = search {
        builder
            .push(" AND (v.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)))
            .push(" OR ")
            .push_bind(search.to_lowercase())
            .push(" = ANY (v.tags))");
    }
}

/// Loads a video the viewer may see. Private videos of other owners are 404.
async fn fetch_visible_video(
    pool: &PgPool,
    video_id: Uuid,
    viewer_id: Uuid,
) -> Result<VideoView, AppError> {
    sqlx::query_as::<_, VideoView>(&format!("{} WHERE v.id = $2", video_view_select()))
        .bind(viewer_id)
        .bind(video_id)
        .fetch_optional(pool)
        .await?
        .filter(|video| video.visible_to(viewer_id))
        .ok_or_else(|| AppError::not_found("Video not found"))
}

/// POST /api/youtube/videos
#[tracing::instrument(name = "create_video", skip_all, fields(user_id = %user.id))]
pub async fn create_video(
    user: AuthenticatedUser,
    body: web::Json<CreateVideoRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let channel = fetch_channel(pool.get_ref(), request.channel_id).await?;
    if channel.owner_id != user.id {
        return Err(AppError::forbidden(
            "Only the channel owner may upload videos",
        ));
    }
    let draft = VideoDraft::from_request(request)?;

    let (video_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO videos (id, channel_id, title, description, video_url, thumbnail_url,
                            duration_seconds, visibility, tags)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(channel.id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.video_url)
    .bind(&draft.thumbnail_url)
    .bind(draft.duration_seconds)
    .bind(draft.visibility.as_str())
    .bind(&draft.tags)
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(video_id = %video_id, channel_id = %channel.id, "Video uploaded");

    let view = fetch_visible_video(pool.get_ref(), video_id, user.id).await?;
    Ok(HttpResponse::Created().json(view))
}

/// GET /api/youtube/videos
///
/// Public videos only; `search` matches title or tags.
pub async fn list_videos(
    user: AuthenticatedUser,
    query: web::Query<VideoListQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let search = query.search()?;
    let pagination = Pagination::new(query.page, query.limit)?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM videos v WHERE v.visibility = ");
    count.push_bind(Visibility::Public.as_str());
    push_search(&mut count, &search);
    let (total,) = count
        .build_query_as::<(i64,)>()
        .fetch_one(pool.get_ref())
        .await?;

    let mut select = QueryBuilder::<Postgres>::new("");
    push_video_view_select(&mut select, user.id);
    select
        .push(" WHERE v.visibility = ")
        .push_bind(Visibility::Public.as_str());
    push_search(&mut select, &search);
    select
        .push(" ORDER BY v.created_at DESC, v.id DESC LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    let videos = select
        .build_query_as::<VideoView>()
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(videos, pagination, total)))
}

/// GET /api/youtube/videos/{id}
///
/// Every successful fetch counts as a view.
pub async fn get_video(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let video = fetch_visible_video(pool.get_ref(), path.into_inner(), user.id).await?;

    let (view_count,): (i64,) = sqlx::query_as(
        "UPDATE videos SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
    )
    .bind(video.id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(VideoView { view_count, ..video }))
}

async fn fetch_owned_video(
    pool: &PgPool,
    video_id: Uuid,
    user: &AuthenticatedUser,
) -> Result<VideoView, AppError> {
    let video = fetch_visible_video(pool, video_id, user.id).await?;
    user.require_owner(video.owner_id)?;
    Ok(video)
}

/// PUT /api/youtube/videos/{id}
pub async fn update_video(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateVideoRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let current = fetch_owned_video(pool.get_ref(), path.into_inner(), &user).await?;
    let draft = VideoDraft::from_view(&current)?.apply(body.into_inner())?;

    sqlx::query(
        r#"
        UPDATE videos
        SET title = $1, description = $2, thumbnail_url = $3, visibility = $4, tags = $5,
            updated_at = NOW()
        WHERE id = $6
        "#,
    )
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.thumbnail_url)
    .bind(draft.visibility.as_str())
    .bind(&draft.tags)
    .bind(current.id)
    .execute(pool.get_ref())
    .await?;

    let view = fetch_visible_video(pool.get_ref(), current.id, user.id).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/youtube/videos/{id}
pub async fn delete_video(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let video = fetch_owned_video(pool.get_ref(), path.into_inner(), &user).await?;

    sqlx::query("DELETE FROM videos WHERE id = $1")
        .bind(video.id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(video_id = %video.id, user_id = %user.id, "Video deleted");
    Ok(HttpResponse::NoContent().finish())
}

async fn like_state(pool: &PgPool, video_id: Uuid, liked: bool) -> Result<HttpResponse, AppError> {
    let (like_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM video_likes WHERE video_id = $1")
            .bind(video_id)
            .fetch_one(pool)
            .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "video_id": video_id,
        "liked": liked,
        "like_count": like_count,
    })))
}

/// POST /api/youtube/videos/{id}/like
pub async fn like_video(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let video = fetch_visible_video(pool.get_ref(), path.into_inner(), user.id).await?;

    sqlx::query(
        "INSERT INTO video_likes (video_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(video.id)
    .bind(user.id)
    .execute(pool.get_ref())
    .await?;

    like_state(pool.get_ref(), video.id, true).await
}

/// DELETE /api/youtube/videos/{id}/like
pub async fn unlike_video(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let video = fetch_visible_video(pool.get_ref(), path.into_inner(), user.id).await?;

    sqlx::query("DELETE FROM video_likes WHERE video_id = $1 AND user_id = $2")
        .bind(video.id)
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    like_state(pool.get_ref(), video.id, false).await
}

/// POST /api/youtube/videos/{id}/comments
pub async fn add_video_comment(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<VideoCommentRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let text = body.text()?;
    let video = fetch_visible_video(pool.get_ref(), path.into_inner(), user.id).await?;

    let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
        r#"
        INSERT INTO video_comments (id, video_id, author_id, text)
        VALUES ($1, $2, $3, $4)
        RETURNING id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(video.id)
    .bind(user.id)
    .bind(&text)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(VideoCommentView {
        id,
        video_id: video.id,
        author_id: user.id,
        author_username: user.username,
        text,
        created_at,
    }))
}

/// GET /api/youtube/videos/{id}/comments
pub async fn list_video_comments(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination()?;
    let video = fetch_visible_video(pool.get_ref(), path.into_inner(), user.id).await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM video_comments WHERE video_id = $1")
            .bind(video.id)
            .fetch_one(pool.get_ref())
            .await?;

    let comments = sqlx::query_as::<_, VideoCommentView>(
        r#"
        SELECT m.id, m.video_id, m.author_id, u.username AS author_username, m.text, m.created_at
        FROM video_comments m
        JOIN users u ON u.id = m.author_id
        WHERE m.video_id = $1
        ORDER BY m.created_at DESC, m.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(video.id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(comments, pagination, total)))
}
