use actix_web::{web, HttpResponse};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::instagram::{CreateStoryRequest, NewStory, StoryView};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;
use crate::pagination::{PageQuery, Paginated};

/// `$1` is the viewer id.
const STORY_VIEW_SELECT: &str = r#"
    SELECT s.id, s.author_id, u.username AS author_username, s.media_url, s.media_type,
           s.caption,
           (SELECT COUNT(*) FROM story_views v WHERE v.story_id = s.id) AS view_count,
           EXISTS (SELECT 1 FROM story_views v WHERE v.story_id = s.id AND v.viewer_id = $1)
               AS viewed_by_me,
           s.expires_at, s.created_at
    FROM stories s
    JOIN users u ON u.id = s.author_id
"#;

async fn fetch_active_story(
    pool: &PgPool,
    story_id: Uuid,
    viewer_id: Uuid,
) -> Result<StoryView, AppError> {
    sqlx::query_as::<_, StoryView>(&format!(
        "{} WHERE s.id = $2 AND s.expires_at > NOW()",
        STORY_VIEW_SELECT
    ))
    .bind(viewer_id)
    .bind(story_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Story not found"))
}

/// POST /api/instagram/stories
pub async fn create_story(
    user: AuthenticatedUser,
    body: web::Json<CreateStoryRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let story = NewStory::from_request(body.into_inner(), Utc::now())?;

    let (story_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO stories (id, author_id, media_url, media_type, caption, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&story.media_url)
    .bind(story.media_type.as_str())
    .bind(&story.caption)
    .bind(story.expires_at)
    .fetch_one(pool.get_ref())
    .await?;

    let view = fetch_active_story(pool.get_ref(), story_id, user.id).await?;
    Ok(HttpResponse::Created().json(view))
}

/// GET /api/instagram/stories
///
/// Active stories only, newest first.
pub async fn list_stories(
    user: AuthenticatedUser,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination()?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stories WHERE expires_at > NOW()")
        .fetch_one(pool.get_ref())
        .await?;

    let stories = sqlx::query_as::<_, StoryView>(&format!(
        "{} WHERE s.expires_at > NOW() ORDER BY s.created_at DESC, s.id DESC LIMIT $2 OFFSET $3",
        STORY_VIEW_SELECT
    ))
    .bind(user.id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(stories, pagination, total)))
}

/// GET /api/instagram/stories/{id}
pub async fn get_story(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let view = fetch_active_story(pool.get_ref(), path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/instagram/stories/{id}/view
///
/// A viewer is recorded once no matter how often they open the story.
pub async fn view_story(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let story_id = path.into_inner();
    fetch_active_story(pool.get_ref(), story_id, user.id).await?;

    sqlx::query(
        "INSERT INTO story_views (story_id, viewer_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(story_id)
    .bind(user.id)
    .execute(pool.get_ref())
    .await?;

    let view = fetch_active_story(pool.get_ref(), story_id, user.id).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/instagram/stories/{id}
pub async fn delete_story(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let story_id = path.into_inner();
    let (author_id,): (Uuid,) = sqlx::query_as("SELECT author_id FROM stories WHERE id = $1")
        .bind(story_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Story not found"))?;
    user.require_owner(author_id)?;

    sqlx::query("DELETE FROM stories WHERE id = $1")
        .bind(story_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Removes expired stories; returns how many were deleted.
pub async fn purge_expired_stories(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM stories WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
