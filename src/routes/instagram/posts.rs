/// Posts and reels share one table; `kind` tells them apart.
/// Handlers mounted under both `/posts` and `/reels` read the collection's
/// kind from scope data and never touch a row of the other kind.

use actix_web::{web, HttpResponse};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::instagram::{
    CommentRequest, CreatePostRequest, CreateReelRequest, NewPost, PostCommentView, PostKind,
    PostListQuery, PostView, UpdateCaptionRequest,
};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;
use crate::pagination::{PageQuery, Paginated, Pagination};

/// Selects a `PostView`; the caller binds the viewer id first.
fn post_view_select(builder: &mut QueryBuilder<'_, Postgres>, viewer_id: Uuid) {
    builder
        .push(
            "SELECT p.id, p.author_id, u.username AS author_username, p.kind, p.caption, \
             p.media_urls, p.video_url, p.thumbnail_url, p.audio_name, p.location, p.view_count, \
             (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count, \
             (SELECT COUNT(*) FROM post_comments c WHERE c.post_id = p.id) AS comment_count, \
             EXISTS (SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ",
        )
        .push_bind(viewer_id)
        .push(") AS liked_by_me, p.created_at, p.updated_at FROM posts p JOIN users u ON u.id = p.author_id");
}

async fn fetch_post_view(
    pool: &PgPool,
    post_id: Uuid,
    viewer_id: Uuid,
    kind: Option<PostKind>,
) -> Result<PostView, AppError> {
    let mut builder = QueryBuilder::<Postgres>::new("");
    post_view_select(&mut builder, viewer_id);
    builder.push(" WHERE p.id = ").push_bind(post_id);
    if let Some(kind) = kind {
        builder.push(" AND p.kind = ").push_bind(kind.as_str());
    }

    builder
        .build_query_as::<PostView>()
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", describe(kind))))
}

fn describe(kind: Option<PostKind>) -> &'static str {
    match kind {
        Some(PostKind::Reel) => "Reel",
        _ => "Post",
    }
}

async fn post_author(pool: &PgPool, post_id: Uuid, kind: PostKind) -> Result<Uuid, AppError> {
    let (author_id,): (Uuid,) =
        sqlx::query_as("SELECT author_id FROM posts WHERE id = $1 AND kind = $2")
            .bind(post_id)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} not found", describe(Some(kind)))))?;
    Ok(author_id)
}

async fn insert_post(
    pool: &PgPool,
    author: &AuthenticatedUser,
    post: NewPost,
) -> Result<PostView, AppError> {
    let (post_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO posts (id, author_id, kind, caption, media_urls, video_url, thumbnail_url,
                           audio_name, location)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(author.id)
    .bind(post.kind.as_str())
    .bind(&post.caption)
    .bind(&post.media_urls)
    .bind(&post.video_url)
    .bind(&post.thumbnail_url)
    .bind(&post.audio_name)
    .bind(&post.location)
    .fetch_one(pool)
    .await?;

    tracing::info!(post_id = %post_id, kind = %post.kind, author_id = %author.id, "Post created");

    fetch_post_view(pool, post_id, author.id, None).await
}

/// POST /api/instagram/posts
pub async fn create_post(
    user: AuthenticatedUser,
    body: web::Json<CreatePostRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post = NewPost::try_from(body.into_inner())?;
    let view = insert_post(pool.get_ref(), &user, post).await?;
    Ok(HttpResponse::Created().json(view))
}

/// POST /api/instagram/reels
pub async fn create_reel(
    user: AuthenticatedUser,
    body: web::Json<CreateReelRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let reel = NewPost::try_from(body.into_inner())?;
    let view = insert_post(pool.get_ref(), &user, reel).await?;
    Ok(HttpResponse::Created().json(view))
}

async fn list_kind(
    pool: &PgPool,
    viewer: &AuthenticatedUser,
    kind: PostKind,
    query: &PostListQuery,
) -> Result<HttpResponse, AppError> {
    let pagination = Pagination::new(query.page, query.limit)?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p WHERE p.kind = ");
    count.push_bind(kind.as_str());
    if let Some(author_id) = query.author_id {
        count.push(" AND p.author_id = ").push_bind(author_id);
    }
    let (total,) = count.build_query_as::<(i64,)>().fetch_one(pool).await?;

    let mut select = QueryBuilder::<Postgres>::new("");
    post_view_select(&mut select, viewer.id);
    select.push(" WHERE p.kind = ").push_bind(kind.as_str());
    if let Some(author_id) = query.author_id {
        select.push(" AND p.author_id = ").push_bind(author_id);
    }
    select
        .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    let posts = select.build_query_as::<PostView>().fetch_all(pool).await?;

    Ok(HttpResponse::Ok().json(Paginated::new(posts, pagination, total)))
}

/// GET /api/instagram/posts
pub async fn list_posts(
    user: AuthenticatedUser,
    query: web::Query<PostListQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    list_kind(pool.get_ref(), &user, PostKind::Post, &query).await
}

/// GET /api/instagram/reels
pub async fn list_reels(
    user: AuthenticatedUser,
    query: web::Query<PostListQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    list_kind(pool.get_ref(), &user, PostKind::Reel, &query).await
}

/// GET /api/instagram/posts/{id}
pub async fn get_post(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let view = fetch_post_view(pool.get_ref(), path.into_inner(), user.id, Some(PostKind::Post))
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

/// GET /api/instagram/reels/{id}
///
/// Every fetch counts as a view.
pub async fn get_reel(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let reel_id = path.into_inner();
    let updated = sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1 AND kind = $2")
        .bind(reel_id)
        .bind(PostKind::Reel.as_str())
        .execute(pool.get_ref())
        .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("Reel not found"));
    }

    let view = fetch_post_view(pool.get_ref(), reel_id, user.id, Some(PostKind::Reel)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// PATCH /api/instagram/{posts|reels}/{id}
pub async fn update_caption(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCaptionRequest>,
    kind: web::Data<PostKind>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    let kind = *kind.get_ref();
    let caption = body.caption()?;
    user.require_owner(post_author(pool.get_ref(), post_id, kind).await?)?;

    sqlx::query("UPDATE posts SET caption = $1, updated_at = NOW() WHERE id = $2 AND kind = $3")
        .bind(&caption)
        .bind(post_id)
        .bind(kind.as_str())
        .execute(pool.get_ref())
        .await?;

    let view = fetch_post_view(pool.get_ref(), post_id, user.id, Some(kind)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// DELETE /api/instagram/{posts|reels}/{id}
pub async fn delete_post(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    kind: web::Data<PostKind>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    let kind = *kind.get_ref();
    user.require_owner(post_author(pool.get_ref(), post_id, kind).await?)?;

    sqlx::query("DELETE FROM posts WHERE id = $1 AND kind = $2")
        .bind(post_id)
        .bind(kind.as_str())
        .execute(pool.get_ref())
        .await?;

    tracing::info!(post_id = %post_id, kind = %kind, user_id = %user.id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}

async fn like_state(pool: &PgPool, post_id: Uuid, liked: bool) -> Result<HttpResponse, AppError> {
    let (like_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "post_id": post_id,
        "liked": liked,
        "like_count": like_count,
    })))
}

/// POST /api/instagram/{posts|reels}/{id}/like
///
/// Liking twice is a no-op.
pub async fn like_post(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    kind: web::Data<PostKind>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    post_author(pool.get_ref(), post_id, *kind.get_ref()).await?;

    sqlx::query(
        "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(user.id)
    .execute(pool.get_ref())
    .await?;

    like_state(pool.get_ref(), post_id, true).await
}

/// DELETE /api/instagram/{posts|reels}/{id}/like
pub async fn unlike_post(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    kind: web::Data<PostKind>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    post_author(pool.get_ref(), post_id, *kind.get_ref()).await?;

    sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
        .bind(post_id)
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    like_state(pool.get_ref(), post_id, false).await
}

/// POST /api/instagram/{posts|reels}/{id}/comments
pub async fn add_comment(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
    kind: web::Data<PostKind>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    let text = body.text()?;
    post_author(pool.get_ref(), post_id, *kind.get_ref()).await?;

    let (id, created_at): (Uuid, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        r#"
        INSERT INTO post_comments (id, post_id, author_id, text)
        VALUES ($1, $2, $3, $4)
        RETURNING id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(post_id)
    .bind(user.id)
    .bind(&text)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(PostCommentView {
        id,
        post_id,
        author_id: user.id,
        author_username: user.username,
        text,
        created_at,
    }))
}

/// GET /api/instagram/{posts|reels}/{id}/comments
pub async fn list_comments(
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
    kind: web::Data<PostKind>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post_id = path.into_inner();
    let pagination = query.pagination()?;
    post_author(pool.get_ref(), post_id, *kind.get_ref()).await?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_comments WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool.get_ref())
        .await?;

    let comments = sqlx::query_as::<_, PostCommentView>(
        r#"
        SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at
        FROM post_comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.post_id = $1
        ORDER BY c.created_at DESC, c.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(post_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(comments, pagination, total)))
}
