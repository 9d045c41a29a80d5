use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::instagram::{
    AdvertisementDraft, AdvertisementRow, CreateAdvertisementRequest, UpdateAdvertisementRequest,
};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;
use crate::pagination::{PageQuery, Paginated};

const ADVERTISEMENT_COLUMNS: &str = "id, owner_id, title, description, image_url, target_url, \
    budget, impressions, clicks, is_active, created_at, updated_at";

async fn fetch_advertisement(pool: &PgPool, id: Uuid) -> Result<AdvertisementRow, AppError> {
    sqlx::query_as::<_, AdvertisementRow>(&format!(
        "SELECT {} FROM advertisements WHERE id = $1",
        ADVERTISEMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Advertisement not found"))
}

/// POST /api/instagram/advertisements
pub async fn create_advertisement(
    user: AuthenticatedUser,
    body: web::Json<CreateAdvertisementRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let draft = AdvertisementDraft::from_request(body.into_inner())?;

    let row = sqlx::query_as::<_, AdvertisementRow>(&format!(
        r#"
        INSERT INTO advertisements (id, owner_id, title, description, image_url, target_url,
                                    budget, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        ADVERTISEMENT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.image_url)
    .bind(&draft.target_url)
    .bind(draft.budget)
    .bind(draft.is_active)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Created().json(row))
}

/// GET /api/instagram/advertisements
pub async fn list_advertisements(
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination()?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM advertisements")
        .fetch_one(pool.get_ref())
        .await?;

    let rows = sqlx::query_as::<_, AdvertisementRow>(&format!(
        "SELECT {} FROM advertisements ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        ADVERTISEMENT_COLUMNS
    ))
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Paginated::new(rows, pagination, total)))
}

/// GET /api/instagram/advertisements/{id}
pub async fn get_advertisement(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = fetch_advertisement(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}

/// PUT /api/instagram/advertisements/{id}
pub async fn update_advertisement(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAdvertisementRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let current = fetch_advertisement(pool.get_ref(), path.into_inner()).await?;
    user.require_owner(current.owner_id)?;
    let draft = AdvertisementDraft::from_row(&current).apply(body.into_inner())?;

    let row = sqlx::query_as::<_, AdvertisementRow>(&format!(
        r#"
        UPDATE advertisements
        SET title = $1, description = $2, image_url = $3, target_url = $4, budget = $5,
            is_active = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING {}
        "#,
        ADVERTISEMENT_COLUMNS
    ))
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.image_url)
    .bind(&draft.target_url)
    .bind(draft.budget)
    .bind(draft.is_active)
    .bind(current.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Advertisement not found"))?;

    Ok(HttpResponse::Ok().json(row))
}

/// DELETE /api/instagram/advertisements/{id}
pub async fn delete_advertisement(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let current = fetch_advertisement(pool.get_ref(), path.into_inner()).await?;
    user.require_owner(current.owner_id)?;

    sqlx::query("DELETE FROM advertisements WHERE id = $1")
        .bind(current.id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

async fn bump_counter(pool: &PgPool, id: Uuid, column: Counter) -> Result<HttpResponse, AppError> {
    let sql = match column {
        Counter::Click => "UPDATE advertisements SET clicks = clicks + 1 WHERE id = $1 RETURNING impressions, clicks",
        Counter::Impression => "UPDATE advertisements SET impressions = impressions + 1 WHERE id = $1 RETURNING impressions, clicks",
    };
    let (impressions, clicks): (i64, i64) = sqlx::query_as(sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Advertisement not found"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": id,
        "impressions": impressions,
        "clicks": clicks,
    })))
}

enum Counter {
    Click,
    Impression,
}

/// POST /api/instagram/advertisements/{id}/click
pub async fn record_click(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    bump_counter(pool.get_ref(), path.into_inner(), Counter::Click).await
}

/// POST /api/instagram/advertisements/{id}/impression
pub async fn record_impression(
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    bump_counter(pool.get_ref(), path.into_inner(), Counter::Impression).await
}
