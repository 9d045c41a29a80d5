use actix_web::{web, HttpResponse};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::ad::{
    AdDraft, AdListQuery, AdResponse, AdRow, AdStatus, CreateAdRequest, UpdateAdRequest,
    UpdateAdStatusRequest,
};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;
use crate::pagination::{Paginated, Pagination};
use crate::routes::campaigns::{fetch_owned_campaign, recompute_campaign_totals, AD_COLUMNS};

fn push_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    user_id: Uuid,
    campaign_id: Option<Uuid>,
    status: Option<AdStatus>,
) {
    builder.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(campaign_id) = campaign_id {
        builder.push(" AND campaign_id = ").push_bind(campaign_id);
    }
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
}

/// POST /api/v1/ads
#[tracing::instrument(name = "create_ad", skip_all, fields(user_id = %user.id))]
pub async fn create_ad(
    user: AuthenticatedUser,
    body: web::Json<CreateAdRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    let campaign = fetch_owned_campaign(pool.get_ref(), request.campaign_id, user.id).await?;
    let draft = AdDraft::from_request(request)?;

    let row = sqlx::query_as::<_, AdRow>(&format!(
        r#"
        INSERT INTO ads (id, campaign_id, user_id, name, ad_type, status, content)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        AD_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(campaign.id)
    .bind(user.id)
    .bind(&draft.name)
    .bind(draft.ad_type.as_str())
    .bind(draft.status.as_str())
    .bind(Json(&draft.content))
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(ad_id = %row.id, campaign_id = %campaign.id, "Ad created");

    Ok(HttpResponse::Created().json(AdResponse::from(row)))
}

/// GET /api/v1/ads
pub async fn list_ads(
    user: AuthenticatedUser,
    query: web::Query<AdListQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let status = query.status()?;
    let pagination = Pagination::new(query.page, query.limit)?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ads");
    push_filters(&mut count, user.id, query.campaign_id, status);
    let (total,) = count
        .build_query_as::<(i64,)>()
        .fetch_one(pool.get_ref())
        .await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM ads", AD_COLUMNS));
    push_filters(&mut select, user.id, query.campaign_id, status);
    select
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    let ads: Vec<AdResponse> = select
        .build_query_as::<AdRow>()
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(AdResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(Paginated::new(ads, pagination, total)))
}

async fn fetch_owned_ad(pool: &PgPool, ad_id: Uuid, user_id: Uuid) -> Result<AdRow, AppError> {
    sqlx::query_as::<_, AdRow>(&format!(
        "SELECT {} FROM ads WHERE id = $1 AND user_id = $2",
        AD_COLUMNS
    ))
    .bind(ad_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Ad not found"))
}

/// GET /api/v1/ads/{id}
pub async fn get_ad(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = fetch_owned_ad(pool.get_ref(), path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(AdResponse::from(row)))
}

/// PUT /api/v1/ads/{id}
pub async fn update_ad(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAdRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let current = fetch_owned_ad(pool.get_ref(), path.into_inner(), user.id).await?;
    let draft = AdDraft::from_row(&current)?.apply(body.into_inner())?;

    let row = sqlx::query_as::<_, AdRow>(&format!(
        r#"
        UPDATE ads
        SET name = $1, ad_type = $2, status = $3, content = $4, updated_at = NOW()
        WHERE id = $5 AND user_id = $6
        RETURNING {}
        "#,
        AD_COLUMNS
    ))
    .bind(&draft.name)
    .bind(draft.ad_type.as_str())
    .bind(draft.status.as_str())
    .bind(Json(&draft.content))
    .bind(current.id)
    .bind(user.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Ad not found"))?;

    Ok(HttpResponse::Ok().json(AdResponse::from(row)))
}

/// PATCH /api/v1/ads/{id}/status
pub async fn update_ad_status(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateAdStatusRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = sqlx::query_as::<_, AdRow>(&format!(
        r#"
        UPDATE ads SET status = $1, updated_at = NOW()
        WHERE id = $2 AND user_id = $3
        RETURNING {}
        "#,
        AD_COLUMNS
    ))
    .bind(body.status.as_str())
    .bind(path.into_inner())
    .bind(user.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Ad not found"))?;

    tracing::info!(ad_id = %row.id, status = %row.status, "Ad status changed");

    Ok(HttpResponse::Ok().json(AdResponse::from(row)))
}

/// DELETE /api/v1/ads/{id}
///
/// The ad's analytics rows go with it, so the campaign totals are rebuilt
/// from what remains.
pub async fn delete_ad(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let mut transaction = pool.begin().await?;

    let (ad_id, campaign_id): (Uuid, Uuid) = sqlx::query_as(
        "DELETE FROM ads WHERE id = $1 AND user_id = $2 RETURNING id, campaign_id",
    )
    .bind(path.into_inner())
    .bind(user.id)
    .fetch_optional(&mut transaction)
    .await?
    .ok_or_else(|| AppError::not_found("Ad not found"))?;

    recompute_campaign_totals(&mut transaction, campaign_id).await?;
    transaction.commit().await?;

    tracing::info!(ad_id = %ad_id, campaign_id = %campaign_id, "Ad deleted");
    Ok(HttpResponse::NoContent().finish())
}
