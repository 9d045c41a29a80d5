/// Campaign Routes
///
/// Every query is scoped to the authenticated user; another user's campaign
/// is reported as 404.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::ad::{AdResponse, AdRow};
use crate::domain::campaign::{
    CampaignDraft, CampaignFilter, CampaignListQuery, CampaignRow, CampaignStats,
    CreateCampaignRequest, UpdateCampaignRequest, UpdateStatusRequest,
};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;
use crate::pagination::{Paginated, Pagination};
use crate::routes::escape_like;

pub(crate) const CAMPAIGN_COLUMNS: &str = "id, user_id, name, description, platform, objective, \
    status, budget_total, budget_daily, budget_spent, targeting, start_date, end_date, \
    impressions, clicks, conversions, reach, created_at, updated_at";

pub(crate) const AD_COLUMNS: &str = "id, campaign_id, user_id, name, ad_type, status, content, \
    impressions, clicks, conversions, spend, performance_score, created_at, updated_at";

/// Loads a campaign owned by `user_id` or fails with 404.
pub(crate) async fn fetch_owned_campaign(
    pool: &PgPool,
    campaign_id: Uuid,
    user_id: Uuid,
) -> Result<CampaignRow, AppError> {
    sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {} FROM campaigns WHERE id = $1 AND user_id = $2",
        CAMPAIGN_COLUMNS
    ))
    .bind(campaign_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Campaign not found"))
}

/// Rebuilds a campaign's aggregate counters from its analytics rows.
pub(crate) async fn recompute_campaign_totals(
    connection: &mut PgConnection,
    campaign_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE campaigns c
        SET impressions = s.impressions, clicks = s.clicks, conversions = s.conversions,
            reach = s.reach, budget_spent = s.spend, updated_at = NOW()
        FROM (
            SELECT COALESCE(SUM(impressions), 0)::BIGINT AS impressions,
                   COALESCE(SUM(clicks), 0)::BIGINT AS clicks,
                   COALESCE(SUM(conversions), 0)::BIGINT AS conversions,
                   COALESCE(SUM(reach), 0)::BIGINT AS reach,
                   COALESCE(SUM(spend), 0)::DOUBLE PRECISION AS spend
            FROM analytics_daily WHERE campaign_id = $1
        ) s
        WHERE c.id = $1
        "#,
    )
    .bind(campaign_id)
    .execute(connection)
    .await?;
    Ok(())
}

async fn ad_ids_by_campaign(
    pool: &PgPool,
    campaign_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<Uuid>>, AppError> {
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT campaign_id, id FROM ads WHERE campaign_id = ANY($1) ORDER BY created_at, id",
    )
    .bind(campaign_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (campaign_id, ad_id) in rows {
        map.entry(campaign_id).or_default().push(ad_id);
    }
    Ok(map)
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, filter: &CampaignFilter) {
    builder.push(" WHERE user_id = ").push_bind(user_id);
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(platform) = filter.platform {
        builder.push(" AND platform = ").push_bind(platform.as_str());
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
}

/// POST /api/v1/campaigns
#[tracing::instrument(name = "create_campaign", skip_all, fields(user_id = %user.id))]
pub async fn create_campaign(
    user: AuthenticatedUser,
    body: web::Json<CreateCampaignRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let draft = CampaignDraft::from_request(body.into_inner(), Utc::now())?;

    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        r#"
        INSERT INTO campaigns (id, user_id, name, description, platform, objective, status,
                               budget_total, budget_daily, budget_spent, targeting,
                               start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, $10, $11, $12)
        RETURNING {}
        "#,
        CAMPAIGN_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.platform.as_str())
    .bind(draft.objective.as_str())
    .bind(draft.status.as_str())
    .bind(draft.budget.total)
    .bind(draft.budget.daily)
    .bind(Json(&draft.targeting))
    .bind(draft.schedule.start_date)
    .bind(draft.schedule.end_date)
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(campaign_id = %row.id, "Campaign created");

    Ok(HttpResponse::Created().json(row.into_response(Vec::new())))
}

/// GET /api/v1/campaigns
pub async fn list_campaigns(
    user: AuthenticatedUser,
    query: web::Query<CampaignListQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let filter = CampaignFilter::from_query(&query)?;
    let pagination = Pagination::new(query.page, query.limit)?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM campaigns");
    push_filters(&mut count, user.id, &filter);
    let (total,) = count
        .build_query_as::<(i64,)>()
        .fetch_one(pool.get_ref())
        .await?;

    let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM campaigns", CAMPAIGN_COLUMNS));
    push_filters(&mut select, user.id, &filter);
    select
        .push(" ORDER BY ")
        .push(filter.sort.order_by())
        .push(" LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());
    let rows = select
        .build_query_as::<CampaignRow>()
        .fetch_all(pool.get_ref())
        .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut ads = ad_ids_by_campaign(pool.get_ref(), &ids).await?;
    let data = rows
        .into_iter()
        .map(|row| {
            let ad_ids = ads.remove(&row.id).unwrap_or_default();
            row.into_response(ad_ids)
        })
        .collect();

    Ok(HttpResponse::Ok().json(Paginated::new(data, pagination, total)))
}

/// GET /api/v1/campaigns/stats
pub async fn campaign_stats(
    user: AuthenticatedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let rows: Vec<(String, i64, f64, f64)> = sqlx::query_as(
        r#"
        SELECT status,
               COUNT(*),
               COALESCE(SUM(budget_total), 0)::DOUBLE PRECISION,
               COALESCE(SUM(budget_spent), 0)::DOUBLE PRECISION
        FROM campaigns
        WHERE user_id = $1
        GROUP BY status
        "#,
    )
    .bind(user.id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(CampaignStats::from_rows(rows)))
}

/// GET /api/v1/campaigns/{id}
pub async fn get_campaign(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = fetch_owned_campaign(pool.get_ref(), path.into_inner(), user.id).await?;
    let ad_ids = ad_ids_by_campaign(pool.get_ref(), &[row.id])
        .await?
        .remove(&row.id)
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(row.into_response(ad_ids)))
}

/// PUT /api/v1/campaigns/{id}
///
/// Partial update; the merged campaign is re-validated as a whole.
#[tracing::instrument(name = "update_campaign", skip_all, fields(user_id = %user.id))]
pub async fn update_campaign(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCampaignRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign_id = path.into_inner();
    let mut transaction = pool.begin().await?;

    let current = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {} FROM campaigns WHERE id = $1 AND user_id = $2 FOR UPDATE",
        CAMPAIGN_COLUMNS
    ))
    .bind(campaign_id)
    .bind(user.id)
    .fetch_optional(&mut transaction)
    .await?
    .ok_or_else(|| AppError::not_found("Campaign not found"))?;

    let draft = CampaignDraft::from_row(&current)?.apply(body.into_inner())?;

    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        r#"
        UPDATE campaigns
        SET name = $1, description = $2, platform = $3, objective = $4, status = $5,
            budget_total = $6, budget_daily = $7, targeting = $8,
            start_date = $9, end_date = $10, updated_at = NOW()
        WHERE id = $11
        RETURNING {}
        "#,
        CAMPAIGN_COLUMNS
    ))
    .bind(&draft.name)
    .bind(&draft.description)
    .bind(draft.platform.as_str())
    .bind(draft.objective.as_str())
    .bind(draft.status.as_str())
    .bind(draft.budget.total)
    .bind(draft.budget.daily)
    .bind(Json(&draft.targeting))
    .bind(draft.schedule.start_date)
    .bind(draft.schedule.end_date)
    .bind(campaign_id)
    .fetch_one(&mut transaction)
    .await?;

    transaction.commit().await?;

    let ad_ids = ad_ids_by_campaign(pool.get_ref(), &[row.id])
        .await?
        .remove(&row.id)
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(row.into_response(ad_ids)))
}

/// PATCH /api/v1/campaigns/{id}/status
pub async fn update_campaign_status(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        r#"
        UPDATE campaigns SET status = $1, updated_at = NOW()
        WHERE id = $2 AND user_id = $3
        RETURNING {}
        "#,
        CAMPAIGN_COLUMNS
    ))
    .bind(body.status.as_str())
    .bind(path.into_inner())
    .bind(user.id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::not_found("Campaign not found"))?;

    tracing::info!(campaign_id = %row.id, status = %row.status, "Campaign status changed");

    let ad_ids = ad_ids_by_campaign(pool.get_ref(), &[row.id])
        .await?
        .remove(&row.id)
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(row.into_response(ad_ids)))
}

/// DELETE /api/v1/campaigns/{id}
///
/// Ads and analytics rows are removed by cascade.
pub async fn delete_campaign(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign_id = path.into_inner();
    let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND user_id = $2")
        .bind(campaign_id)
        .bind(user.id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Campaign not found"));
    }

    tracing::info!(campaign_id = %campaign_id, user_id = %user.id, "Campaign deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/campaigns/{id}/ads
pub async fn list_campaign_ads(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let campaign = fetch_owned_campaign(pool.get_ref(), path.into_inner(), user.id).await?;

    let ads: Vec<AdResponse> = sqlx::query_as::<_, AdRow>(&format!(
        "SELECT {} FROM ads WHERE campaign_id = $1 ORDER BY created_at DESC, id DESC",
        AD_COLUMNS
    ))
    .bind(campaign.id)
    .fetch_all(pool.get_ref())
    .await?
    .into_iter()
    .map(AdResponse::from)
    .collect();

    Ok(HttpResponse::Ok().json(ads))
}
