/// Analytics Routes
///
/// Recording a day's metrics updates three places in one transaction: the
/// per-day row, the campaign counters and (when given) the ad counters.

use actix_web::{web, HttpResponse};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::ad::performance_score;
use crate::domain::analytics::{
    AnalyticsRow, AnalyticsTotals, CampaignSeries, DailyPoint, DateRangeQuery, MetricSums,
    RecordAnalyticsRequest,
};
use crate::domain::user::AuthenticatedUser;
use crate::error::AppError;
use crate::routes::campaigns::fetch_owned_campaign;

const SUM_COLUMNS: &str = "COALESCE(SUM(impressions), 0)::BIGINT AS impressions, \
    COALESCE(SUM(clicks), 0)::BIGINT AS clicks, \
    COALESCE(SUM(conversions), 0)::BIGINT AS conversions, \
    COALESCE(SUM(spend), 0)::DOUBLE PRECISION AS spend, \
    COALESCE(SUM(revenue), 0)::DOUBLE PRECISION AS revenue";

fn push_date_range(builder: &mut QueryBuilder<'_, Postgres>, range: &DateRangeQuery) {
    if let Some(from) = range.from {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = range.to {
        builder.push(" AND date <= ").push_bind(to);
    }
}

/// POST /api/v1/analytics
#[tracing::instrument(name = "record_analytics", skip_all, fields(user_id = %user.id))]
pub async fn record_analytics(
    user: AuthenticatedUser,
    body: web::Json<RecordAnalyticsRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    let campaign = fetch_owned_campaign(pool.get_ref(), request.campaign_id, user.id).await?;

    let mut transaction = pool.begin().await?;

    if let Some(ad_id) = request.ad_id {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM ads WHERE id = $1 AND campaign_id = $2 FOR UPDATE")
                .bind(ad_id)
                .bind(campaign.id)
                .fetch_optional(&mut transaction)
                .await?;
        if exists.is_none() {
            return Err(AppError::not_found("Ad not found"));
        }
    }

    let row = sqlx::query_as::<_, AnalyticsRow>(
        r#"
        INSERT INTO analytics_daily (id, user_id, campaign_id, ad_id, date,
                                     impressions, clicks, conversions, reach, spend, revenue)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (campaign_id, ad_key, date) DO UPDATE
        SET impressions = analytics_daily.impressions + EXCLUDED.impressions,
            clicks = analytics_daily.clicks + EXCLUDED.clicks,
            conversions = analytics_daily.conversions + EXCLUDED.conversions,
            reach = analytics_daily.reach + EXCLUDED.reach,
            spend = analytics_daily.spend + EXCLUDED.spend,
            revenue = analytics_daily.revenue + EXCLUDED.revenue,
            updated_at = NOW()
        RETURNING id, campaign_id, ad_id, date, impressions, clicks, conversions, reach,
                  spend, revenue
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(campaign.id)
    .bind(request.ad_id)
    .bind(request.date)
    .bind(request.impressions)
    .bind(request.clicks)
    .bind(request.conversions)
    .bind(request.reach)
    .bind(request.spend)
    .bind(request.revenue)
    .fetch_one(&mut transaction)
    .await?;

    sqlx::query(
        r#"
        UPDATE campaigns
        SET impressions = impressions + $1,
            clicks = clicks + $2,
            conversions = conversions + $3,
            reach = reach + $4,
            budget_spent = budget_spent + $5,
            updated_at = NOW()
        WHERE id = $6
        "#,
    )
    .bind(request.impressions)
    .bind(request.clicks)
    .bind(request.conversions)
    .bind(request.reach)
    .bind(request.spend)
    .bind(campaign.id)
    .execute(&mut transaction)
    .await?;

    if let Some(ad_id) = request.ad_id {
        let (impressions, clicks, conversions): (i64, i64, i64) = sqlx::query_as(
            r#"
            UPDATE ads
            SET impressions = impressions + $1,
                clicks = clicks + $2,
                conversions = conversions + $3,
                spend = spend + $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING impressions, clicks, conversions
            "#,
        )
        .bind(request.impressions)
        .bind(request.clicks)
        .bind(request.conversions)
        .bind(request.spend)
        .bind(ad_id)
        .fetch_one(&mut transaction)
        .await?;

        sqlx::query("UPDATE ads SET performance_score = $1 WHERE id = $2")
            .bind(performance_score(impressions, clicks, conversions))
            .bind(ad_id)
            .execute(&mut transaction)
            .await?;
    }

    transaction.commit().await?;

    tracing::info!(
        campaign_id = %campaign.id,
        date = %request.date,
        "Analytics recorded"
    );

    Ok(HttpResponse::Created().json(row))
}

/// GET /api/v1/analytics/overview
pub async fn overview(
    user: AuthenticatedUser,
    query: web::Query<DateRangeQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;

    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM analytics_daily", SUM_COLUMNS));
    builder.push(" WHERE user_id = ").push_bind(user.id);
    push_date_range(&mut builder, &query);

    let sums = builder
        .build_query_as::<MetricSums>()
        .fetch_one(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AnalyticsTotals::from(sums)))
}

/// GET /api/v1/analytics/campaigns/{campaign_id}
pub async fn campaign_series(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    query: web::Query<DateRangeQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let campaign = fetch_owned_campaign(pool.get_ref(), path.into_inner(), user.id).await?;

    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT date, {} FROM analytics_daily",
        SUM_COLUMNS
    ));
    builder.push(" WHERE campaign_id = ").push_bind(campaign.id);
    push_date_range(&mut builder, &query);
    builder.push(" GROUP BY date ORDER BY date");

    let series = builder
        .build_query_as::<DailyPoint>()
        .fetch_all(pool.get_ref())
        .await?;

    let sums = series.iter().fold(MetricSums::default(), |acc, day| MetricSums {
        impressions: acc.impressions + day.impressions,
        clicks: acc.clicks + day.clicks,
        conversions: acc.conversions + day.conversions,
        spend: acc.spend + day.spend,
        revenue: acc.revenue + day.revenue,
    });

    Ok(HttpResponse::Ok().json(CampaignSeries {
        campaign_id: campaign.id,
        series,
        totals: AnalyticsTotals::from(sums),
    }))
}
