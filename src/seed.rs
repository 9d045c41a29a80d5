//! Demo data for local development
//!
//! Wipes every domain table and inserts a small, deterministic data set: a
//! demo user and an admin, campaigns with ads and two weeks of analytics,
//! Instagram posts, reels and stories, and YouTube channels with videos.

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::domain::ad::performance_score;
use crate::domain::user::Role;
use crate::error::AppError;

pub const DEMO_EMAIL: &str = "demo@alphacreator.dev";
pub const DEMO_PASSWORD: &str = "DemoPass123";
pub const ADMIN_EMAIL: &str = "admin@alphacreator.dev";
pub const ADMIN_PASSWORD: &str = "AdminPass123";

const ANALYTICS_DAYS: i64 = 14;

const DOMAIN_TABLES: &str = "video_comments, video_likes, videos, subscriptions, channels, \
    analytics_events, advertisements, story_views, stories, post_comments, post_likes, posts, \
    analytics_daily, ads, campaigns, users";

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub users: usize,
    pub campaigns: usize,
    pub ads: usize,
    pub analytics_rows: usize,
    pub posts: usize,
    pub stories: usize,
    pub channels: usize,
    pub videos: usize,
}

struct CampaignFixture {
    name: &'static str,
    platform: &'static str,
    objective: &'static str,
    status: &'static str,
    budget_total: f64,
    budget_daily: f64,
    ads: &'static [(&'static str, &'static str, &'static str)],
}

const CAMPAIGNS: &[CampaignFixture] = &[
    CampaignFixture {
        name: "Summer Launch",
        platform: "instagram",
        objective: "awareness",
        status: "active",
        budget_total: 5000.0,
        budget_daily: 250.0,
        ads: &[
            ("Beach hero image", "image", "Summer is here"),
            ("Launch teaser", "video", "Watch the reveal"),
        ],
    },
    CampaignFixture {
        name: "Back to School",
        platform: "facebook",
        objective: "traffic",
        status: "active",
        budget_total: 3000.0,
        budget_daily: 150.0,
        ads: &[
            ("Carousel of supplies", "carousel", "Everything you need"),
            ("Text offer", "text", "20% off backpacks"),
        ],
    },
    CampaignFixture {
        name: "Holiday Giveaway",
        platform: "tiktok",
        objective: "engagement",
        status: "paused",
        budget_total: 2000.0,
        budget_daily: 100.0,
        ads: &[("Giveaway story", "story", "Enter to win")],
    },
];

async fn insert_user(
    transaction: &mut Transaction<'_, Postgres>,
    email: &str,
    username: &str,
    password: &str,
    role: Role,
) -> Result<Uuid, AppError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, username, password_hash, role, is_verified)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(username)
    .bind(hash_password(password)?)
    .bind(role.as_str())
    .fetch_one(&mut *transaction)
    .await?;
    Ok(id)
}

async fn seed_campaigns(
    transaction: &mut Transaction<'_, Postgres>,
    rng: &mut StdRng,
    user_id: Uuid,
    summary: &mut SeedSummary,
) -> Result<(), AppError> {
    let today = Utc::now().date_naive();

    for fixture in CAMPAIGNS {
        let targeting = json!({
            "age_min": 18,
            "age_max": 45,
            "genders": ["all"],
            "locations": ["US", "CA"],
            "interests": ["fashion", "travel"],
        });
        let (campaign_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO campaigns (id, user_id, name, description, platform, objective, status,
                                   budget_total, budget_daily, targeting, start_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(fixture.name)
        .bind(format!("Demo campaign: {}", fixture.name))
        .bind(fixture.platform)
        .bind(fixture.objective)
        .bind(fixture.status)
        .bind(fixture.budget_total)
        .bind(fixture.budget_daily)
        .bind(&targeting)
        .bind(Utc::now() - Duration::days(ANALYTICS_DAYS))
        .fetch_one(&mut *transaction)
        .await?;
        summary.campaigns += 1;

        for &(name, ad_type, headline) in fixture.ads {
            let content = json!({
                "headline": headline,
                "body": format!("{} from Alpha Creator", headline),
                "call_to_action": "learn_more",
                "media_url": "https://cdn.alphacreator.dev/demo/media.jpg",
                "destination_url": "https://alphacreator.dev",
            });
            let (ad_id,): (Uuid,) = sqlx::query_as(
                r#"
                INSERT INTO ads (id, campaign_id, user_id, name, ad_type, status, content)
                VALUES ($1, $2, $3, $4, $5, 'active', $6)
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(campaign_id)
            .bind(user_id)
            .bind(name)
            .bind(ad_type)
            .bind(&content)
            .fetch_one(&mut *transaction)
            .await?;
            summary.ads += 1;

            let (mut impressions, mut clicks, mut conversions, mut spend) = (0i64, 0i64, 0i64, 0f64);
            for offset in 0..ANALYTICS_DAYS {
                let day_impressions: i64 = rng.gen_range(800..5_000);
                let day_clicks: i64 = rng.gen_range(10..day_impressions / 15);
                let day_conversions: i64 = rng.gen_range(0..=day_clicks / 5);
                let day_spend = (rng.gen_range(20.0..fixture.budget_daily) * 100.0).round() / 100.0;
                let day_revenue = (day_spend * rng.gen_range(0.5..3.0) * 100.0).round() / 100.0;

                sqlx::query(
                    r#"
                    INSERT INTO analytics_daily (id, user_id, campaign_id, ad_id, date,
                                                 impressions, clicks, conversions, reach,
                                                 spend, revenue)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(user_id)
                .bind(campaign_id)
                .bind(ad_id)
                .bind(today - Duration::days(offset))
                .bind(day_impressions)
                .bind(day_clicks)
                .bind(day_conversions)
                .bind(day_impressions * 7 / 10)
                .bind(day_spend)
                .bind(day_revenue)
                .execute(&mut *transaction)
                .await?;
                summary.analytics_rows += 1;

                impressions += day_impressions;
                clicks += day_clicks;
                conversions += day_conversions;
                spend += day_spend;
            }

            sqlx::query(
                r#"
                UPDATE ads
                SET impressions = $1, clicks = $2, conversions = $3, spend = $4,
                    performance_score = $5
                WHERE id = $6
                "#,
            )
            .bind(impressions)
            .bind(clicks)
            .bind(conversions)
            .bind(spend)
            .bind(performance_score(impressions, clicks, conversions))
            .bind(ad_id)
            .execute(&mut *transaction)
            .await?;
        }

        // Campaign counters are the sum of their ads' rows.
        sqlx::query(
            r#"
            UPDATE campaigns c
            SET impressions = s.impressions, clicks = s.clicks, conversions = s.conversions,
                reach = s.reach, budget_spent = LEAST(s.spend, c.budget_total)
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
        .execute(&mut *transaction)
        .await?;
    }
    Ok(())
}

async fn seed_instagram(
    transaction: &mut Transaction<'_, Postgres>,
    author_id: Uuid,
    viewer_id: Uuid,
    summary: &mut SeedSummary,
) -> Result<(), AppError> {
    let posts = [
        ("Golden hour at the pier", "https://cdn.alphacreator.dev/demo/pier.jpg"),
        ("New studio setup", "https://cdn.alphacreator.dev/demo/studio.jpg"),
        ("Coffee and planning", "https://cdn.alphacreator.dev/demo/coffee.jpg"),
    ];
    for (caption, media_url) in posts {
        let (post_id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO posts (id, author_id, kind, caption, media_urls) VALUES ($1, $2, 'post', $3, $4) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(author_id)
        .bind(caption)
        .bind(vec![media_url.to_string()])
        .fetch_one(&mut *transaction)
        .await?;
        summary.posts += 1;

        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(viewer_id)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("INSERT INTO post_comments (id, post_id, author_id, text) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(viewer_id)
            .bind("Love this!")
            .execute(&mut *transaction)
            .await?;
        sqlx::query(
            "INSERT INTO analytics_events (id, post_id, user_id, event_type) VALUES ($1, $2, $3, 'view')",
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(viewer_id)
        .execute(&mut *transaction)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO posts (id, author_id, kind, caption, video_url, thumbnail_url, audio_name, view_count)
        VALUES ($1, $2, 'reel', $3, $4, $5, $6, 1200)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind("60 seconds of behind the scenes")
    .bind("https://cdn.alphacreator.dev/demo/reel.mp4")
    .bind("https://cdn.alphacreator.dev/demo/reel.jpg")
    .bind("Original audio")
    .execute(&mut *transaction)
    .await?;
    summary.posts += 1;

    sqlx::query(
        r#"
        INSERT INTO stories (id, author_id, media_url, media_type, caption, expires_at)
        VALUES ($1, $2, $3, 'image', $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind("https://cdn.alphacreator.dev/demo/story.jpg")
    .bind("Today's shoot")
    .bind(Utc::now() + Duration::hours(20))
    .execute(&mut *transaction)
    .await?;
    summary.stories += 1;

    sqlx::query(
        r#"
        INSERT INTO advertisements (id, owner_id, title, description, image_url, target_url, budget)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(author_id)
    .bind("Summer collection")
    .bind("Shop the new summer collection")
    .bind("https://cdn.alphacreator.dev/demo/ad.jpg")
    .bind("https://alphacreator.dev/shop")
    .bind(500.0_f64)
    .execute(&mut *transaction)
    .await?;

    Ok(())
}

async fn seed_youtube(
    transaction: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    subscriber_id: Uuid,
    summary: &mut SeedSummary,
) -> Result<(), AppError> {
    let channels = [
        ("alphacreator", "Alpha Creator", &["Growing on a budget", "Ad creative teardown"][..]),
        ("creator_labs", "Creator Labs", &["Lighting on a budget"][..]),
    ];
    for (handle, name, titles) in channels {
        let (channel_id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO channels (id, owner_id, handle, name, description) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(handle)
        .bind(name)
        .bind(format!("Videos from {}", name))
        .fetch_one(&mut *transaction)
        .await?;
        summary.channels += 1;

        sqlx::query("INSERT INTO subscriptions (channel_id, subscriber_id) VALUES ($1, $2)")
            .bind(channel_id)
            .bind(subscriber_id)
            .execute(&mut *transaction)
            .await?;

        for &title in titles {
            sqlx::query(
                r#"
                INSERT INTO videos (id, channel_id, title, description, video_url, thumbnail_url,
                                    duration_seconds, visibility, tags, view_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'public', $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(channel_id)
            .bind(title)
            .bind(format!("{} - full walkthrough", title))
            .bind("https://cdn.alphacreator.dev/demo/video.mp4")
            .bind("https://cdn.alphacreator.dev/demo/video.jpg")
            .bind(600_i32)
            .bind(vec!["marketing".to_string(), "creator".to_string()])
            .bind(3400_i64)
            .execute(&mut *transaction)
            .await?;
            summary.videos += 1;
        }
    }
    Ok(())
}

/// Truncates the domain tables and inserts the demo data set in one
/// transaction.
pub async fn seed(pool: &PgPool) -> Result<SeedSummary, AppError> {
    let mut summary = SeedSummary::default();
    let mut rng = StdRng::seed_from_u64(42);
    let mut transaction = pool.begin().await?;

    sqlx::query(&format!("TRUNCATE {} CASCADE", DOMAIN_TABLES))
        .execute(&mut transaction)
        .await?;

    let demo_id = insert_user(&mut transaction, DEMO_EMAIL, "demo", DEMO_PASSWORD, Role::User).await?;
    let admin_id =
        insert_user(&mut transaction, ADMIN_EMAIL, "admin", ADMIN_PASSWORD, Role::Admin).await?;
    summary.users = 2;

    seed_campaigns(&mut transaction, &mut rng, demo_id, &mut summary).await?;
    seed_instagram(&mut transaction, demo_id, admin_id, &mut summary).await?;
    seed_youtube(&mut transaction, demo_id, admin_id, &mut summary).await?;

    transaction.commit().await?;
    Ok(summary)
}
