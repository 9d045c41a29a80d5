mod common;

use common::{spawn_app, TestApp};
use serde_json::{json, Value};

async fn create_campaign(app: &TestApp, token: &str, name: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/v1/campaigns"))
        .bearer_auth(token)
        .json(&json!({
            "name": name,
            "platform": "instagram",
            "objective": "traffic",
            "budget": { "total": 1000.0, "daily": 50.0 },
            "targeting": { "age_min": 21, "age_max": 45, "locations": ["KR"] }
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn create_ad(app: &TestApp, token: &str, campaign_id: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/v1/ads"))
        .bearer_auth(token)
        .json(&json!({
            "campaign_id": campaign_id,
            "name": "Hero banner",
            "ad_type": "image",
            "content": { "headline": "Autumn drop", "destination_url": "https://shop.example.com" }
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn create_campaign_applies_defaults() {
    let app = spawn_app().await;
    let token = app.access_token("owner@example.com", "owner").await;

    let campaign = create_campaign(&app, &token, "Autumn launch").await;

    assert_eq!(campaign["name"], "Autumn launch");
    assert_eq!(campaign["status"], "draft");
    assert_eq!(campaign["budget"]["spent"], 0.0);
    assert_eq!(campaign["targeting"]["age_min"], 21);
    assert_eq!(campaign["metrics"]["impressions"], 0);
    assert_eq!(campaign["ads"], json!([]));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn list_campaigns_is_paginated() {
    let app = spawn_app().await;
    let token = app.access_token("pager@example.com", "pager").await;
    for i in 0..3 {
        create_campaign(&app, &token, &format!("Campaign {}", i)).await;
    }

    let response = app
        .client
        .get(app.url("/api/v1/campaigns?page=2&limit=2&sort=name"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Campaign 2");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn list_campaigns_filters_by_search_term() {
    let app = spawn_app().await;
    let token = app.access_token("search@example.com", "searcher").await;
    create_campaign(&app, &token, "Summer 50% off").await;
    create_campaign(&app, &token, "Winter promo").await;

    let url = format!("/api/v1/campaigns?search={}", urlencoding::encode("50%"));
    let response = app
        .client
        .get(app.url(&url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Summer 50% off");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn invalid_query_parameters_return_400() {
    let app = spawn_app().await;
    let token = app.access_token("query@example.com", "query").await;

    for query in ["limit=0", "limit=101", "page=0", "status=bogus", "sort=password_hash"] {
        let response = app
            .client
            .get(app.url(&format!("/api/v1/campaigns?{}", query)))
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(400, response.status().as_u16(), "query: {}", query);
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn other_users_campaign_is_not_found() {
    let app = spawn_app().await;
    let alice = app.access_token("alice@example.com", "alice").await;
    let bob = app.access_token("bob@example.com", "bob").await;
    let campaign = create_campaign(&app, &alice, "Private").await;
    let id = campaign["id"].as_str().unwrap();

    let read = app
        .client
        .get(app.url(&format!("/api/v1/campaigns/{}", id)))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to execute request.");
    let delete = app
        .client
        .delete(app.url(&format!("/api/v1/campaigns/{}", id)))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, read.status().as_u16());
    assert_eq!(404, delete.status().as_u16());

    // Bob cannot attach ads to it either.
    let response = app
        .client
        .post(app.url("/api/v1/ads"))
        .bearer_auth(&bob)
        .json(&json!({
            "campaign_id": id,
            "name": "Sneaky",
            "ad_type": "text",
            "content": { "headline": "Hi" }
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn malformed_campaign_id_returns_400() {
    let app = spawn_app().await;
    let token = app.access_token("path@example.com", "pathuser").await;

    let response = app
        .client
        .get(app.url("/api/v1/campaigns/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn ad_status_update_rejects_unknown_status() {
    let app = spawn_app().await;
    let token = app.access_token("ads@example.com", "adsuser").await;
    let campaign = create_campaign(&app, &token, "With ads").await;
    let ad = create_ad(&app, &token, campaign["id"].as_str().unwrap()).await;
    let ad_url = app.url(&format!("/api/v1/ads/{}/status", ad["id"].as_str().unwrap()));

    let response = app
        .client
        .patch(&ad_url)
        .bearer_auth(&token)
        .json(&json!({ "status": "launched" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let response = app
        .client
        .patch(&ad_url)
        .bearer_auth(&token)
        .json(&json!({ "status": "active" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "active");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn deleting_campaign_removes_its_ads() {
    let app = spawn_app().await;
    let token = app.access_token("cascade@example.com", "cascade").await;
    let campaign = create_campaign(&app, &token, "Short lived").await;
    let campaign_id = campaign["id"].as_str().unwrap();
    let ad = create_ad(&app, &token, campaign_id).await;

    let response = app
        .client
        .delete(app.url(&format!("/api/v1/campaigns/{}", campaign_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    let response = app
        .client
        .get(app.url(&format!("/api/v1/ads/{}", ad["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn recording_analytics_updates_campaign_and_overview() {
    let app = spawn_app().await;
    let token = app.access_token("metrics@example.com", "metrics").await;
    let campaign = create_campaign(&app, &token, "Measured").await;
    let campaign_id = campaign["id"].as_str().unwrap();
    let ad = create_ad(&app, &token, campaign_id).await;
    let ad_id = ad["id"].as_str().unwrap();

    for _ in 0..2 {
        let response = app
            .client
            .post(app.url("/api/v1/analytics"))
            .bearer_auth(&token)
            .json(&json!({
                "campaign_id": campaign_id,
                "ad_id": ad_id,
                "date": "2026-03-01",
                "impressions": 500,
                "clicks": 25,
                "conversions": 5,
                "spend": 12.5,
                "revenue": 50.0
            }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, response.status().as_u16());
    }

    let response = app
        .client
        .get(app.url(&format!("/api/v1/campaigns/{}", campaign_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    let campaign: Value = response.json().await.unwrap();
    assert_eq!(campaign["metrics"]["impressions"], 1000);
    assert_eq!(campaign["metrics"]["clicks"], 50);
    assert_eq!(campaign["budget"]["spent"], 25.0);

    let response = app
        .client
        .get(app.url("/api/v1/analytics/overview?from=2026-03-01&to=2026-03-31"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let overview: Value = response.json().await.unwrap();
    assert_eq!(overview["impressions"], 1000);
    assert_eq!(overview["ctr"], 5.0);
    assert_eq!(overview["cpc"], 0.5);
    assert_eq!(overview["roas"], 4.0);

    let response = app
        .client
        .get(app.url(&format!("/api/v1/analytics/campaigns/{}", campaign_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    let series: Value = response.json().await.unwrap();
    // Same day and ad upsert into one row.
    assert_eq!(series["series"].as_array().unwrap().len(), 1);
    assert_eq!(series["totals"]["conversions"], 10);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn deleting_ad_rebuilds_campaign_totals() {
    let app = spawn_app().await;
    let token = app.access_token("rebuild@example.com", "rebuild").await;
    let campaign = create_campaign(&app, &token, "Rebuilt").await;
    let campaign_id = campaign["id"].as_str().unwrap();
    let ad = create_ad(&app, &token, campaign_id).await;
    let ad_id = ad["id"].as_str().unwrap();

    let rows = [
        json!({"campaign_id": campaign_id, "ad_id": ad_id, "date": "2026-04-01",
               "impressions": 500, "clicks": 25, "spend": 12.5}),
        json!({"campaign_id": campaign_id, "date": "2026-04-01",
               "impressions": 200, "clicks": 4, "spend": 5.0}),
    ];
    for row in rows {
        let response = app
            .client
            .post(app.url("/api/v1/analytics"))
            .bearer_auth(&token)
            .json(&row)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, response.status().as_u16());
    }

    let response = app
        .client
        .delete(app.url(&format!("/api/v1/ads/{}", ad_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());

    let response = app
        .client
        .get(app.url(&format!("/api/v1/campaigns/{}", campaign_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    let campaign: Value = response.json().await.unwrap();
    assert_eq!(campaign["metrics"]["impressions"], 200);
    assert_eq!(campaign["metrics"]["clicks"], 4);
    assert_eq!(campaign["budget"]["spent"], 5.0);
    assert_eq!(campaign["ads"], json!([]));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn liking_a_post_twice_counts_once() {
    let app = spawn_app().await;
    let token = app.access_token("insta@example.com", "insta").await;

    let response = app
        .client
        .post(app.url("/api/instagram/posts"))
        .bearer_auth(&token)
        .json(&json!({ "caption": "Hello", "media_urls": ["https://cdn.example.com/a.jpg"] }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let post: Value = response.json().await.unwrap();
    let like_url = app.url(&format!("/api/instagram/posts/{}/like", post["id"].as_str().unwrap()));

    let mut last = Value::Null;
    for _ in 0..2 {
        let response = app
            .client
            .post(&like_url)
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
        last = response.json().await.unwrap();
    }
    assert_eq!(last["liked"], true);
    assert_eq!(last["like_count"], 1);

    let response = app
        .client
        .delete(&like_url)
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["liked"], false);
    assert_eq!(body["like_count"], 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn cannot_subscribe_to_own_channel() {
    let app = spawn_app().await;
    let owner = app.access_token("tuber@example.com", "tuber").await;
    let fan = app.access_token("fan@example.com", "fan").await;

    let response = app
        .client
        .post(app.url("/api/youtube/channels"))
        .bearer_auth(&owner)
        .json(&json!({ "handle": "@tuber_tv", "name": "Tuber TV" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let channel: Value = response.json().await.unwrap();
    assert_eq!(channel["handle"], "tuber_tv");
    let subscribe_url = app.url(&format!(
        "/api/youtube/channels/{}/subscribe",
        channel["id"].as_str().unwrap()
    ));

    let response = app
        .client
        .post(&subscribe_url)
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, response.status().as_u16());

    let response = app
        .client
        .post(&subscribe_url)
        .bearer_auth(&fan)
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let response = app
        .client
        .get(app.url("/api/youtube/subscriptions"))
        .bearer_auth(&fan)
        .send()
        .await
        .expect("Failed to execute request.");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["handle"], "tuber_tv");
}
