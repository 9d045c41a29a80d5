mod common;

use common::{spawn_app, TestApp};
use serde_json::{json, Value};

async fn create_reel(app: &TestApp, token: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/instagram/reels"))
        .bearer_auth(token)
        .json(&json!({ "caption": "Loved it; create more like this!", "video_url": "https://cdn.example.com/r.mp4" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn create_post(app: &TestApp, token: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/instagram/posts"))
        .bearer_auth(token)
        .json(&json!({ "caption": "Morning run", "media_urls": ["https://cdn.example.com/p.jpg"] }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn create_channel(app: &TestApp, token: &str, handle: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/youtube/channels"))
        .bearer_auth(token)
        .json(&json!({ "handle": handle, "name": "Channel" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    response.json().await.expect("Failed to parse response")
}

async fn upload_video(app: &TestApp, token: &str, channel_id: &str, visibility: &str) -> reqwest::Response {
    app.client
        .post(app.url("/api/youtube/videos"))
        .bearer_auth(token)
        .json(&json!({
            "channel_id": channel_id,
            "title": "Union select: a cover band story",
            "video_url": "https://cdn.example.com/v.mp4",
            "duration_seconds": 95,
            "visibility": visibility,
            "tags": ["music"]
        }))
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn reel_is_not_reachable_through_posts() {
    let app = spawn_app().await;
    let token = app.access_token("reeler@example.com", "reeler").await;
    let reel = create_reel(&app, &token).await;
    let reel_id = reel["id"].as_str().unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/api/instagram/posts/{}", reel_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());

    for path in ["like", "comments"] {
        let response = app
            .client
            .post(app.url(&format!("/api/instagram/posts/{}/{}", reel_id, path)))
            .bearer_auth(&token)
            .json(&json!({ "text": "wrong door" }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(404, response.status().as_u16(), "path: {}", path);
    }

    let response = app
        .client
        .get(app.url(&format!("/api/instagram/reels/{}", reel_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["like_count"], 0);
    assert_eq!(body["comment_count"], 0);

    let response = app
        .client
        .delete(app.url(&format!("/api/instagram/reels/{}", reel_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn fetching_a_reel_counts_a_view() {
    let app = spawn_app().await;
    let token = app.access_token("viewer@example.com", "viewer").await;
    let reel = create_reel(&app, &token).await;
    assert_eq!(reel["view_count"], 0);
    let url = app.url(&format!("/api/instagram/reels/{}", reel["id"].as_str().unwrap()));

    let mut last = Value::Null;
    for _ in 0..2 {
        let response = app
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
        last = response.json().await.unwrap();
    }

    assert_eq!(last["view_count"], 2);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn expired_story_is_not_found() {
    let app = spawn_app().await;
    let token = app.access_token("storyteller@example.com", "storyteller").await;

    let response = app
        .client
        .post(app.url("/api/instagram/stories"))
        .bearer_auth(&token)
        .json(&json!({ "media_url": "https://cdn.example.com/s.jpg", "media_type": "image" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let story: Value = response.json().await.unwrap();
    let story_id = story["id"].as_str().unwrap();
    let url = app.url(&format!("/api/instagram/stories/{}", story_id));

    let response = app.client.get(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(200, response.status().as_u16());

    sqlx::query("UPDATE stories SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(uuid::Uuid::parse_str(story_id).unwrap())
        .execute(&app.db_pool)
        .await
        .expect("Failed to expire story");

    let response = app.client.get(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(404, response.status().as_u16());

    let response = app
        .client
        .get(app.url("/api/instagram/stories"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    let list: Value = response.json().await.unwrap();
    assert_eq!(list["total"], 0);
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn private_video_is_hidden_from_other_users() {
    let app = spawn_app().await;
    let owner = app.access_token("studio@example.com", "studio").await;
    let stranger = app.access_token("stranger@example.com", "stranger").await;
    let channel = create_channel(&app, &owner, "studio_private").await;
    let channel_id = channel["id"].as_str().unwrap();

    let response = upload_video(&app, &owner, channel_id, "private").await;
    assert_eq!(201, response.status().as_u16());
    let video: Value = response.json().await.unwrap();
    let url = app.url(&format!("/api/youtube/videos/{}", video["id"].as_str().unwrap()));

    let response = app.client.get(&url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(200, response.status().as_u16());

    let response = app.client.get(&url).bearer_auth(&stranger).send().await.unwrap();
    assert_eq!(404, response.status().as_u16());

    let response = app
        .client
        .get(app.url(&format!("/api/youtube/channels/{}", channel_id)))
        .bearer_auth(&stranger)
        .send()
        .await
        .expect("Failed to execute request.");
    let channel: Value = response.json().await.unwrap();
    assert_eq!(channel["video_count"], 0);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn non_owner_gets_403_on_channel_and_video_mutations() {
    let app = spawn_app().await;
    let owner = app.access_token("maker@example.com", "maker").await;
    let intruder = app.access_token("intruder@example.com", "intruder").await;
    let channel = create_channel(&app, &owner, "maker_tv").await;
    let channel_id = channel["id"].as_str().unwrap();

    let response = upload_video(&app, &intruder, channel_id, "public").await;
    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");

    let response = upload_video(&app, &owner, channel_id, "public").await;
    assert_eq!(201, response.status().as_u16());
    let video: Value = response.json().await.unwrap();
    let url = app.url(&format!("/api/youtube/videos/{}", video["id"].as_str().unwrap()));

    let response = app
        .client
        .put(&url)
        .bearer_auth(&intruder)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());

    let response = app.client.delete(&url).bearer_auth(&intruder).send().await.unwrap();
    assert_eq!(403, response.status().as_u16());

    let response = app.client.delete(&url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn advertisement_counters_and_ownership() {
    let app = spawn_app().await;
    let owner = app.access_token("brand@example.com", "brand").await;
    let other = app.access_token("rival@example.com", "rival").await;

    let response = app
        .client
        .post(app.url("/api/instagram/advertisements"))
        .bearer_auth(&owner)
        .json(&json!({ "title": "Spring sale", "target_url": "https://shop.example.com", "budget": 300.0 }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());
    let ad: Value = response.json().await.unwrap();
    let url = app.url(&format!("/api/instagram/advertisements/{}", ad["id"].as_str().unwrap()));

    for counter in ["impression", "impression", "click"] {
        let response = app
            .client
            .post(format!("{}/{}", url, counter))
            .bearer_auth(&other)
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(200, response.status().as_u16());
    }

    let response = app.client.get(&url).bearer_auth(&other).send().await.unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["impressions"], 2);
    assert_eq!(body["clicks"], 1);

    let response = app
        .client
        .put(&url)
        .bearer_auth(&other)
        .json(&json!({ "title": "Not yours" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(403, response.status().as_u16());

    let response = app.client.delete(&url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(204, response.status().as_u16());

    let response = app.client.get(&url).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn analytics_events_are_counted_per_type() {
    let app = spawn_app().await;
    let token = app.access_token("events@example.com", "events").await;
    let post = create_post(&app, &token).await;
    let post_id = post["id"].as_str().unwrap();

    for event_type in ["view", "view", "share"] {
        let response = app
            .client
            .post(app.url("/api/instagram/analytics/events"))
            .bearer_auth(&token)
            .json(&json!({ "post_id": post_id, "event_type": event_type, "metadata": {"source": "feed"} }))
            .send()
            .await
            .expect("Failed to execute request.");
        assert_eq!(201, response.status().as_u16());
    }

    let response = app
        .client
        .post(app.url("/api/instagram/analytics/events"))
        .bearer_auth(&token)
        .json(&json!({ "post_id": post_id, "event_type": "teleport" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(400, response.status().as_u16());

    let response = app
        .client
        .post(app.url("/api/instagram/analytics/events"))
        .bearer_auth(&token)
        .json(&json!({ "post_id": uuid::Uuid::new_v4(), "event_type": "view" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(404, response.status().as_u16());

    let response = app
        .client
        .get(app.url(&format!("/api/instagram/analytics/posts/{}", post_id)))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());
    let counts: Value = response.json().await.unwrap();
    assert_eq!(counts["total"], 3);
    assert_eq!(counts["by_type"]["view"], 2);
    assert_eq!(counts["by_type"]["share"], 1);
    assert_eq!(counts["by_type"]["save"], 0);

    let response = app
        .client
        .get(app.url("/api/instagram/analytics/summary"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");
    let summary: Value = response.json().await.unwrap();
    assert_eq!(summary["total"], 3);
}
