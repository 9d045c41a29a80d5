use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validators::{
    is_valid_url, non_negative, validate_optional_text, validate_optional_url, validate_text,
};

const MAX_CAPTION_LENGTH: usize = 2200;
const MAX_COMMENT_LENGTH: usize = 2200;
const MAX_MEDIA_ITEMS: usize = 10;
const MAX_LOCATION_LENGTH: usize = 100;
const MAX_AD_TITLE_LENGTH: usize = 100;
const MAX_AD_DESCRIPTION_LENGTH: usize = 1000;
const MAX_METADATA_BYTES: usize = 4096;

pub const STORY_LIFETIME_HOURS: i64 = 24;

string_enum! {
    pub enum PostKind ("kind") {
        Post => "post",
        Reel => "reel",
    }
}

string_enum! {
    pub enum MediaType ("media_type") {
        Image => "image",
        Video => "video",
    }
}

string_enum! {
    pub enum EventType ("event_type") {
        View => "view",
        Like => "like",
        Comment => "comment",
        Share => "share",
        Save => "save",
        Click => "click",
    }
}

// Posts and reels

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub caption: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReelRequest {
    pub caption: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub audio_name: Option<String>,
}

/// Validated post or reel, ready for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub kind: PostKind,
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub audio_name: Option<String>,
    pub location: Option<String>,
}

impl TryFrom<CreatePostRequest> for NewPost {
    type Error = ValidationError;

    fn try_from(request: CreatePostRequest) -> Result<Self, Self::Error> {
        if request.media_urls.is_empty() {
            return Err(ValidationError::EmptyField("media_urls".to_string()));
        }
        if request.media_urls.len() > MAX_MEDIA_ITEMS {
            return Err(ValidationError::InvalidValue(
                "media_urls".to_string(),
                format!("must have at most {} entries", MAX_MEDIA_ITEMS),
            ));
        }
        let media_urls = request
            .media_urls
            .iter()
            .map(|url| is_valid_url("media_urls", url))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewPost {
            kind: PostKind::Post,
            caption: validate_optional_text("caption", request.caption.as_deref(), MAX_CAPTION_LENGTH)?,
            media_urls,
            video_url: None,
            thumbnail_url: None,
            audio_name: None,
            location: validate_optional_text(
                "location",
                request.location.as_deref(),
                MAX_LOCATION_LENGTH,
            )?,
        })
    }
}

impl TryFrom<CreateReelRequest> for NewPost {
    type Error = ValidationError;

    fn try_from(request: CreateReelRequest) -> Result<Self, Self::Error> {
        Ok(NewPost {
            kind: PostKind::Reel,
            caption: validate_optional_text("caption", request.caption.as_deref(), MAX_CAPTION_LENGTH)?,
            media_urls: Vec::new(),
            video_url: Some(is_valid_url("video_url", &request.video_url)?),
            thumbnail_url: validate_optional_url("thumbnail_url", request.thumbnail_url.as_deref())?,
            audio_name: validate_optional_text("audio_name", request.audio_name.as_deref(), 100)?,
            location: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCaptionRequest {
    pub caption: Option<String>,
}

impl UpdateCaptionRequest {
    pub fn caption(&self) -> Result<Option<String>, ValidationError> {
        validate_optional_text("caption", self.caption.as_deref(), MAX_CAPTION_LENGTH)
    }
}

/// Post joined with its author and engagement counters.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub kind: String,
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub audio_name: Option<String>,
    pub location: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub author_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

impl CommentRequest {
    pub fn text(&self) -> Result<String, ValidationError> {
        validate_text("text", &self.text, 1, MAX_COMMENT_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostCommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// Stories

#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    pub media_url: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStory {
    pub media_url: String,
    pub media_type: MediaType,
    pub caption: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl NewStory {
    pub fn from_request(
        request: CreateStoryRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        Ok(NewStory {
            media_url: is_valid_url("media_url", &request.media_url)?,
            media_type: request.media_type,
            caption: validate_optional_text("caption", request.caption.as_deref(), 200)?,
            expires_at: now + Duration::hours(STORY_LIFETIME_HOURS),
        })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StoryView {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub media_url: String,
    pub media_type: String,
    pub caption: Option<String>,
    pub view_count: i64,
    pub viewed_by_me: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// Advertisements

#[derive(Debug, Deserialize)]
pub struct CreateAdvertisementRequest {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub target_url: String,
    #[serde(default)]
    pub budget: f64,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAdvertisementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub target_url: Option<String>,
    pub budget: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisementDraft {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub target_url: String,
    pub budget: f64,
    pub is_active: bool,
}

impl AdvertisementDraft {
    pub fn from_request(request: CreateAdvertisementRequest) -> Result<Self, ValidationError> {
        AdvertisementDraft {
            title: request.title,
            description: request.description,
            image_url: request.image_url,
            target_url: request.target_url,
            budget: request.budget,
            is_active: request.is_active.unwrap_or(true),
        }
        .validated()
    }

    pub fn from_row(row: &AdvertisementRow) -> Self {
        AdvertisementDraft {
            title: row.title.clone(),
            description: row.description.clone(),
            image_url: row.image_url.clone(),
            target_url: row.target_url.clone(),
            budget: row.budget,
            is_active: row.is_active,
        }
    }

    pub fn apply(mut self, update: UpdateAdvertisementRequest) -> Result<Self, ValidationError> {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(image_url) = update.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(target_url) = update.target_url {
            self.target_url = target_url;
        }
        if let Some(budget) = update.budget {
            self.budget = budget;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.validated()
    }

    fn validated(self) -> Result<Self, ValidationError> {
        let budget = non_negative("budget", self.budget)?;
        if !budget.is_finite() {
            return Err(ValidationError::InvalidValue(
                "budget".to_string(),
                "must be a finite number".to_string(),
            ));
        }
        Ok(AdvertisementDraft {
            title: validate_text("title", &self.title, 1, MAX_AD_TITLE_LENGTH)?,
            description: validate_optional_text(
                "description",
                self.description.as_deref(),
                MAX_AD_DESCRIPTION_LENGTH,
            )?,
            image_url: validate_optional_url("image_url", self.image_url.as_deref())?,
            target_url: is_valid_url("target_url", &self.target_url)?,
            budget,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdvertisementRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub target_url: String,
    pub budget: f64,
    pub impressions: i64,
    pub clicks: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Analytics events

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub post_id: Uuid,
    pub event_type: EventType,
    pub metadata: Option<serde_json::Value>,
}

impl CreateEventRequest {
    /// Metadata must be a small JSON object; absent metadata is stored as `{}`.
    pub fn metadata(&self) -> Result<serde_json::Value, ValidationError> {
        match &self.metadata {
            None | Some(serde_json::Value::Null) => Ok(serde_json::json!({})),
            Some(value @ serde_json::Value::Object(_)) => {
                if value.to_string().len() > MAX_METADATA_BYTES {
                    return Err(ValidationError::TooLong("metadata".to_string(), MAX_METADATA_BYTES));
                }
                Ok(value.clone())
            }
            Some(_) => Err(ValidationError::InvalidValue(
                "metadata".to_string(),
                "must be a JSON object".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalyticsEventRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Event counts keyed by event type, with every type present.
pub fn count_by_event_type(rows: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = EventType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    for (event_type, count) in rows {
        *counts.entry(event_type).or_insert(0) += count;
    }
    counts
}

#[derive(Debug, Serialize)]
pub struct EventCounts {
    pub total: i64,
    pub by_type: BTreeMap<String, i64>,
}

impl EventCounts {
    pub fn from_rows(rows: Vec<(String, i64)>) -> Self {
        let by_type = count_by_event_type(rows);
        EventCounts {
            total: by_type.values().sum(),
            by_type,
        }
    }
}
