use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validators::{
    is_valid_handle, is_valid_url, non_negative, validate_optional_text, validate_optional_url,
    validate_text,
};

const MAX_CHANNEL_NAME_LENGTH: usize = 100;
const MAX_CHANNEL_DESCRIPTION_LENGTH: usize = 1000;
const MAX_TITLE_LENGTH: usize = 100;
const MAX_VIDEO_DESCRIPTION_LENGTH: usize = 5000;
const MAX_TAGS: usize = 15;
const MAX_TAG_LENGTH: usize = 30;
const MAX_COMMENT_LENGTH: usize = 10_000;

string_enum! {
    pub enum Visibility ("visibility") {
        Public => "public",
        Unlisted => "unlisted",
        Private => "private",
    }
}

// Channels

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

impl TryFrom<CreateChannelRequest> for NewChannel {
    type Error = ValidationError;

    fn try_from(request: CreateChannelRequest) -> Result<Self, Self::Error> {
        Ok(NewChannel {
            handle: is_valid_handle(&request.handle)?,
            name: validate_text("name", &request.name, 1, MAX_CHANNEL_NAME_LENGTH)?,
            description: validate_optional_text(
                "description",
                request.description.as_deref(),
                MAX_CHANNEL_DESCRIPTION_LENGTH,
            )?,
            avatar_url: validate_optional_url("avatar_url", request.avatar_url.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChannelView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub subscriber_count: i64,
    pub video_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubscriptionView {
    pub channel_id: Uuid,
    pub handle: String,
    pub name: String,
    pub subscribed_at: DateTime<Utc>,
}

// Videos

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub channel_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: i32,
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateVideoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoDraft {
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i32,
    pub visibility: Visibility,
    pub tags: Vec<String>,
}

impl VideoDraft {
    pub fn from_request(request: CreateVideoRequest) -> Result<Self, ValidationError> {
        VideoDraft {
            title: request.title,
            description: request.description,
            video_url: request.video_url,
            thumbnail_url: request.thumbnail_url,
            duration_seconds: request.duration_seconds,
            visibility: request.visibility.unwrap_or(Visibility::Public),
            tags: request.tags,
        }
        .validated()
    }

    pub fn from_view(view: &VideoView) -> Result<Self, ValidationError> {
        Ok(VideoDraft {
            title: view.title.clone(),
            description: view.description.clone(),
            video_url: view.video_url.clone(),
            thumbnail_url: view.thumbnail_url.clone(),
            duration_seconds: view.duration_seconds,
            visibility: Visibility::parse(&view.visibility)?,
            tags: view.tags.clone(),
        })
    }

    pub fn apply(mut self, update: UpdateVideoRequest) -> Result<Self, ValidationError> {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(thumbnail_url) = update.thumbnail_url {
            self.thumbnail_url = Some(thumbnail_url);
        }
        if let Some(visibility) = update.visibility {
            self.visibility = visibility;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        self.validated()
    }

    fn validated(self) -> Result<Self, ValidationError> {
        Ok(VideoDraft {
            title: validate_text("title", &self.title, 1, MAX_TITLE_LENGTH)?,
            description: validate_optional_text(
                "description",
                self.description.as_deref(),
                MAX_VIDEO_DESCRIPTION_LENGTH,
            )?,
            video_url: is_valid_url("video_url", &self.video_url)?,
            thumbnail_url: validate_optional_url("thumbnail_url", self.thumbnail_url.as_deref())?,
            duration_seconds: non_negative("duration_seconds", self.duration_seconds)?,
            visibility: self.visibility,
            tags: normalize_tags(self.tags)?,
        })
    }
}

/// Trims, lowercases and de-duplicates tags.
fn normalize_tags(tags: Vec<String>) -> Result<Vec<String>, ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::InvalidValue(
            "tags".to_string(),
            format!("must have at most {} entries", MAX_TAGS),
        ));
    }
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = validate_text("tags", &tag, 1, MAX_TAG_LENGTH)?.to_lowercase();
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VideoView {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub channel_handle: String,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i32,
    pub visibility: String,
    pub tags: Vec<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoView {
    /// Private videos are only visible to the channel owner.
    pub fn visible_to(&self, user_id: Uuid) -> bool {
        self.visibility != Visibility::Private.as_str() || self.owner_id == user_id
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl VideoListQuery {
    pub fn search(&self) -> Result<Option<String>, ValidationError> {
        validate_optional_text("search", self.search.as_deref(), MAX_TITLE_LENGTH)
    }
}

// Comments

#[derive(Debug, Deserialize)]
pub struct VideoCommentRequest {
    pub text: String,
}

impl VideoCommentRequest {
    pub fn text(&self) -> Result<String, ValidationError> {
        validate_text("text", &self.text, 1, MAX_COMMENT_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VideoCommentView {
    pub id: Uuid,
    pub video_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_request() -> CreateVideoRequest {
        CreateVideoRequest {
            channel_id: Uuid::new_v4(),
            title: "  Rust in 10 minutes ".into(),
            description: None,
            video_url: "https://videos.example.com/rust.mp4".into(),
            thumbnail_url: None,
            duration_seconds: 600,
            visibility: None,
            tags: vec!["Rust".into(), "rust".into(), " tutorial ".into()],
        }
    }

    #[test]
    fn test_channel_handle_is_normalized() {
        let channel = NewChannel::try_from(CreateChannelRequest {
            handle: "@Rust_Daily".into(),
            name: "Rust Daily".into(),
            description: None,
            avatar_url: None,
        })
        .unwrap();
        assert_eq!(channel.handle, "rust_daily");
    }

    #[test]
    fn test_channel_handle_rules() {
        let result = NewChannel::try_from(CreateChannelRequest {
            handle: "x".into(),
            name: "Short".into(),
            description: None,
            avatar_url: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_video_defaults_and_tags() {
        let draft = VideoDraft::from_request(video_request()).unwrap();
        assert_eq!(draft.title, "Rust in 10 minutes");
        assert_eq!(draft.visibility, Visibility::Public);
        assert_eq!(draft.tags, vec!["rust", "tutorial"]);
    }

    #[test]
    fn test_too_many_tags() {
        let mut request = video_request();
        request.tags = (0..16).map(|i| format!("tag{}", i)).collect();
        assert!(VideoDraft::from_request(request).is_err());
    }

    #[test]
    fn test_title_bounds() {
        let mut request = video_request();
        request.title = "t".repeat(101);
        assert!(VideoDraft::from_request(request).is_err());
    }

    #[test]
    fn test_visibility_enum() {
        assert_eq!(Visibility::parse("Unlisted").unwrap(), Visibility::Unlisted);
        assert!(Visibility::parse("friends").is_err());
    }

    #[test]
    fn test_update_keeps_untouched_fields() {
        let draft = VideoDraft::from_request(video_request()).unwrap();
        let updated = draft
            .clone()
            .apply(UpdateVideoRequest {
                visibility: Some(Visibility::Private),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.visibility, Visibility::Private);
        assert_eq!(updated.title, draft.title);
        assert_eq!(updated.tags, draft.tags);
    }

    #[test]
    fn test_comment_bounds() {
        assert!(VideoCommentRequest { text: "".into() }.text().is_err());
        assert!(VideoCommentRequest { text: "x".repeat(10_001) }.text().is_err());
        assert!(VideoCommentRequest { text: "x".repeat(10_000) }.text().is_ok());
    }
}
