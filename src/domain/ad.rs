use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::analytics::percentage;
use crate::error::ValidationError;
use crate::validators::{validate_optional_text, validate_optional_url, validate_text};

const MAX_NAME_LENGTH: usize = 100;
const MAX_HEADLINE_LENGTH: usize = 100;
const MAX_BODY_LENGTH: usize = 2000;
const MAX_CTA_LENGTH: usize = 30;

string_enum! {
    pub enum AdType ("ad_type") {
        Image => "image",
        Video => "video",
        Carousel => "carousel",
        Story => "story",
        Text => "text",
    }
}

string_enum! {
    pub enum AdStatus ("status") {
        Draft => "draft",
        Active => "active",
        Paused => "paused",
        Rejected => "rejected",
        Archived => "archived",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdContent {
    pub headline: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default = "default_call_to_action")]
    pub call_to_action: String,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub destination_url: Option<String>,
}

fn default_call_to_action() -> String {
    "learn_more".to_string()
}

impl AdContent {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(AdContent {
            headline: validate_text("content.headline", &self.headline, 1, MAX_HEADLINE_LENGTH)?,
            body: validate_optional_text("content.body", self.body.as_deref(), MAX_BODY_LENGTH)?,
            call_to_action: validate_text(
                "content.call_to_action",
                &self.call_to_action,
                1,
                MAX_CTA_LENGTH,
            )?,
            media_url: validate_optional_url("content.media_url", self.media_url.as_deref())?,
            destination_url: validate_optional_url(
                "content.destination_url",
                self.destination_url.as_deref(),
            )?,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct AdMetrics {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
}

/// Score in `0..=100`: `ctr% * 5 + conversion_rate% * 2`, capped and rounded
/// to two decimals.
pub fn performance_score(impressions: i64, clicks: i64, conversions: i64) -> f64 {
    let ctr = percentage(clicks as f64, impressions as f64);
    let conversion_rate = percentage(conversions as f64, clicks as f64);
    let score = (ctr * 5.0 + conversion_rate * 2.0).min(100.0);
    (score * 100.0).round() / 100.0
}

#[derive(Debug, Deserialize)]
pub struct CreateAdRequest {
    pub campaign_id: Uuid,
    pub name: String,
    pub ad_type: AdType,
    pub status: Option<AdStatus>,
    pub content: AdContent,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAdRequest {
    pub name: Option<String>,
    pub ad_type: Option<AdType>,
    pub status: Option<AdStatus>,
    pub content: Option<AdContent>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAdStatusRequest {
    pub status: AdStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdDraft {
    pub name: String,
    pub ad_type: AdType,
    pub status: AdStatus,
    pub content: AdContent,
}

impl AdDraft {
    pub fn from_request(request: CreateAdRequest) -> Result<Self, ValidationError> {
        AdDraft {
            name: request.name,
            ad_type: request.ad_type,
            status: request.status.unwrap_or(AdStatus::Draft),
            content: request.content,
        }
        .validated()
    }

    pub fn from_row(row: &AdRow) -> Result<Self, ValidationError> {
        Ok(AdDraft {
            name: row.name.clone(),
            ad_type: AdType::parse(&row.ad_type)?,
            status: AdStatus::parse(&row.status)?,
            content: row.content.0.clone(),
        })
    }

    pub fn apply(mut self, update: UpdateAdRequest) -> Result<Self, ValidationError> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(ad_type) = update.ad_type {
            self.ad_type = ad_type;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(content) = update.content {
            self.content = content;
        }
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ValidationError> {
        self.name = validate_text("name", &self.name, 1, MAX_NAME_LENGTH)?;
        self.content = self.content.validated()?;
        if matches!(self.ad_type, AdType::Image | AdType::Video | AdType::Story)
            && self.content.media_url.is_none()
        {
            return Err(ValidationError::InvalidValue(
                "content.media_url".to_string(),
                format!("is required for {} ads", self.ad_type),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AdRow {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub ad_type: String,
    pub status: String,
    pub content: Json<AdContent>,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub performance_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub ad_type: String,
    pub status: String,
    pub content: AdContent,
    pub metrics: AdMetrics,
    pub performance_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AdRow> for AdResponse {
    fn from(row: AdRow) -> Self {
        AdResponse {
            id: row.id,
            campaign_id: row.campaign_id,
            user_id: row.user_id,
            name: row.name,
            ad_type: row.ad_type,
            status: row.status,
            content: row.content.0,
            metrics: AdMetrics {
                impressions: row.impressions,
                clicks: row.clicks,
                conversions: row.conversions,
                spend: row.spend,
            },
            performance_score: row.performance_score,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdListQuery {
    pub campaign_id: Option<Uuid>,
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AdListQuery {
    pub fn status(&self) -> Result<Option<AdStatus>, ValidationError> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(AdStatus::parse)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> AdContent {
        AdContent {
            headline: "Shop the drop".to_string(),
            body: None,
            call_to_action: default_call_to_action(),
            media_url: Some("https://cdn.example.com/hero.jpg".to_string()),
            destination_url: Some("https://shop.example.com".to_string()),
        }
    }

    #[test]
    fn test_performance_score_formula() {
        // ctr 2%, conversion rate 10% -> 2*5 + 10*2
        assert_eq!(performance_score(1000, 20, 2), 30.0);
    }

    #[test]
    fn test_performance_score_is_capped() {
        assert_eq!(performance_score(100, 50, 50), 100.0);
    }

    #[test]
    fn test_performance_score_zero_denominators() {
        assert_eq!(performance_score(0, 0, 0), 0.0);
        assert_eq!(performance_score(100, 0, 0), 0.0);
    }

    #[test]
    fn test_performance_score_rounds_to_two_decimals() {
        // ctr = 1/3 % -> 1.6666.. points
        assert_eq!(performance_score(300, 1, 0), 1.67);
    }

    #[test]
    fn test_status_values() {
        assert_eq!(AdStatus::parse("paused").unwrap(), AdStatus::Paused);
        assert!(AdStatus::parse("deleted").is_err());
        assert!(serde_json::from_str::<UpdateAdStatusRequest>(r#"{"status":"live"}"#).is_err());
    }

    #[test]
    fn test_urls_must_be_http() {
        let mut c = content();
        c.destination_url = Some("javascript:alert(1)".to_string());
        assert!(c.validated().is_err());
    }

    #[test]
    fn test_media_required_for_visual_ads() {
        let mut c = content();
        c.media_url = None;
        let draft = AdDraft {
            name: "Hero".to_string(),
            ad_type: AdType::Image,
            status: AdStatus::Draft,
            content: c.clone(),
        };
        assert!(draft.validated().is_err());

        let text = AdDraft {
            name: "Hero".to_string(),
            ad_type: AdType::Text,
            status: AdStatus::Draft,
            content: c,
        };
        assert!(text.validated().is_ok());
    }

    #[test]
    fn test_headline_length() {
        let mut c = content();
        c.headline = "x".repeat(101);
        assert!(c.validated().is_err());
    }
}
