use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validators::{non_negative, validate_optional_text, validate_text};

const MAX_NAME_LENGTH: usize = 100;
const MAX_DESCRIPTION_LENGTH: usize = 500;
const MIN_AGE: u8 = 13;
const MAX_AGE: u8 = 65;
const MAX_TARGETING_ENTRIES: usize = 50;
const MAX_TARGETING_ENTRY_LENGTH: usize = 60;

string_enum! {
    pub enum Platform ("platform") {
        Facebook => "facebook",
        Instagram => "instagram",
        Google => "google",
        TikTok => "tiktok",
        Twitter => "twitter",
        LinkedIn => "linkedin",
        YouTube => "youtube",
    }
}

string_enum! {
    pub enum Objective ("objective") {
        Awareness => "awareness",
        Traffic => "traffic",
        Engagement => "engagement",
        Leads => "leads",
        Sales => "sales",
        AppPromotion => "app_promotion",
    }
}

string_enum! {
    pub enum CampaignStatus ("status") {
        Draft => "draft",
        Active => "active",
        Paused => "paused",
        Completed => "completed",
        Archived => "archived",
    }
}

string_enum! {
    pub enum Gender ("gender") {
        All => "all",
        Male => "male",
        Female => "female",
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub total: f64,
    pub daily: f64,
    #[serde(default)]
    pub spent: f64,
}

impl Budget {
    fn validate(&self) -> Result<(), ValidationError> {
        non_negative("budget.total", self.total)?;
        non_negative("budget.daily", self.daily)?;
        non_negative("budget.spent", self.spent)?;
        if !self.total.is_finite() || !self.daily.is_finite() {
            return Err(ValidationError::InvalidValue(
                "budget".to_string(),
                "must be a finite number".to_string(),
            ));
        }
        if self.daily > self.total {
            return Err(ValidationError::InvalidValue(
                "budget.daily".to_string(),
                "must not exceed budget.total".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Targeting {
    #[serde(default = "default_age_min")]
    pub age_min: u8,
    #[serde(default = "default_age_max")]
    pub age_max: u8,
    #[serde(default = "default_genders")]
    pub genders: Vec<Gender>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

fn default_age_min() -> u8 {
    18
}

fn default_age_max() -> u8 {
    MAX_AGE
}

fn default_genders() -> Vec<Gender> {
    vec![Gender::All]
}

impl Default for Targeting {
    fn default() -> Self {
        Self {
            age_min: default_age_min(),
            age_max: default_age_max(),
            genders: default_genders(),
            locations: Vec::new(),
            interests: Vec::new(),
        }
    }
}

impl Targeting {
    fn normalized(mut self) -> Result<Self, ValidationError> {
        if self.age_min < MIN_AGE || self.age_max > MAX_AGE || self.age_min > self.age_max {
            return Err(ValidationError::InvalidValue(
                "targeting.age".to_string(),
                format!(
                    "must satisfy {} <= age_min <= age_max <= {}",
                    MIN_AGE, MAX_AGE
                ),
            ));
        }
        if self.genders.is_empty() {
            self.genders = default_genders();
        }
        let mut genders: Vec<Gender> = Vec::with_capacity(self.genders.len());
        for gender in self.genders {
            if !genders.contains(&gender) {
                genders.push(gender);
            }
        }
        self.genders = genders;
        self.locations = normalize_list("targeting.locations", self.locations)?;
        self.interests = normalize_list("targeting.interests", self.interests)?;
        Ok(self)
    }
}

fn normalize_list(field: &str, values: Vec<String>) -> Result<Vec<String>, ValidationError> {
    if values.len() > MAX_TARGETING_ENTRIES {
        return Err(ValidationError::InvalidValue(
            field.to_string(),
            format!("must have at most {} entries", MAX_TARGETING_ENTRIES),
        ));
    }
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = validate_text(field, &value, 1, MAX_TARGETING_ENTRY_LENGTH)?;
        if !out.iter().any(|existing| existing.eq_ignore_ascii_case(&value)) {
            out.push(value);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl Schedule {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(ValidationError::InvalidValue(
                    "schedule.end_date".to_string(),
                    "must be after schedule.start_date".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct CampaignMetrics {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub reach: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    pub platform: Platform,
    pub objective: Option<Objective>,
    pub status: Option<CampaignStatus>,
    pub budget: Budget,
    pub targeting: Option<Targeting>,
    pub schedule: Option<Schedule>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    /// An empty string clears the description
    pub description: Option<String>,
    pub platform: Option<Platform>,
    pub objective: Option<Objective>,
    pub status: Option<CampaignStatus>,
    pub budget: Option<BudgetUpdate>,
    pub targeting: Option<Targeting>,
    pub schedule: Option<Schedule>,
}

/// `spent` is driven by analytics and cannot be set directly.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BudgetUpdate {
    pub total: Option<f64>,
    pub daily: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CampaignStatus,
}

/// A fully validated campaign, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignDraft {
    pub name: String,
    pub description: Option<String>,
    pub platform: Platform,
    pub objective: Objective,
    pub status: CampaignStatus,
    pub budget: Budget,
    pub targeting: Targeting,
    pub schedule: Schedule,
}

impl CampaignDraft {
    pub fn from_request(
        request: CreateCampaignRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let draft = CampaignDraft {
            name: request.name,
            description: request.description,
            platform: request.platform,
            objective: request.objective.unwrap_or(Objective::Awareness),
            status: request.status.unwrap_or(CampaignStatus::Draft),
            budget: Budget {
                spent: 0.0,
                ..request.budget
            },
            targeting: request.targeting.unwrap_or_default(),
            schedule: request.schedule.unwrap_or(Schedule {
                start_date: now,
                end_date: None,
            }),
        };
        draft.validated()
    }

    pub fn from_row(row: &CampaignRow) -> Result<Self, ValidationError> {
        Ok(CampaignDraft {
            name: row.name.clone(),
            description: row.description.clone(),
            platform: Platform::parse(&row.platform)?,
            objective: Objective::parse(&row.objective)?,
            status: CampaignStatus::parse(&row.status)?,
            budget: Budget {
                total: row.budget_total,
                daily: row.budget_daily,
                spent: row.budget_spent,
            },
            targeting: row.targeting.0.clone(),
            schedule: Schedule {
                start_date: row.start_date,
                end_date: row.end_date,
            },
        })
    }

    /// Applies a partial update and re-checks every invariant.
    pub fn apply(mut self, update: UpdateCampaignRequest) -> Result<Self, ValidationError> {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(platform) = update.platform {
            self.platform = platform;
        }
        if let Some(objective) = update.objective {
            self.objective = objective;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(budget) = update.budget {
            self.budget.total = budget.total.unwrap_or(self.budget.total);
            self.budget.daily = budget.daily.unwrap_or(self.budget.daily);
        }
        if let Some(targeting) = update.targeting {
            self.targeting = targeting;
        }
        if let Some(schedule) = update.schedule {
            self.schedule = schedule;
        }
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ValidationError> {
        self.name = validate_text("name", &self.name, 1, MAX_NAME_LENGTH)?;
        self.description = validate_optional_text(
            "description",
            self.description.as_deref(),
            MAX_DESCRIPTION_LENGTH,
        )?;
        self.budget.validate()?;
        self.targeting = self.targeting.normalized()?;
        self.schedule.validate()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub platform: String,
    pub objective: String,
    pub status: String,
    pub budget_total: f64,
    pub budget_daily: f64,
    pub budget_spent: f64,
    pub targeting: Json<Targeting>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub reach: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub platform: String,
    pub objective: String,
    pub status: String,
    pub budget: Budget,
    pub targeting: Targeting,
    pub schedule: Schedule,
    pub metrics: CampaignMetrics,
    pub ads: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignRow {
    pub fn into_response(self, ads: Vec<Uuid>) -> CampaignResponse {
        CampaignResponse {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            platform: self.platform,
            objective: self.objective,
            status: self.status,
            budget: Budget {
                total: self.budget_total,
                daily: self.budget_daily,
                spent: self.budget_spent,
            },
            targeting: self.targeting.0,
            schedule: Schedule {
                start_date: self.start_date,
                end_date: self.end_date,
            },
            metrics: CampaignMetrics {
                impressions: self.impressions,
                clicks: self.clicks,
                conversions: self.conversions,
                reach: self.reach,
            },
            ads,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignListQuery {
    pub status: Option<String>,
    pub platform: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub platform: Option<Platform>,
    pub search: Option<String>,
    pub sort: CampaignSort,
}

impl CampaignFilter {
    pub fn from_query(query: &CampaignListQuery) -> Result<Self, ValidationError> {
        let status = non_blank(query.status.as_deref())
            .map(CampaignStatus::parse)
            .transpose()?;
        let platform = non_blank(query.platform.as_deref())
            .map(Platform::parse)
            .transpose()?;
        let search = validate_optional_text("search", query.search.as_deref(), MAX_NAME_LENGTH)?;
        let sort = CampaignSort::parse(query.sort.as_deref())?;

        Ok(Self {
            status,
            platform,
            search,
            sort,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Whitelisted ORDER BY clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignSort {
    CreatedAt { descending: bool },
    Name { descending: bool },
    Budget { descending: bool },
}

impl CampaignSort {
    pub fn parse(raw: Option<&str>) -> Result<Self, ValidationError> {
        let raw = match non_blank(raw) {
            None => return Ok(CampaignSort::CreatedAt { descending: true }),
            Some(raw) => raw,
        };
        let (descending, column) = match raw.strip_prefix('-') {
            Some(column) => (true, column),
            None => (false, raw),
        };
        match column {
            "created_at" => Ok(CampaignSort::CreatedAt { descending }),
            "name" => Ok(CampaignSort::Name { descending }),
            "budget" => Ok(CampaignSort::Budget { descending }),
            _ => Err(ValidationError::InvalidValue(
                "sort".to_string(),
                "must be one of: created_at, name, budget (prefix with - for descending)"
                    .to_string(),
            )),
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            CampaignSort::CreatedAt { descending: true } => "created_at DESC, id DESC",
            CampaignSort::CreatedAt { descending: false } => "created_at ASC, id ASC",
            CampaignSort::Name { descending: true } => "LOWER(name) DESC, id DESC",
            CampaignSort::Name { descending: false } => "LOWER(name) ASC, id ASC",
            CampaignSort::Budget { descending: true } => "budget_total DESC, id DESC",
            CampaignSort::Budget { descending: false } => "budget_total ASC, id ASC",
        }
    }
}

/// Per-user campaign totals; every status is present, zero-filled.
#[derive(Debug, Serialize, PartialEq)]
pub struct CampaignStats {
    pub total_campaigns: i64,
    pub by_status: BTreeMap<String, i64>,
    pub total_budget: f64,
    pub total_spent: f64,
}

impl CampaignStats {
    pub fn from_rows(rows: Vec<(String, i64, f64, f64)>) -> Self {
        let mut by_status: BTreeMap<String, i64> = CampaignStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut stats = CampaignStats {
            total_campaigns: 0,
            by_status: BTreeMap::new(),
            total_budget: 0.0,
            total_spent: 0.0,
        };
        for (status, count, budget, spent) in rows {
            stats.total_campaigns += count;
            stats.total_budget += budget;
            stats.total_spent += spent;
            *by_status.entry(status).or_insert(0) += count;
        }
        stats.by_status = by_status;
        stats
    }
}
