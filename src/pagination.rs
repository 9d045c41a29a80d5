//! Page/limit pagination for list endpoints

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Validated pagination parameters (1-indexed page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Missing values fall back to page 1 / limit 10; out-of-range values are
    /// rejected rather than clamped.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 {
            return Err(ValidationError::InvalidValue(
                "page".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::InvalidValue(
                "limit".to_string(),
                format!("must be between 1 and {}", MAX_LIMIT),
            ));
        }

        Ok(Self { page, limit })
    }

    /// Offset for SQL queries
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Limit for SQL queries
    pub fn limit(&self) -> i64 {
        self.limit as i64
    }
}

/// Query-string form accepted by list endpoints without other filters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn pagination(&self) -> Result<Pagination, ValidationError> {
        Pagination::new(self.page, self.limit)
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total: i64) -> Self {
        let limit = pagination.limit as i64;
        let total_pages = if total <= 0 {
            0
        } else {
            (total + limit - 1) / limit
        };

        Self {
            data,
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages,
        }
    }
}
