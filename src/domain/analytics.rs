use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::validators::non_negative;

/// `numerator / denominator * 100`, or 0 when the denominator is 0.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    ratio(numerator, denominator) * 100.0
}

pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Deserialize)]
pub struct RecordAnalyticsRequest {
    pub campaign_id: Uuid,
    pub ad_id: Option<Uuid>,
    pub date: NaiveDate,
    #[serde(default)]
    pub impressions: i64,
    #[serde(default)]
    pub clicks: i64,
    #[serde(default)]
    pub conversions: i64,
    #[serde(default)]
    pub reach: i64,
    #[serde(default)]
    pub spend: f64,
    #[serde(default)]
    pub revenue: f64,
}

impl RecordAnalyticsRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("impressions", self.impressions)?;
        non_negative("clicks", self.clicks)?;
        non_negative("conversions", self.conversions)?;
        non_negative("reach", self.reach)?;
        non_negative("spend", self.spend)?;
        non_negative("revenue", self.revenue)?;
        if !self.spend.is_finite() || !self.revenue.is_finite() {
            return Err(ValidationError::InvalidValue(
                "spend".to_string(),
                "must be a finite number".to_string(),
            ));
        }
        if self.clicks > self.impressions {
            return Err(ValidationError::InvalidValue(
                "clicks".to_string(),
                "must not exceed impressions".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stored per-day row for a campaign (and optionally one ad).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalyticsRow {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub ad_id: Option<Uuid>,
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub reach: i64,
    pub spend: f64,
    pub revenue: f64,
}

/// Sums as returned by a GROUP BY / SUM query.
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct MetricSums {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct AnalyticsTotals {
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub revenue: f64,
    /// Percent
    pub ctr: f64,
    pub cpc: f64,
    /// Percent
    pub conversion_rate: f64,
    pub roas: f64,
}

impl From<MetricSums> for AnalyticsTotals {
    fn from(sums: MetricSums) -> Self {
        AnalyticsTotals {
            impressions: sums.impressions,
            clicks: sums.clicks,
            conversions: sums.conversions,
            spend: round2(sums.spend),
            revenue: round2(sums.revenue),
            ctr: round2(percentage(sums.clicks as f64, sums.impressions as f64)),
            cpc: round2(ratio(sums.spend, sums.clicks as f64)),
            conversion_rate: round2(percentage(sums.conversions as f64, sums.clicks as f64)),
            roas: round2(ratio(sums.revenue, sums.spend)),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub impressions: i64,
    pub clicks: i64,
    pub conversions: i64,
    pub spend: f64,
    pub revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct CampaignSeries {
    pub campaign_id: Uuid,
    pub series: Vec<DailyPoint>,
    pub totals: AnalyticsTotals,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRangeQuery {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(ValidationError::InvalidValue(
                    "from".to_string(),
                    "must not be after to".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(impressions: i64, clicks: i64) -> RecordAnalyticsRequest {
        RecordAnalyticsRequest {
            campaign_id: Uuid::new_v4(),
            ad_id: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            impressions,
            clicks,
            conversions: 0,
            reach: 0,
            spend: 10.0,
            revenue: 0.0,
        }
    }

    #[test]
    fn test_clicks_cannot_exceed_impressions() {
        assert!(request(100, 10).validate().is_ok());
        assert!(request(10, 11).validate().is_err());
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(request(-1, 0).validate().is_err());
        let mut r = request(10, 1);
        r.spend = -0.5;
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_totals_ratios() {
        let totals = AnalyticsTotals::from(MetricSums {
            impressions: 2000,
            clicks: 50,
            conversions: 5,
            spend: 100.0,
            revenue: 250.0,
        });
        assert_eq!(totals.ctr, 2.5);
        assert_eq!(totals.cpc, 2.0);
        assert_eq!(totals.conversion_rate, 10.0);
        assert_eq!(totals.roas, 2.5);
    }

    #[test]
    fn test_totals_with_zero_denominators() {
        let totals = AnalyticsTotals::from(MetricSums::default());
        assert_eq!(totals.ctr, 0.0);
        assert_eq!(totals.cpc, 0.0);
        assert_eq!(totals.conversion_rate, 0.0);
        assert_eq!(totals.roas, 0.0);
    }

    #[test]
    fn test_date_range_order() {
        let range = DateRangeQuery {
            from: NaiveDate::from_ymd_opt(2024, 5, 2),
            to: NaiveDate::from_ymd_opt(2024, 5, 1),
        };
        assert!(range.validate().is_err());
        assert!(DateRangeQuery::default().validate().is_ok());
    }
}
