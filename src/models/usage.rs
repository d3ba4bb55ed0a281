use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordUsageRequest {
    pub resource_key: String,
    pub quantity: i64,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    pub subscription_id: i64,
    pub resource_key: String,
    pub used: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageQuery {
    pub resource_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuotaQuery {
    pub resource_key: String,
    /// Additional quantity the caller intends to record.
    #[serde(default)]
    pub additional: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuotaResponse {
    pub allowed: bool,
    pub used: i64,
    /// None means the plan places no limit on this resource.
    pub quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
}
