use crate::entities::{
    BillingPeriod, PlanKind, PlanStatus, QuotaResetPeriod, plan_entity, plan_limit_entity,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub slug: String,
    pub kind: PlanKind,
    #[serde(default)]
    pub trial_days: i32,
    pub billing_periods: Vec<BillingPeriod>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub id: i64,
    pub slug: String,
    pub kind: PlanKind,
    pub trial_days: i32,
    pub status: PlanStatus,
    pub billing_periods: Vec<BillingPeriod>,
    pub created_at: DateTime<Utc>,
}

impl From<plan_entity::Model> for PlanResponse {
    fn from(plan: plan_entity::Model) -> Self {
        let billing_periods = plan.billing_periods();
        Self {
            id: plan.id,
            slug: plan.slug,
            kind: plan.kind,
            trial_days: plan.trial_days,
            status: plan.status,
            billing_periods,
            created_at: plan.created_at.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<PlanStatus>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolvePriceQuery {
    pub currency: String,
    pub billing_period: BillingPeriod,
    /// Defaults to now; evaluation instant for validity windows.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SchedulePriceRequest {
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub amount_cents: i64,
    #[serde(default)]
    pub compare_at_cents: Option<i64>,
    #[serde(default)]
    pub effective_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub effective_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EndPriceRequest {
    /// When the price point stops being effective; defaults to now.
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PricePointResponse {
    pub id: i64,
    pub plan_id: i64,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub amount_cents: i64,
    pub compare_at_cents: Option<i64>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    /// Minor-unit digits of `currency`, for formatting `amount_cents`.
    pub minor_unit_digits: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttachLimitRequest {
    pub resource_key: String,
    /// None means unlimited.
    #[serde(default)]
    pub quota: Option<i64>,
    #[serde(default)]
    pub reset_period: Option<QuotaResetPeriod>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanLimitResponse {
    pub plan_id: i64,
    pub resource_key: String,
    pub quota: Option<i64>,
    pub reset_period: QuotaResetPeriod,
}

impl From<plan_limit_entity::Model> for PlanLimitResponse {
    fn from(limit: plan_limit_entity::Model) -> Self {
        Self {
            plan_id: limit.plan_id,
            resource_key: limit.resource_key,
            quota: limit.quota,
            reset_period: limit.reset_period,
        }
    }
}
