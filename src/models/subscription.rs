use crate::entities::{BillingPeriod, SubscriptionStatus, subscription_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    pub plan_id: i64,
    pub billing_period: BillingPeriod,
    pub currency: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: i64,
    pub billing_period: BillingPeriod,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub pending_plan_id: Option<i64>,
    pub pending_effective_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub resume_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<subscription_entity::Model> for SubscriptionResponse {
    fn from(sub: subscription_entity::Model) -> Self {
        Self {
            id: sub.id,
            user_id: sub.user_id,
            plan_id: sub.plan_id,
            billing_period: sub.billing_period,
            currency: sub.currency,
            status: sub.status,
            trial_ends_at: sub.trial_ends_at,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            cancel_at_period_end: sub.cancel_at_period_end,
            pending_plan_id: sub.pending_plan_id,
            pending_effective_at: sub.pending_effective_at,
            paused_at: sub.paused_at,
            resume_at: sub.resume_at,
            ends_at: sub.ends_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSubscriptionResponse {
    pub subscription: SubscriptionResponse,
    /// What the first charge amounts to after any coupon discount.
    pub first_charge_cents: i64,
    pub discount_applied_cents: i64,
    pub coupon_redemption_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePlanRequest {
    pub plan_id: i64,
    /// When true the change is deferred to the current period end.
    #[serde(default)]
    pub scheduled: bool,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangePlanResponse {
    pub subscription: SubscriptionResponse,
    /// Credit for unused time on the old plan (zero for scheduled changes).
    pub credit_cents: i64,
    /// First charge on the new plan after credit (zero for scheduled changes).
    pub charge_cents: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PauseSubscriptionRequest {
    #[serde(default)]
    pub resume_at: Option<DateTime<Utc>>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResumeSubscriptionRequest {
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelSubscriptionRequest {
    /// Default true; false cancels immediately.
    #[serde(default = "default_at_period_end")]
    pub at_period_end: bool,
    pub at: Option<DateTime<Utc>>,
}

fn default_at_period_end() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvanceRequest {
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepResponse {
    /// Subscriptions whose period end had elapsed.
    pub due: i64,
    /// How many actually changed state.
    pub advanced: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResultRequest {
    pub success: bool,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<SubscriptionStatus>,
}
