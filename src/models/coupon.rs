use crate::entities::{BillingPeriod, DiscountType, coupon_entity, coupon_redemption_entity};
use crate::error::CouponInvalidReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    /// Generated when omitted.
    #[serde(default)]
    pub code: Option<String>,
    pub discount_type: DiscountType,
    pub value: i64,
    #[serde(default)]
    pub plan_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub billing_periods: Option<Vec<BillingPeriod>>,
    #[serde(default)]
    pub usage_cap: Option<i64>,
    #[serde(default)]
    pub per_user_cap: Option<i64>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_payment_only: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub plan_ids: Option<Vec<i64>>,
    pub billing_periods: Option<Vec<BillingPeriod>>,
    pub usage_cap: Option<i64>,
    pub per_user_cap: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub first_payment_only: bool,
    pub is_active: bool,
    pub used_count: i64,
}

impl From<coupon_entity::Model> for CouponResponse {
    fn from(coupon: coupon_entity::Model) -> Self {
        let plan_ids = coupon.plan_restriction();
        let billing_periods = coupon.period_restriction();
        Self {
            id: coupon.id,
            code: coupon.code,
            discount_type: coupon.discount_type,
            value: coupon.value,
            plan_ids,
            billing_periods,
            usage_cap: coupon.usage_cap,
            per_user_cap: coupon.per_user_cap,
            valid_from: coupon.valid_from,
            valid_until: coupon.valid_until,
            first_payment_only: coupon.first_payment_only,
            is_active: coupon.is_active,
            used_count: coupon.used_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub plan_id: i64,
    pub billing_period: BillingPeriod,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CouponInvalidReason>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedeemCouponRequest {
    pub code: String,
    pub plan_id: i64,
    pub billing_period: BillingPeriod,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedemptionResponse {
    pub id: i64,
    pub coupon_id: i64,
    pub user_id: i64,
    pub subscription_id: Option<i64>,
    pub redeemed_at: DateTime<Utc>,
}

impl From<coupon_redemption_entity::Model> for RedemptionResponse {
    fn from(r: coupon_redemption_entity::Model) -> Self {
        Self {
            id: r.id,
            coupon_id: r.coupon_id,
            user_id: r.user_id,
            subscription_id: r.subscription_id,
            redeemed_at: r.redeemed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedemptionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}
