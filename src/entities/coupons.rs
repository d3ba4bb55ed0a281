use crate::entities::BillingPeriod;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "discount_type")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a whole percentage, 0-100.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// `value` is an amount in minor units.
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FixedAmount => write!(f, "fixed_amount"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub plan_ids: Option<Json>,
    pub billing_periods: Option<Json>,
    pub usage_cap: Option<i64>,
    pub per_user_cap: Option<i64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub first_payment_only: bool,
    pub is_active: bool,
    pub used_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn plan_restriction(&self) -> Option<Vec<i64>> {
        self.plan_ids
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn period_restriction(&self) -> Option<Vec<BillingPeriod>> {
        self.billing_periods
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_within_window(&self, at: DateTime<Utc>) -> bool {
        if let Some(from) = self.valid_from
            && at < from
        {
            return false;
        }
        if let Some(until) = self.valid_until
            && at >= until
        {
            return false;
        }
        true
    }

    pub fn has_remaining_uses(&self) -> bool {
        match self.usage_cap {
            Some(cap) => self.used_count < cap,
            None => true,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Codes are matched case-insensitively; the canonical form is uppercase.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
