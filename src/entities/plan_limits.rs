use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "quota_reset_period")]
#[serde(rename_all = "snake_case")]
pub enum QuotaResetPeriod {
    #[sea_orm(string_value = "billing_cycle")]
    BillingCycle,
    #[sea_orm(string_value = "daily")]
    Daily,
}

impl std::fmt::Display for QuotaResetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaResetPeriod::BillingCycle => write!(f, "billing_cycle"),
            QuotaResetPeriod::Daily => write!(f, "daily"),
        }
    }
}

/// quota = NULL means unlimited.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "plan_limits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub plan_id: i64,
    pub resource_key: String,
    pub quota: Option<i64>,
    pub reset_period: QuotaResetPeriod,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
