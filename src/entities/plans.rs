use chrono::{DateTime, Duration, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "plan_kind")]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    #[sea_orm(string_value = "subscription")]
    Subscription,
    #[sea_orm(string_value = "one_time")]
    OneTime,
    #[sea_orm(string_value = "usage_based")]
    UsageBased,
}

impl std::fmt::Display for PlanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanKind::Subscription => write!(f, "subscription"),
            PlanKind::OneTime => write!(f, "one_time"),
            PlanKind::UsageBased => write!(f, "usage_based"),
        }
    }
}

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "plan_status")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Draft => write!(f, "draft"),
            PlanStatus::Active => write!(f, "active"),
            PlanStatus::Archived => write!(f, "archived"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "billing_period")]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "quarterly")]
    Quarterly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

impl BillingPeriod {
    /// Fixed-length billing cycles; renewals are anchored to the previous
    /// period end, not to calendar month boundaries.
    pub fn length(&self) -> Duration {
        match self {
            BillingPeriod::Monthly => Duration::days(30),
            BillingPeriod::Quarterly => Duration::days(90),
            BillingPeriod::Yearly => Duration::days(365),
        }
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BillingPeriod::Monthly => write!(f, "monthly"),
            BillingPeriod::Quarterly => write!(f, "quarterly"),
            BillingPeriod::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub slug: String,
    pub kind: PlanKind,
    pub trial_days: i32,
    pub status: PlanStatus,
    pub billing_periods: Json,
    pub metadata: Option<Json>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn billing_periods(&self) -> Vec<BillingPeriod> {
        serde_json::from_value(self.billing_periods.clone()).unwrap_or_default()
    }

    pub fn allows_period(&self, period: BillingPeriod) -> bool {
        self.billing_periods().contains(&period)
    }

    pub fn is_selectable(&self) -> bool {
        self.status == PlanStatus::Active
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
