use crate::entities::BillingPeriod;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "price_points")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub plan_id: i64,
    pub currency: String,
    pub billing_period: BillingPeriod,
    pub amount_cents: i64,
    pub compare_at_cents: Option<i64>,
    pub effective_from: Option<DateTime<Utc>>,
    pub effective_until: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Validity windows are half-open: [effective_from, effective_until).
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        match (self.effective_from, self.effective_until) {
            (Some(from), Some(until)) => from <= at && at < until,
            (Some(from), None) => from <= at,
            (None, Some(until)) => at < until,
            (None, None) => true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.effective_from.is_none() && self.effective_until.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
