use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Immutable redemption fact; per-user caps are enforced by counting
/// these rows, never by the coupon's global counter.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupon_redemptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub coupon_id: i64,
    pub user_id: i64,
    pub subscription_id: Option<i64>,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
