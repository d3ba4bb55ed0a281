use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Append-only; multiple rows for the same (subscription, resource, period)
/// are summed, never overwritten, so at-least-once delivery is safe.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "usage_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub subscription_id: i64,
    pub resource_key: String,
    pub quantity: i64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
