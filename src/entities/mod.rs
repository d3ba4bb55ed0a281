pub mod coupon_redemptions;
pub mod coupons;
pub mod plan_limits;
pub mod plans;
pub mod price_points;
pub mod subscriptions;
pub mod usage_records;

pub use coupon_redemptions as coupon_redemption_entity;
pub use coupons as coupon_entity;
pub use plan_limits as plan_limit_entity;
pub use plans as plan_entity;
pub use price_points as price_point_entity;
pub use subscriptions as subscription_entity;
pub use usage_records as usage_record_entity;

pub use coupons::{DiscountType, normalize_code};
pub use plan_limits::QuotaResetPeriod;
pub use plans::{BillingPeriod, PlanKind, PlanStatus};
pub use subscriptions::SubscriptionStatus;
