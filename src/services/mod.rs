pub mod coupon_service;
pub mod price_catalog_service;
pub mod subscription_service;
pub mod usage_meter_service;

pub use coupon_service::CouponService;
pub use price_catalog_service::PriceCatalogService;
pub use subscription_service::SubscriptionService;
pub use usage_meter_service::UsageMeterService;
