use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    BillingPeriod, DiscountType, PlanKind, PlanStatus, QuotaResetPeriod, SubscriptionStatus,
};
use crate::error::CouponInvalidReason;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::catalog::create_plan,
        handlers::catalog::get_plans,
        handlers::catalog::get_plan,
        handlers::catalog::archive_plan,
        handlers::catalog::resolve_price,
        handlers::catalog::schedule_price,
        handlers::catalog::end_price,
        handlers::catalog::attach_limit,
        handlers::catalog::get_limits,
        handlers::coupon::create_coupon,
        handlers::coupon::deactivate_coupon,
        handlers::coupon::validate_coupon,
        handlers::coupon::redeem_coupon,
        handlers::coupon::get_redemptions,
        handlers::subscription::create_subscription,
        handlers::subscription::get_subscriptions,
        handlers::subscription::get_subscription,
        handlers::subscription::change_plan,
        handlers::subscription::pause_subscription,
        handlers::subscription::resume_subscription,
        handlers::subscription::cancel_subscription,
        handlers::subscription::advance_subscription,
        handlers::subscription::sweep_subscriptions,
        handlers::subscription::record_payment_result,
        handlers::usage::record_usage,
        handlers::usage::get_usage,
        handlers::usage::check_quota,
    ),
    components(
        schemas(
            PlanKind,
            PlanStatus,
            BillingPeriod,
            QuotaResetPeriod,
            DiscountType,
            SubscriptionStatus,
            CouponInvalidReason,
            CreatePlanRequest,
            PlanResponse,
            PlanQuery,
            ResolvePriceQuery,
            SchedulePriceRequest,
            EndPriceRequest,
            PricePointResponse,
            AttachLimitRequest,
            PlanLimitResponse,
            CreateCouponRequest,
            CouponResponse,
            ValidateCouponRequest,
            ValidateCouponResponse,
            RedeemCouponRequest,
            RedemptionResponse,
            RedemptionQuery,
            CreateSubscriptionRequest,
            CreateSubscriptionResponse,
            SubscriptionResponse,
            SubscriptionQuery,
            ChangePlanRequest,
            ChangePlanResponse,
            PauseSubscriptionRequest,
            ResumeSubscriptionRequest,
            CancelSubscriptionRequest,
            AdvanceRequest,
            SweepResponse,
            PaymentResultRequest,
            RecordUsageRequest,
            UsageResponse,
            UsageQuery,
            QuotaQuery,
            QuotaResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "catalog", description = "Plan and price catalog API"),
        (name = "coupon", description = "Coupon API"),
        (name = "subscription", description = "Subscription lifecycle API"),
        (name = "usage", description = "Usage metering API"),
    ),
    info(
        title = "Billing Backend API",
        version = "1.0.0",
        description = "Pricing, coupon, usage metering and subscription lifecycle API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
