use crate::models::*;
use crate::services::SubscriptionService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscription",
    request_body = CreateSubscriptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscription created", body = CreateSubscriptionResponse),
        (status = 400, description = "Invalid plan, currency or coupon"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match subscription_service
        .create_subscription(user_id, &request)
        .await
    {
        Ok((sub, first_charge, discount, redemption_id)) => {
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": CreateSubscriptionResponse {
                    subscription: SubscriptionResponse::from(sub),
                    first_charge_cents: first_charge,
                    discount_applied_cents: discount,
                    coupon_redemption_id: redemption_id,
                }
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscription",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Caller's subscriptions"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_subscriptions(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    query: web::Query<SubscriptionQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match subscription_service.list_subscriptions(user_id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/{subscription_id}",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscription detail", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn get_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match subscription_service
        .get_subscription(user_id, path.into_inner())
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SubscriptionResponse::from(sub)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{subscription_id}/change-plan",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = ChangePlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan changed", body = ChangePlanResponse),
        (status = 409, description = "Invalid transition"),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn change_plan(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ChangePlanRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match subscription_service
        .change_plan(user_id, path.into_inner(), &request)
        .await
    {
        Ok((sub, credit, charge)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ChangePlanResponse {
                subscription: SubscriptionResponse::from(sub),
                credit_cents: credit,
                charge_cents: charge,
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{subscription_id}/pause",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = PauseSubscriptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscription paused", body = SubscriptionResponse),
        (status = 409, description = "Invalid transition")
    )
)]
pub async fn pause_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<PauseSubscriptionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match subscription_service
        .pause_subscription(user_id, path.into_inner(), &request)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SubscriptionResponse::from(sub)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{subscription_id}/resume",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = ResumeSubscriptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscription resumed", body = SubscriptionResponse),
        (status = 409, description = "Invalid transition")
    )
)]
pub async fn resume_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<ResumeSubscriptionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let at = request.at.unwrap_or_else(Utc::now);

    match subscription_service
        .resume_subscription(user_id, path.into_inner(), at)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SubscriptionResponse::from(sub)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{subscription_id}/cancel",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = CancelSubscriptionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Subscription cancelled", body = SubscriptionResponse),
        (status = 409, description = "Already terminal")
    )
)]
pub async fn cancel_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<CancelSubscriptionRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match subscription_service
        .cancel_subscription(user_id, path.into_inner(), &request)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SubscriptionResponse::from(sub)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{subscription_id}/advance",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = AdvanceRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Advance applied (or no-op)", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn advance_subscription(
    subscription_service: web::Data<SubscriptionService>,
    path: web::Path<i64>,
    request: web::Json<AdvanceRequest>,
) -> Result<HttpResponse> {
    let at = request.at.unwrap_or_else(Utc::now);

    match subscription_service.advance(path.into_inner(), at).await {
        Ok((sub, changed)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "subscription": SubscriptionResponse::from(sub),
                "changed": changed
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/sweep",
    tag = "subscription",
    request_body = AdvanceRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Sweep summary", body = SweepResponse)
    )
)]
pub async fn sweep_subscriptions(
    subscription_service: web::Data<SubscriptionService>,
    request: web::Json<AdvanceRequest>,
) -> Result<HttpResponse> {
    let at = request.at.unwrap_or_else(Utc::now);

    match subscription_service.sweep_due(at).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/{subscription_id}/payment-result",
    tag = "subscription",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = PaymentResultRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Payment result recorded", body = SubscriptionResponse),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn record_payment_result(
    subscription_service: web::Data<SubscriptionService>,
    path: web::Path<i64>,
    request: web::Json<PaymentResultRequest>,
) -> Result<HttpResponse> {
    match subscription_service
        .record_payment_result(path.into_inner(), request.success)
        .await
    {
        Ok(sub) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": SubscriptionResponse::from(sub)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("", web::post().to(create_subscription))
            .route("", web::get().to(get_subscriptions))
            .route("/sweep", web::post().to(sweep_subscriptions))
            .route("/{subscription_id}", web::get().to(get_subscription))
            .route("/{subscription_id}/change-plan", web::post().to(change_plan))
            .route("/{subscription_id}/pause", web::post().to(pause_subscription))
            .route("/{subscription_id}/resume", web::post().to(resume_subscription))
            .route("/{subscription_id}/cancel", web::post().to(cancel_subscription))
            .route("/{subscription_id}/advance", web::post().to(advance_subscription))
            .route(
                "/{subscription_id}/payment-result",
                web::post().to(record_payment_result),
            ),
    );
}
