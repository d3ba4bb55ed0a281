use crate::error::AppError;
use crate::models::*;
use crate::services::CouponService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/coupons",
    tag = "coupon",
    request_body = CreateCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupon created", body = CouponResponse),
        (status = 400, description = "Invalid coupon definition"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_coupon(
    coupon_service: web::Data<CouponService>,
    request: web::Json<CreateCouponRequest>,
) -> Result<HttpResponse> {
    match coupon_service.create_coupon(request.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CouponResponse::from(coupon)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/{coupon_id}/deactivate",
    tag = "coupon",
    params(
        ("coupon_id" = i64, Path, description = "Coupon id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupon deactivated", body = CouponResponse),
        (status = 404, description = "Coupon not found")
    )
)]
pub async fn deactivate_coupon(
    coupon_service: web::Data<CouponService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match coupon_service.deactivate_coupon(path.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": CouponResponse::from(coupon)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/validate",
    tag = "coupon",
    request_body = ValidateCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Validation verdict", body = ValidateCouponResponse),
        (status = 404, description = "Coupon not found"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn validate_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    request: web::Json<ValidateCouponRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let at = request.at.unwrap_or_else(Utc::now);

    match coupon_service
        .validate_coupon(
            user_id,
            &request.code,
            request.plan_id,
            request.billing_period,
            at,
        )
        .await
    {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ValidateCouponResponse {
                valid: true,
                discount_type: Some(coupon.discount_type),
                discount_value: Some(coupon.value),
                reason: None,
            }
        }))),
        // an ineligible coupon is a negative verdict, not an error
        Err(AppError::CouponInvalid(reason)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ValidateCouponResponse {
                valid: false,
                discount_type: None,
                discount_value: None,
                reason: Some(reason),
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/coupons/redeem",
    tag = "coupon",
    request_body = RedeemCouponRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Coupon redeemed", body = RedemptionResponse),
        (status = 400, description = "Coupon invalid"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn redeem_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    request: web::Json<RedeemCouponRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match coupon_service.redeem_coupon(user_id, &request).await {
        Ok((_, redemption)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": RedemptionResponse::from(redemption)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/coupons/redemptions",
    tag = "coupon",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Caller's redemption history"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_redemptions(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    query: web::Query<RedemptionQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match coupon_service.list_redemptions(user_id, &query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/coupons")
            .route("", web::post().to(create_coupon))
            .route("/validate", web::post().to(validate_coupon))
            .route("/redeem", web::post().to(redeem_coupon))
            .route("/redemptions", web::get().to(get_redemptions))
            .route("/{coupon_id}/deactivate", web::post().to(deactivate_coupon)),
    );
}
