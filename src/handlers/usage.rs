use crate::models::*;
use crate::services::UsageMeterService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

#[utoipa::path(
    post,
    path = "/usage/{subscription_id}/records",
    tag = "usage",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id")
    ),
    request_body = RecordUsageRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Usage recorded"),
        (status = 400, description = "Invalid quantity or timestamp"),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn record_usage(
    usage_service: web::Data<UsageMeterService>,
    path: web::Path<i64>,
    request: web::Json<RecordUsageRequest>,
) -> Result<HttpResponse> {
    match usage_service.record_usage(path.into_inner(), &request).await {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "id": record.id,
                "subscription_id": record.subscription_id,
                "resource_key": record.resource_key,
                "quantity": record.quantity,
                "recorded_at": record.recorded_at
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/usage/{subscription_id}",
    tag = "usage",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id"),
        ("resource_key" = String, Query, description = "Metered resource")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Usage in the current window", body = UsageResponse),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn get_usage(
    usage_service: web::Data<UsageMeterService>,
    path: web::Path<i64>,
    query: web::Query<UsageQuery>,
) -> Result<HttpResponse> {
    match usage_service
        .current_usage(path.into_inner(), &query.resource_key, Utc::now())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/usage/{subscription_id}/quota",
    tag = "usage",
    params(
        ("subscription_id" = i64, Path, description = "Subscription id"),
        ("resource_key" = String, Query, description = "Metered resource"),
        ("additional" = Option<i64>, Query, description = "Quantity about to be recorded")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Within quota", body = QuotaResponse),
        (status = 409, description = "Quota exceeded"),
        (status = 404, description = "Subscription not found")
    )
)]
pub async fn check_quota(
    usage_service: web::Data<UsageMeterService>,
    path: web::Path<i64>,
    query: web::Query<QuotaQuery>,
) -> Result<HttpResponse> {
    match usage_service
        .check_quota(
            path.into_inner(),
            &query.resource_key,
            query.additional,
            Utc::now(),
        )
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn usage_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/usage")
            .route("/{subscription_id}", web::get().to(get_usage))
            .route("/{subscription_id}/records", web::post().to(record_usage))
            .route("/{subscription_id}/quota", web::get().to(check_quota)),
    );
}
