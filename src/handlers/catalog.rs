use crate::models::*;
use crate::services::PriceCatalogService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

#[utoipa::path(
    post,
    path = "/plans",
    tag = "catalog",
    request_body = CreatePlanRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan created", body = PlanResponse),
        (status = 400, description = "Invalid plan definition"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_plan(
    catalog_service: web::Data<PriceCatalogService>,
    request: web::Json<CreatePlanRequest>,
) -> Result<HttpResponse> {
    match catalog_service.create_plan(request.into_inner()).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": PlanResponse::from(plan)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/plans",
    tag = "catalog",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter: draft/active/archived")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan list"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_plans(
    catalog_service: web::Data<PriceCatalogService>,
    query: web::Query<PlanQuery>,
) -> Result<HttpResponse> {
    match catalog_service.list_plans(&query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/plans/{plan_id}",
    tag = "catalog",
    params(
        ("plan_id" = i64, Path, description = "Plan id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan detail", body = PlanResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn get_plan(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match catalog_service.get_plan(path.into_inner()).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": PlanResponse::from(plan)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/plans/{plan_id}/archive",
    tag = "catalog",
    params(
        ("plan_id" = i64, Path, description = "Plan id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Plan archived", body = PlanResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn archive_plan(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match catalog_service.archive_plan(path.into_inner()).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": PlanResponse::from(plan)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/plans/{plan_id}/price",
    tag = "catalog",
    params(
        ("plan_id" = i64, Path, description = "Plan id"),
        ("currency" = String, Query, description = "ISO currency code"),
        ("billing_period" = String, Query, description = "monthly/quarterly/yearly"),
        ("at" = Option<String>, Query, description = "Evaluation instant, defaults to now")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Resolved price", body = PricePointResponse),
        (status = 404, description = "No price active at this time")
    )
)]
pub async fn resolve_price(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
    query: web::Query<ResolvePriceQuery>,
) -> Result<HttpResponse> {
    let at = query.at.unwrap_or_else(Utc::now);

    match catalog_service
        .resolve_price(path.into_inner(), &query.currency, query.billing_period, at)
        .await
    {
        Ok(price) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": catalog_service.price_response(price)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/plans/{plan_id}/prices",
    tag = "catalog",
    params(
        ("plan_id" = i64, Path, description = "Plan id")
    ),
    request_body = SchedulePriceRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Price point scheduled", body = PricePointResponse),
        (status = 400, description = "Window overlaps an existing price")
    )
)]
pub async fn schedule_price(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
    request: web::Json<SchedulePriceRequest>,
) -> Result<HttpResponse> {
    match catalog_service
        .schedule_price(path.into_inner(), request.into_inner())
        .await
    {
        Ok(price) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": catalog_service.price_response(price)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/prices/{price_point_id}/end",
    tag = "catalog",
    params(
        ("price_point_id" = i64, Path, description = "Price point id")
    ),
    request_body = EndPriceRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Price window closed", body = PricePointResponse),
        (status = 404, description = "Price point not found")
    )
)]
pub async fn end_price(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
    request: web::Json<EndPriceRequest>,
) -> Result<HttpResponse> {
    let at = request.at.unwrap_or_else(Utc::now);

    match catalog_service.end_price(path.into_inner(), at).await {
        Ok(price) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": catalog_service.price_response(price)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/plans/{plan_id}/limits",
    tag = "catalog",
    params(
        ("plan_id" = i64, Path, description = "Plan id")
    ),
    request_body = AttachLimitRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Limit attached", body = PlanLimitResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn attach_limit(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
    request: web::Json<AttachLimitRequest>,
) -> Result<HttpResponse> {
    match catalog_service
        .attach_limit(path.into_inner(), request.into_inner())
        .await
    {
        Ok(limit) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": PlanLimitResponse::from(limit)
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/plans/{plan_id}/limits",
    tag = "catalog",
    params(
        ("plan_id" = i64, Path, description = "Plan id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Limits for the plan"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn get_limits(
    catalog_service: web::Data<PriceCatalogService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match catalog_service.list_limits(path.into_inner()).await {
        Ok(limits) => {
            let items: Vec<PlanLimitResponse> = limits.into_iter().map(Into::into).collect();
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": items
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn catalog_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/plans")
            .route("", web::post().to(create_plan))
            .route("", web::get().to(get_plans))
            .route("/{plan_id}", web::get().to(get_plan))
            .route("/{plan_id}/archive", web::post().to(archive_plan))
            .route("/{plan_id}/price", web::get().to(resolve_price))
            .route("/{plan_id}/prices", web::post().to(schedule_price))
            .route("/{plan_id}/limits", web::put().to(attach_limit))
            .route("/{plan_id}/limits", web::get().to(get_limits)),
    )
    .service(
        web::scope("/prices").route("/{price_point_id}/end", web::post().to(end_price)),
    );
}
