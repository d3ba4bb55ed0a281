use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

pub type AppResult<T> = Result<T, AppError>;

/// First failing check wins; reasons are never aggregated so the client
/// can render one unambiguous message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CouponInvalidReason {
    Expired,
    Exhausted,
    NotApplicableToPlan,
    UserLimitReached,
}

impl std::fmt::Display for CouponInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponInvalidReason::Expired => write!(f, "expired"),
            CouponInvalidReason::Exhausted => write!(f, "exhausted"),
            CouponInvalidReason::NotApplicableToPlan => write!(f, "not_applicable_to_plan"),
            CouponInvalidReason::UserLimitReached => write!(f, "user_limit_reached"),
        }
    }
}

impl CouponInvalidReason {
    pub fn message(&self) -> &'static str {
        match self {
            CouponInvalidReason::Expired => "This coupon is not valid at this time",
            CouponInvalidReason::Exhausted => "This coupon has reached its usage limit",
            CouponInvalidReason::NotApplicableToPlan => {
                "This coupon does not apply to the selected plan"
            }
            CouponInvalidReason::UserLimitReached => {
                "You have already used this coupon the maximum number of times"
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous price configuration: {0}")]
    AmbiguousPrice(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Coupon invalid: {0}")]
    CouponInvalid(CouponInvalidReason),

    #[error("Quota exceeded, {remaining} remaining")]
    QuotaExceeded { remaining: i64 },

    #[error("Concurrent modification, please retry")]
    ConcurrencyConflict,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::AmbiguousPrice(msg) => {
                // catalog configuration defect, not a caller mistake
                log::error!("Ambiguous price configuration: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AMBIGUOUS_PRICE",
                    msg.clone(),
                )
            }
            AppError::InvalidTransition(msg) => {
                log::warn!("Invalid subscription transition: {msg}");
                (StatusCode::CONFLICT, "INVALID_TRANSITION", msg.clone())
            }
            AppError::CouponInvalid(reason) => {
                return HttpResponse::BadRequest().json(json!({
                    "success": false,
                    "error": {
                        "code": "COUPON_INVALID",
                        "reason": reason,
                        "message": reason.message()
                    }
                }));
            }
            AppError::QuotaExceeded { remaining } => {
                return HttpResponse::Conflict().json(json!({
                    "success": false,
                    "error": {
                        "code": "QUOTA_EXCEEDED",
                        "remaining": remaining,
                        "message": format!("Quota exceeded, {remaining} remaining in this period")
                    }
                }));
            }
            AppError::ConcurrencyConflict => {
                log::warn!("Optimistic lock conflict surfaced to caller");
                (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    "Concurrent modification, please retry".to_string(),
                )
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                (StatusCode::BAD_GATEWAY, "EXTERNAL_API_ERROR", msg.clone())
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
