use crate::entities::{
    BillingPeriod, DiscountType, coupon_entity as coupons,
    coupon_redemption_entity as redemptions, normalize_code,
};
use crate::error::{AppError, AppResult, CouponInvalidReason};
use crate::models::{
    CreateCouponRequest, PaginatedResponse, PaginationParams, RedeemCouponRequest,
    RedemptionQuery, RedemptionResponse,
};
use crate::utils::generate_coupon_code;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

/// Checks run in a fixed order and stop at the first failure: window,
/// global cap, plan/period restrictions, per-user cap. `user_redemptions`
/// is the caller's redemption count for this coupon.
fn check_coupon(
    coupon: &coupons::Model,
    plan_id: i64,
    billing_period: BillingPeriod,
    user_redemptions: i64,
    at: DateTime<Utc>,
) -> Result<(), CouponInvalidReason> {
    if !coupon.is_active || !coupon.is_within_window(at) {
        return Err(CouponInvalidReason::Expired);
    }
    if !coupon.has_remaining_uses() {
        return Err(CouponInvalidReason::Exhausted);
    }
    if let Some(plans) = coupon.plan_restriction()
        && !plans.contains(&plan_id)
    {
        return Err(CouponInvalidReason::NotApplicableToPlan);
    }
    if let Some(periods) = coupon.period_restriction()
        && !periods.contains(&billing_period)
    {
        return Err(CouponInvalidReason::NotApplicableToPlan);
    }
    if let Some(cap) = coupon.per_user_cap
        && user_redemptions >= cap
    {
        return Err(CouponInvalidReason::UserLimitReached);
    }
    Ok(())
}

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
}

impl CouponService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn create_coupon(&self, req: CreateCouponRequest) -> AppResult<coupons::Model> {
        match req.discount_type {
            DiscountType::Percentage => {
                if req.value < 1 || req.value > 100 {
                    return Err(AppError::ValidationError(
                        "Percentage value must be between 1 and 100".into(),
                    ));
                }
            }
            DiscountType::FixedAmount => {
                if req.value <= 0 {
                    return Err(AppError::ValidationError(
                        "Fixed discount amount must be positive".into(),
                    ));
                }
            }
        }
        if let Some(cap) = req.usage_cap
            && cap <= 0
        {
            return Err(AppError::ValidationError(
                "Usage cap must be positive".into(),
            ));
        }
        if let Some(cap) = req.per_user_cap
            && cap <= 0
        {
            return Err(AppError::ValidationError(
                "Per-user cap must be positive".into(),
            ));
        }
        if let (Some(from), Some(until)) = (req.valid_from, req.valid_until)
            && until <= from
        {
            return Err(AppError::ValidationError(
                "valid_until must be after valid_from".into(),
            ));
        }

        let code = match &req.code {
            Some(code) if !code.trim().is_empty() => normalize_code(code),
            _ => generate_coupon_code(),
        };

        let existing = coupons::Entity::find()
            .filter(coupons::Column::Code.eq(code.clone()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(format!(
                "Coupon code '{code}' already exists"
            )));
        }

        let plan_ids = match &req.plan_ids {
            Some(ids) => Some(serde_json::to_value(ids)?),
            None => None,
        };
        let billing_periods = match &req.billing_periods {
            Some(periods) => Some(serde_json::to_value(periods)?),
            None => None,
        };

        let model = coupons::ActiveModel {
            code: Set(code),
            discount_type: Set(req.discount_type),
            value: Set(req.value),
            plan_ids: Set(plan_ids),
            billing_periods: Set(billing_periods),
            usage_cap: Set(req.usage_cap),
            per_user_cap: Set(req.per_user_cap),
            valid_from: Set(req.valid_from),
            valid_until: Set(req.valid_until),
            first_payment_only: Set(req.first_payment_only),
            is_active: Set(true),
            used_count: Set(0),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(model)
    }

    pub async fn deactivate_coupon(&self, coupon_id: i64) -> AppResult<coupons::Model> {
        let coupon = coupons::Entity::find_by_id(coupon_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Coupon {coupon_id} not found")))?;

        let mut am = coupon.into_active_model();
        am.is_active = Set(false);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(&self.pool).await?)
    }

    async fn find_by_code<C: ConnectionTrait>(
        &self,
        db: &C,
        code: &str,
    ) -> AppResult<coupons::Model> {
        let normalized = normalize_code(code);
        coupons::Entity::find()
            .filter(coupons::Column::Code.eq(normalized.clone()))
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Coupon '{normalized}' not found")))
    }

    async fn count_user_redemptions<C: ConnectionTrait>(
        &self,
        db: &C,
        coupon_id: i64,
        user_id: i64,
    ) -> AppResult<i64> {
        let count = redemptions::Entity::find()
            .filter(redemptions::Column::CouponId.eq(coupon_id))
            .filter(redemptions::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        Ok(count as i64)
    }

    /// Read-only eligibility check. A positive answer is advisory: the
    /// caps are only enforced atomically at redemption time.
    pub async fn validate_coupon(
        &self,
        user_id: i64,
        code: &str,
        plan_id: i64,
        billing_period: BillingPeriod,
        at: DateTime<Utc>,
    ) -> AppResult<coupons::Model> {
        let coupon = self.find_by_code(&self.pool, code).await?;
        let used = self
            .count_user_redemptions(&self.pool, coupon.id, user_id)
            .await?;
        check_coupon(&coupon, plan_id, billing_period, used, at)
            .map_err(AppError::CouponInvalid)?;
        Ok(coupon)
    }

    /// Redeem inside an existing transaction. The global cap is claimed
    /// with a conditional increment so two concurrent redemptions of the
    /// last slot cannot both succeed.
    pub async fn redeem_in_txn<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: i64,
        code: &str,
        plan_id: i64,
        billing_period: BillingPeriod,
        subscription_id: Option<i64>,
        at: DateTime<Utc>,
    ) -> AppResult<(coupons::Model, redemptions::Model)> {
        let coupon = self.find_by_code(txn, code).await?;
        let used = self
            .count_user_redemptions(txn, coupon.id, user_id)
            .await?;
        check_coupon(&coupon, plan_id, billing_period, used, at)
            .map_err(AppError::CouponInvalid)?;

        let result = coupons::Entity::update_many()
            .col_expr(
                coupons::Column::UsedCount,
                Expr::col(coupons::Column::UsedCount).add(1),
            )
            .col_expr(coupons::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(coupons::Column::Id.eq(coupon.id))
            .filter(
                Condition::any()
                    .add(coupons::Column::UsageCap.is_null())
                    .add(
                        Expr::col(coupons::Column::UsedCount)
                            .lt(Expr::col(coupons::Column::UsageCap)),
                    ),
            )
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            // lost the race for the final use
            return Err(AppError::CouponInvalid(CouponInvalidReason::Exhausted));
        }

        let redemption = redemptions::ActiveModel {
            coupon_id: Set(coupon.id),
            user_id: Set(user_id),
            subscription_id: Set(subscription_id),
            redeemed_at: Set(at),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        log::info!(
            "Coupon {} redeemed by user {user_id} (redemption {})",
            coupon.code,
            redemption.id
        );

        Ok((coupon, redemption))
    }

    pub async fn redeem_coupon(
        &self,
        user_id: i64,
        req: &RedeemCouponRequest,
    ) -> AppResult<(coupons::Model, redemptions::Model)> {
        let at = req.at.unwrap_or_else(Utc::now);
        let txn = self.pool.begin().await?;
        let result = self
            .redeem_in_txn(
                &txn,
                user_id,
                &req.code,
                req.plan_id,
                req.billing_period,
                req.subscription_id,
                at,
            )
            .await?;
        txn.commit().await?;
        Ok(result)
    }

    pub async fn list_redemptions(
        &self,
        user_id: i64,
        query: &RedemptionQuery,
    ) -> AppResult<PaginatedResponse<RedemptionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let base_query =
            redemptions::Entity::find().filter(redemptions::Column::UserId.eq(user_id));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let rows = base_query
            .order_by_desc(redemptions::Column::RedeemedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<RedemptionResponse> = rows.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_per_page(),
            total,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn coupon() -> coupons::Model {
        coupons::Model {
            id: 1,
            code: "SAVE50".into(),
            discount_type: DiscountType::Percentage,
            value: 50,
            plan_ids: None,
            billing_periods: None,
            usage_cap: None,
            per_user_cap: None,
            valid_from: None,
            valid_until: None,
            first_payment_only: false,
            is_active: true,
            used_count: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_unrestricted_coupon_passes() {
        assert!(check_coupon(&coupon(), 7, BillingPeriod::Monthly, 0, ts(0)).is_ok());
    }

    #[test]
    fn test_inactive_coupon_reads_as_expired() {
        let mut c = coupon();
        c.is_active = false;
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(0)),
            Err(CouponInvalidReason::Expired)
        );
    }

    #[test]
    fn test_window_bounds() {
        let mut c = coupon();
        c.valid_from = Some(ts(1));
        c.valid_until = Some(ts(10));
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(0)),
            Err(CouponInvalidReason::Expired)
        );
        assert!(check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(1)).is_ok());
        // valid_until is exclusive
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(10)),
            Err(CouponInvalidReason::Expired)
        );
    }

    #[test]
    fn test_global_cap_exhaustion() {
        let mut c = coupon();
        c.usage_cap = Some(100);
        c.used_count = 100;
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(0)),
            Err(CouponInvalidReason::Exhausted)
        );
    }

    #[test]
    fn test_plan_restriction() {
        let mut c = coupon();
        c.plan_ids = Some(serde_json::json!([3, 5]));
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(0)),
            Err(CouponInvalidReason::NotApplicableToPlan)
        );
        assert!(check_coupon(&c, 5, BillingPeriod::Monthly, 0, ts(0)).is_ok());
    }

    #[test]
    fn test_period_restriction() {
        let mut c = coupon();
        c.billing_periods = Some(serde_json::json!(["yearly"]));
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(0)),
            Err(CouponInvalidReason::NotApplicableToPlan)
        );
        assert!(check_coupon(&c, 7, BillingPeriod::Yearly, 0, ts(0)).is_ok());
    }

    #[test]
    fn test_per_user_cap() {
        let mut c = coupon();
        c.per_user_cap = Some(1);
        assert!(check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(0)).is_ok());
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 1, ts(0)),
            Err(CouponInvalidReason::UserLimitReached)
        );
    }

    #[test]
    fn test_first_failure_wins() {
        // both expired and restricted to another plan; window check runs first
        let mut c = coupon();
        c.valid_until = Some(ts(0));
        c.plan_ids = Some(serde_json::json!([3]));
        assert_eq!(
            check_coupon(&c, 7, BillingPeriod::Monthly, 0, ts(5)),
            Err(CouponInvalidReason::Expired)
        );
    }
}
