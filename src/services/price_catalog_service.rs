use crate::entities::{
    BillingPeriod, PlanStatus, QuotaResetPeriod, plan_entity as plans,
    plan_limit_entity as limits, price_point_entity as prices,
};
use crate::error::{AppError, AppResult};
use crate::external::CurrencyService;
use crate::models::{
    AttachLimitRequest, CreatePlanRequest, PaginatedResponse, PaginationParams, PlanQuery,
    PlanResponse, PricePointResponse, SchedulePriceRequest,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Pick the price point in effect at `at` from all points sharing one
/// (plan, currency, period) key.
///
/// A point with a window containing `at` wins; with no such window the
/// single unbounded point is the fallback. Ties are a catalog
/// configuration defect and are reported, never silently resolved.
fn select_active_price(
    points: Vec<prices::Model>,
    at: DateTime<Utc>,
) -> AppResult<prices::Model> {
    let (unbounded, bounded): (Vec<_>, Vec<_>) =
        points.into_iter().partition(|p| p.is_unbounded());

    let mut windowed: Vec<prices::Model> =
        bounded.into_iter().filter(|p| p.is_active_at(at)).collect();

    if windowed.len() > 1 {
        return Err(AppError::AmbiguousPrice(format!(
            "{} overlapping price windows contain {at}",
            windowed.len()
        )));
    }
    if let Some(p) = windowed.pop() {
        return Ok(p);
    }

    if unbounded.len() > 1 {
        return Err(AppError::AmbiguousPrice(format!(
            "{} unbounded price points configured for the same key",
            unbounded.len()
        )));
    }
    let mut unbounded = unbounded;
    unbounded
        .pop()
        .ok_or_else(|| AppError::NotFound("No price active at this time".into()))
}

/// Half-open interval overlap, None meaning unbounded on that side.
fn windows_overlap(
    a_from: Option<DateTime<Utc>>,
    a_until: Option<DateTime<Utc>>,
    b_from: Option<DateTime<Utc>>,
    b_until: Option<DateTime<Utc>>,
) -> bool {
    let a_starts_before_b_ends = match (a_from, b_until) {
        (Some(from), Some(until)) => from < until,
        _ => true,
    };
    let b_starts_before_a_ends = match (b_from, a_until) {
        (Some(from), Some(until)) => from < until,
        _ => true,
    };
    a_starts_before_b_ends && b_starts_before_a_ends
}

#[derive(Clone)]
pub struct PriceCatalogService {
    pool: DatabaseConnection,
    currency_service: CurrencyService,
}

impl PriceCatalogService {
    pub fn new(pool: DatabaseConnection, currency_service: CurrencyService) -> Self {
        Self {
            pool,
            currency_service,
        }
    }

    pub async fn create_plan(&self, req: CreatePlanRequest) -> AppResult<plans::Model> {
        let slug = req.slug.trim().to_lowercase();
        if slug.is_empty() {
            return Err(AppError::ValidationError("Plan slug must not be empty".into()));
        }
        if req.billing_periods.is_empty() {
            return Err(AppError::ValidationError(
                "Plan must allow at least one billing period".into(),
            ));
        }
        if req.trial_days < 0 {
            return Err(AppError::ValidationError(
                "Trial days must not be negative".into(),
            ));
        }

        let existing = plans::Entity::find()
            .filter(plans::Column::Slug.eq(slug.clone()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(format!(
                "Plan slug '{slug}' already exists"
            )));
        }

        let model = plans::ActiveModel {
            slug: Set(slug),
            kind: Set(req.kind),
            trial_days: Set(req.trial_days),
            status: Set(PlanStatus::Active),
            billing_periods: Set(serde_json::to_value(&req.billing_periods)?),
            metadata: Set(req.metadata),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(model)
    }

    pub async fn get_plan(&self, plan_id: i64) -> AppResult<plans::Model> {
        plans::Entity::find_by_id(plan_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))
    }

    pub async fn list_plans(
        &self,
        query: &PlanQuery,
    ) -> AppResult<PaginatedResponse<PlanResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = plans::Entity::find();
        if let Some(status) = &query.status {
            base_query = base_query.filter(plans::Column::Status.eq(status.clone()));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items_models = base_query
            .order_by_asc(plans::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<PlanResponse> = items_models.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_per_page(),
            total,
        ))
    }

    /// Archived plans stay resolvable for subscriptions that already
    /// reference them; only new selection is blocked.
    pub async fn archive_plan(&self, plan_id: i64) -> AppResult<plans::Model> {
        let plan = self.get_plan(plan_id).await?;
        let mut am = plan.into_active_model();
        am.status = Set(PlanStatus::Archived);
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(&self.pool).await?)
    }

    pub async fn resolve_price(
        &self,
        plan_id: i64,
        currency: &str,
        billing_period: BillingPeriod,
        at: DateTime<Utc>,
    ) -> AppResult<prices::Model> {
        let currency = currency.to_ascii_uppercase();
        if !self.currency_service.currency_exists(&currency) {
            return Err(AppError::ValidationError(format!(
                "Unknown currency '{currency}'"
            )));
        }

        // plan must exist, archived or not
        self.get_plan(plan_id).await?;

        let points = prices::Entity::find()
            .filter(prices::Column::PlanId.eq(plan_id))
            .filter(prices::Column::Currency.eq(currency))
            .filter(prices::Column::BillingPeriod.eq(billing_period))
            .all(&self.pool)
            .await?;

        select_active_price(points, at)
    }

    /// Response shape for a price point, annotated with the currency's
    /// minor-unit digits so clients can place the decimal point in
    /// `amount_cents`.
    pub fn price_response(&self, price: prices::Model) -> PricePointResponse {
        let minor_unit_digits = self
            .currency_service
            .minor_unit_precision(&price.currency)
            .unwrap_or(2);
        PricePointResponse {
            id: price.id,
            plan_id: price.plan_id,
            currency: price.currency,
            billing_period: price.billing_period,
            amount_cents: price.amount_cents,
            compare_at_cents: price.compare_at_cents,
            effective_from: price.effective_from,
            effective_until: price.effective_until,
            minor_unit_digits,
        }
    }

    /// Overlapping windows are rejected, not merged; end the prior window
    /// first (two-step update) to change a price.
    pub async fn schedule_price(
        &self,
        plan_id: i64,
        req: SchedulePriceRequest,
    ) -> AppResult<prices::Model> {
        let currency = req.currency.to_ascii_uppercase();
        if !self.currency_service.currency_exists(&currency) {
            return Err(AppError::ValidationError(format!(
                "Unknown currency '{currency}'"
            )));
        }
        if req.amount_cents < 0 {
            return Err(AppError::ValidationError(
                "Price amount must not be negative".into(),
            ));
        }
        if let (Some(from), Some(until)) = (req.effective_from, req.effective_until)
            && until <= from
        {
            return Err(AppError::ValidationError(
                "effective_until must be after effective_from".into(),
            ));
        }

        let plan = self.get_plan(plan_id).await?;
        if !plan.allows_period(req.billing_period) {
            return Err(AppError::ValidationError(format!(
                "Plan '{}' does not allow {} billing",
                plan.slug, req.billing_period
            )));
        }

        let existing = prices::Entity::find()
            .filter(prices::Column::PlanId.eq(plan_id))
            .filter(prices::Column::Currency.eq(currency.clone()))
            .filter(prices::Column::BillingPeriod.eq(req.billing_period))
            .all(&self.pool)
            .await?;

        for point in &existing {
            if windows_overlap(
                req.effective_from,
                req.effective_until,
                point.effective_from,
                point.effective_until,
            ) {
                return Err(AppError::ValidationError(format!(
                    "Price window overlaps existing price point {}",
                    point.id
                )));
            }
        }

        let model = prices::ActiveModel {
            plan_id: Set(plan_id),
            currency: Set(currency),
            billing_period: Set(req.billing_period),
            amount_cents: Set(req.amount_cents),
            compare_at_cents: Set(req.compare_at_cents),
            effective_from: Set(req.effective_from),
            effective_until: Set(req.effective_until),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(model)
    }

    /// Step one of the two-step price change: close the current window.
    pub async fn end_price(
        &self,
        price_point_id: i64,
        at: DateTime<Utc>,
    ) -> AppResult<prices::Model> {
        let point = prices::Entity::find_by_id(price_point_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Price point {price_point_id} not found")))?;

        if let Some(from) = point.effective_from
            && at <= from
        {
            return Err(AppError::ValidationError(
                "Cannot end a price before it becomes effective".into(),
            ));
        }
        if let Some(until) = point.effective_until
            && until <= at
        {
            return Err(AppError::ValidationError(
                "Price point already ends earlier".into(),
            ));
        }

        let mut am = point.into_active_model();
        am.effective_until = Set(Some(at));
        am.updated_at = Set(Some(Utc::now()));
        Ok(am.update(&self.pool).await?)
    }

    /// Upsert: one limit row per (plan, resource).
    pub async fn attach_limit(
        &self,
        plan_id: i64,
        req: AttachLimitRequest,
    ) -> AppResult<limits::Model> {
        if req.resource_key.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Resource key must not be empty".into(),
            ));
        }
        if let Some(quota) = req.quota
            && quota < 0
        {
            return Err(AppError::ValidationError("Quota must not be negative".into()));
        }

        self.get_plan(plan_id).await?;
        let reset_period = req.reset_period.unwrap_or(QuotaResetPeriod::BillingCycle);

        let existing = limits::Entity::find()
            .filter(limits::Column::PlanId.eq(plan_id))
            .filter(limits::Column::ResourceKey.eq(req.resource_key.clone()))
            .one(&self.pool)
            .await?;

        let model = match existing {
            Some(limit) => {
                let mut am = limit.into_active_model();
                am.quota = Set(req.quota);
                am.reset_period = Set(reset_period);
                am.updated_at = Set(Some(Utc::now()));
                am.update(&self.pool).await?
            }
            None => {
                limits::ActiveModel {
                    plan_id: Set(plan_id),
                    resource_key: Set(req.resource_key),
                    quota: Set(req.quota),
                    reset_period: Set(reset_period),
                    ..Default::default()
                }
                .insert(&self.pool)
                .await?
            }
        };

        Ok(model)
    }

    /// No row means the plan places no limit on the resource.
    pub async fn get_limit(
        &self,
        plan_id: i64,
        resource_key: &str,
    ) -> AppResult<Option<limits::Model>> {
        let limit = limits::Entity::find()
            .filter(limits::Column::PlanId.eq(plan_id))
            .filter(limits::Column::ResourceKey.eq(resource_key))
            .one(&self.pool)
            .await?;
        Ok(limit)
    }

    pub async fn list_limits(&self, plan_id: i64) -> AppResult<Vec<limits::Model>> {
        self.get_plan(plan_id).await?;
        let rows = limits::Entity::find()
            .filter(limits::Column::PlanId.eq(plan_id))
            .order_by_asc(limits::Column::ResourceKey)
            .all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::BillingPeriod;
    use chrono::{Duration, TimeZone};

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn point(
        id: i64,
        amount: i64,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> prices::Model {
        prices::Model {
            id,
            plan_id: 1,
            currency: "USD".into(),
            billing_period: BillingPeriod::Monthly,
            amount_cents: amount,
            compare_at_cents: None,
            effective_from: from,
            effective_until: until,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_select_windowed_price() {
        let points = vec![
            point(1, 2000, None, None),
            point(2, 1500, Some(ts(0)), Some(ts(10))),
        ];
        let picked = select_active_price(points, ts(5)).unwrap();
        assert_eq!(picked.id, 2);
    }

    #[test]
    fn test_window_is_half_open() {
        let points = vec![point(2, 1500, Some(ts(0)), Some(ts(10)))];
        // at == until is already outside the window
        assert!(matches!(
            select_active_price(points, ts(10)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_falls_back_to_unbounded() {
        let points = vec![
            point(1, 2000, None, None),
            point(2, 1500, Some(ts(0)), Some(ts(10))),
        ];
        let picked = select_active_price(points, ts(20)).unwrap();
        assert_eq!(picked.id, 1);
    }

    #[test]
    fn test_no_active_price_is_not_found() {
        let points = vec![point(2, 1500, Some(ts(0)), Some(ts(10)))];
        assert!(matches!(
            select_active_price(points, ts(20)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_two_unbounded_points_are_ambiguous() {
        let points = vec![point(1, 2000, None, None), point(2, 1500, None, None)];
        assert!(matches!(
            select_active_price(points, ts(5)),
            Err(AppError::AmbiguousPrice(_))
        ));
    }

    #[test]
    fn test_resolution_is_stable_between_calls() {
        let points = vec![
            point(1, 2000, None, None),
            point(2, 1500, Some(ts(0)), Some(ts(10))),
        ];
        let first = select_active_price(points.clone(), ts(5)).unwrap();
        let second = select_active_price(points, ts(5)).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_price_response_carries_minor_unit_digits() {
        let svc = PriceCatalogService::new(DatabaseConnection::default(), CurrencyService::new());
        let mut p = point(1, 2000, None, None);
        assert_eq!(svc.price_response(p.clone()).minor_unit_digits, 2);
        p.currency = "JPY".into();
        assert_eq!(svc.price_response(p).minor_unit_digits, 0);
    }

    #[test]
    fn test_overlap_detection() {
        // disjoint half-open windows sharing a boundary do not overlap
        assert!(!windows_overlap(
            Some(ts(0)),
            Some(ts(10)),
            Some(ts(10)),
            Some(ts(20))
        ));
        assert!(windows_overlap(
            Some(ts(0)),
            Some(ts(10)),
            Some(ts(5)),
            Some(ts(20))
        ));
        // unbounded tail overlaps any later window
        assert!(windows_overlap(Some(ts(0)), None, Some(ts(100)), None));
        // fully unbounded overlaps everything
        assert!(windows_overlap(None, None, Some(ts(5)), Some(ts(6))));
        // bounded window entirely before an open-ended one
        assert!(!windows_overlap(Some(ts(0)), Some(ts(5)), Some(ts(5)), None));
    }
}
