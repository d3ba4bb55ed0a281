use crate::entities::{
    QuotaResetPeriod, subscription_entity as subscriptions, usage_record_entity as usage,
};
use crate::error::{AppError, AppResult};
use crate::models::{QuotaResponse, RecordUsageRequest, UsageResponse};
use crate::services::PriceCatalogService;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

enum QuotaDecision {
    Allowed { remaining: Option<i64> },
    Exceeded { remaining: i64 },
}

/// `quota` of None means unlimited. `remaining` reports headroom before
/// the requested `additional` quantity is applied.
fn evaluate_quota(quota: Option<i64>, used: i64, additional: i64) -> QuotaDecision {
    match quota {
        None => QuotaDecision::Allowed { remaining: None },
        Some(quota) => {
            let remaining = (quota - used).max(0);
            if used + additional > quota {
                QuotaDecision::Exceeded { remaining }
            } else {
                QuotaDecision::Allowed {
                    remaining: Some(remaining),
                }
            }
        }
    }
}

/// Whether a stored record counts toward the given window. Billing-cycle
/// windows match on the period the record was stamped with, not on
/// `recorded_at`: resume shifts the live period bounds forward, and usage
/// metered before the pause must keep counting against the same cycle.
/// Daily windows match on `recorded_at` since records carry no day stamp.
fn record_in_window(
    record: &usage::Model,
    reset_period: QuotaResetPeriod,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> bool {
    match reset_period {
        QuotaResetPeriod::BillingCycle => {
            record.period_end > window_start && record.period_start < window_end
        }
        QuotaResetPeriod::Daily => {
            record.recorded_at >= window_start && record.recorded_at < window_end
        }
    }
}

#[derive(Clone)]
pub struct UsageMeterService {
    pool: DatabaseConnection,
    catalog_service: PriceCatalogService,
}

impl UsageMeterService {
    pub fn new(pool: DatabaseConnection, catalog_service: PriceCatalogService) -> Self {
        Self {
            pool,
            catalog_service,
        }
    }

    async fn load_subscription(&self, subscription_id: i64) -> AppResult<subscriptions::Model> {
        subscriptions::Entity::find_by_id(subscription_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subscription {subscription_id} not found")))
    }

    /// The measurement window for a resource on this subscription. Daily
    /// quotas reset at UTC midnight; everything else follows the billing
    /// cycle.
    fn usage_window(
        subscription: &subscriptions::Model,
        reset_period: QuotaResetPeriod,
        at: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        match reset_period {
            QuotaResetPeriod::BillingCycle => (
                subscription.current_period_start,
                subscription.current_period_end,
            ),
            QuotaResetPeriod::Daily => {
                let day_start = at
                    .date_naive()
                    .and_hms_opt(0, 0, 0)
                    .unwrap_or_default()
                    .and_utc();
                (day_start, day_start + Duration::days(1))
            }
        }
    }

    async fn sum_usage(
        &self,
        subscription_id: i64,
        resource_key: &str,
        reset_period: QuotaResetPeriod,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> AppResult<i64> {
        let rows = usage::Entity::find()
            .filter(usage::Column::SubscriptionId.eq(subscription_id))
            .filter(usage::Column::ResourceKey.eq(resource_key))
            .all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .filter(|r| record_in_window(r, reset_period, window_start, window_end))
            .map(|r| r.quantity)
            .sum())
    }

    /// Append a usage event. Never rejects for being over quota; metering
    /// is deliberately decoupled from enforcement.
    pub async fn record_usage(
        &self,
        subscription_id: i64,
        req: &RecordUsageRequest,
    ) -> AppResult<usage::Model> {
        if req.quantity < 0 {
            return Err(AppError::ValidationError(
                "Usage quantity must not be negative".into(),
            ));
        }
        if req.resource_key.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Resource key must not be empty".into(),
            ));
        }

        let subscription = self.load_subscription(subscription_id).await?;
        if subscription.status.is_terminal() {
            return Err(AppError::ValidationError(format!(
                "Subscription {subscription_id} is {}",
                subscription.status
            )));
        }

        let at = req.at.unwrap_or_else(Utc::now);
        if at < subscription.current_period_start || at >= subscription.current_period_end {
            return Err(AppError::ValidationError(
                "Usage timestamp falls outside the current billing period".into(),
            ));
        }

        let record = usage::ActiveModel {
            subscription_id: Set(subscription_id),
            resource_key: Set(req.resource_key.clone()),
            quantity: Set(req.quantity),
            period_start: Set(subscription.current_period_start),
            period_end: Set(subscription.current_period_end),
            recorded_at: Set(at),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn current_usage(
        &self,
        subscription_id: i64,
        resource_key: &str,
        at: DateTime<Utc>,
    ) -> AppResult<UsageResponse> {
        let subscription = self.load_subscription(subscription_id).await?;

        let limit = self
            .catalog_service
            .get_limit(subscription.plan_id, resource_key)
            .await?;
        let reset_period = limit
            .map(|l| l.reset_period)
            .unwrap_or(QuotaResetPeriod::BillingCycle);

        let (start, end) = Self::usage_window(&subscription, reset_period, at);
        let used = self
            .sum_usage(subscription_id, resource_key, reset_period, start, end)
            .await?;

        Ok(UsageResponse {
            subscription_id,
            resource_key: resource_key.to_string(),
            used,
            period_start: start,
            period_end: end,
        })
    }

    /// Advisory check; a concurrent recorder can still push usage over
    /// the line between this call and the subsequent record.
    pub async fn check_quota(
        &self,
        subscription_id: i64,
        resource_key: &str,
        additional: i64,
        at: DateTime<Utc>,
    ) -> AppResult<QuotaResponse> {
        if additional < 0 {
            return Err(AppError::ValidationError(
                "Additional quantity must not be negative".into(),
            ));
        }

        let subscription = self.load_subscription(subscription_id).await?;
        let limit = self
            .catalog_service
            .get_limit(subscription.plan_id, resource_key)
            .await?;

        let (quota, reset_period) = match &limit {
            Some(limit) => (limit.quota, limit.reset_period),
            None => (None, QuotaResetPeriod::BillingCycle),
        };

        let (start, end) = Self::usage_window(&subscription, reset_period, at);
        let used = self
            .sum_usage(subscription_id, resource_key, reset_period, start, end)
            .await?;

        match evaluate_quota(quota, used, additional) {
            QuotaDecision::Allowed { remaining } => Ok(QuotaResponse {
                allowed: true,
                used,
                quota,
                remaining,
            }),
            QuotaDecision::Exceeded { remaining } => Err(AppError::QuotaExceeded { remaining }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_resource_always_allowed() {
        assert!(matches!(
            evaluate_quota(None, 1_000_000, 1_000_000),
            QuotaDecision::Allowed { remaining: None }
        ));
    }

    #[test]
    fn test_within_quota() {
        // 950 of 1000 used, asking for 30 more
        match evaluate_quota(Some(1000), 950, 30) {
            QuotaDecision::Allowed { remaining } => assert_eq!(remaining, Some(50)),
            QuotaDecision::Exceeded { .. } => panic!("should be allowed"),
        }
    }

    #[test]
    fn test_over_quota_reports_remaining() {
        // 950 of 1000 used, asking for 100 more
        match evaluate_quota(Some(1000), 950, 100) {
            QuotaDecision::Exceeded { remaining } => assert_eq!(remaining, 50),
            QuotaDecision::Allowed { .. } => panic!("should be rejected"),
        }
    }

    #[test]
    fn test_exactly_at_quota_is_allowed() {
        assert!(matches!(
            evaluate_quota(Some(1000), 950, 50),
            QuotaDecision::Allowed { remaining: Some(50) }
        ));
    }

    #[test]
    fn test_already_over_quota_clamps_remaining() {
        // backdated records can push usage past the quota
        match evaluate_quota(Some(1000), 1100, 1) {
            QuotaDecision::Exceeded { remaining } => assert_eq!(remaining, 0),
            QuotaDecision::Allowed { .. } => panic!("should be rejected"),
        }
    }

    #[test]
    fn test_zero_additional_reports_current_state() {
        assert!(matches!(
            evaluate_quota(Some(1000), 1000, 0),
            QuotaDecision::Allowed { remaining: Some(0) }
        ));
    }

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn record(
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> usage::Model {
        usage::Model {
            id: 1,
            subscription_id: 1,
            resource_key: "api_calls".into(),
            quantity: 500,
            period_start,
            period_end,
            recorded_at,
        }
    }

    #[test]
    fn test_cycle_record_survives_pause_shift() {
        // Period Jan 1 - Jan 31, usage on Jan 5, paused Jan 10. Resume on
        // Jan 20 shifts the period to Jan 11 - Feb 10; the record still
        // counts against that cycle.
        let r = record(ts(2025, 1, 1), ts(2025, 1, 31), ts(2025, 1, 5));
        assert!(record_in_window(
            &r,
            QuotaResetPeriod::BillingCycle,
            ts(2025, 1, 11),
            ts(2025, 2, 10),
        ));
    }

    #[test]
    fn test_prior_cycle_record_excluded() {
        // Half-open windows: a record stamped with the previous period,
        // ending exactly where this one starts, does not carry over.
        let r = record(ts(2024, 12, 2), ts(2025, 1, 1), ts(2024, 12, 20));
        assert!(!record_in_window(
            &r,
            QuotaResetPeriod::BillingCycle,
            ts(2025, 1, 1),
            ts(2025, 1, 31),
        ));
    }

    #[test]
    fn test_daily_window_matches_on_recorded_at() {
        let r = record(ts(2025, 1, 1), ts(2025, 1, 31), ts(2025, 1, 5));
        assert!(record_in_window(
            &r,
            QuotaResetPeriod::Daily,
            ts(2025, 1, 5),
            ts(2025, 1, 6),
        ));
        assert!(!record_in_window(
            &r,
            QuotaResetPeriod::Daily,
            ts(2025, 1, 6),
            ts(2025, 1, 7),
        ));
    }
}
