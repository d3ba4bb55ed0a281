use crate::config::BillingConfig;
use crate::entities::{
    DiscountType, PlanKind, SubscriptionStatus, subscription_entity as subscriptions,
};
use crate::error::{AppError, AppResult};
use crate::external::{CurrencyService, PaymentGateway};
use crate::models::{
    CancelSubscriptionRequest, ChangePlanRequest, CreateSubscriptionRequest,
    PaginatedResponse, PaginationParams, PauseSubscriptionRequest, SubscriptionQuery,
    SubscriptionResponse, SweepResponse,
};
use crate::services::{CouponService, PriceCatalogService};
use crate::utils::{discount_amount, proration_credit, prorated_charge};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Metadata key holding a coupon discount earned at signup but not yet
/// applied, because the first real charge happens at trial conversion.
const PENDING_DISCOUNT_KEY: &str = "pending_discount_cents";

/// Metadata key for a coupon that is not first-payment-only. Its terms are
/// kept on the subscription and re-applied to every period charge.
const RECURRING_DISCOUNT_KEY: &str = "recurring_discount";

/// What `advance` should do to a subscription at `now`. Pure so the
/// transition table can be exercised without a database.
#[derive(Debug, PartialEq, Eq)]
enum AdvanceOutcome {
    NotDue,
    CancelAtPeriodEnd,
    ConvertTrial,
    Renew,
    ExpirePastDue,
}

fn advance_outcome(
    sub: &subscriptions::Model,
    now: DateTime<Utc>,
    grace: Duration,
) -> AdvanceOutcome {
    if sub.status.is_terminal()
        || sub.status == SubscriptionStatus::Paused
        || sub.status == SubscriptionStatus::Pending
    {
        return AdvanceOutcome::NotDue;
    }
    if sub.current_period_end > now {
        return AdvanceOutcome::NotDue;
    }
    if sub.cancel_at_period_end {
        return AdvanceOutcome::CancelAtPeriodEnd;
    }
    match sub.status {
        SubscriptionStatus::Trial => AdvanceOutcome::ConvertTrial,
        SubscriptionStatus::Active => AdvanceOutcome::Renew,
        SubscriptionStatus::PastDue => {
            if now >= sub.current_period_end + grace {
                AdvanceOutcome::ExpirePastDue
            } else {
                AdvanceOutcome::NotDue
            }
        }
        _ => AdvanceOutcome::NotDue,
    }
}

fn pending_discount(sub: &subscriptions::Model) -> i64 {
    sub.metadata
        .as_ref()
        .and_then(|m| m.get(PENDING_DISCOUNT_KEY))
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

fn recurring_discount(sub: &subscriptions::Model) -> Option<(DiscountType, i64)> {
    let entry = sub.metadata.as_ref()?.get(RECURRING_DISCOUNT_KEY)?;
    let discount_type = serde_json::from_value(entry.get("discount_type")?.clone()).ok()?;
    let value = entry.get("value")?.as_i64()?;
    Some((discount_type, value))
}

/// Charge for a fresh period at the boundary: list price, minus a recurring
/// coupon's discount recomputed against it, minus any signup discount that
/// was deferred past a trial. Never negative.
fn period_charge(
    sub: &subscriptions::Model,
    list_price_cents: i64,
    converting_trial: bool,
) -> i64 {
    let mut charge = list_price_cents;
    if let Some((discount_type, value)) = recurring_discount(sub) {
        charge -= discount_amount(list_price_cents, discount_type, value);
    }
    if converting_trial {
        charge -= pending_discount(sub);
    }
    charge.max(0)
}

/// Only a running subscription can be marked to lapse at the boundary;
/// past_due rows must first settle via payment-result.
fn can_cancel_at_period_end(status: SubscriptionStatus) -> bool {
    matches!(
        status,
        SubscriptionStatus::Active | SubscriptionStatus::Trial | SubscriptionStatus::Paused
    )
}

#[derive(Clone)]
pub struct SubscriptionService {
    pool: DatabaseConnection,
    catalog_service: PriceCatalogService,
    coupon_service: CouponService,
    currency_service: CurrencyService,
    payment_gateway: PaymentGateway,
    billing: BillingConfig,
}

impl SubscriptionService {
    pub fn new(
        pool: DatabaseConnection,
        catalog_service: PriceCatalogService,
        coupon_service: CouponService,
        currency_service: CurrencyService,
        payment_gateway: PaymentGateway,
        billing: BillingConfig,
    ) -> Self {
        Self {
            pool,
            catalog_service,
            coupon_service,
            currency_service,
            payment_gateway,
            billing,
        }
    }

    async fn load(&self, subscription_id: i64) -> AppResult<subscriptions::Model> {
        subscriptions::Entity::find_by_id(subscription_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Subscription {subscription_id} not found")))
    }

    async fn load_owned(
        &self,
        subscription_id: i64,
        user_id: i64,
    ) -> AppResult<subscriptions::Model> {
        let sub = self.load(subscription_id).await?;
        if sub.user_id != user_id {
            // do not leak existence of other users' subscriptions
            return Err(AppError::NotFound(format!(
                "Subscription {subscription_id} not found"
            )));
        }
        Ok(sub)
    }

    /// Version-guarded write. Loses to any concurrent writer that bumped
    /// the version first.
    async fn commit_with_version(
        &self,
        subscription_id: i64,
        expected_version: i32,
        mut am: subscriptions::ActiveModel,
    ) -> AppResult<()> {
        am.version = Set(expected_version + 1);
        am.updated_at = Set(Some(Utc::now()));
        let result = subscriptions::Entity::update_many()
            .set(am)
            .filter(subscriptions::Column::Id.eq(subscription_id))
            .filter(subscriptions::Column::Version.eq(expected_version))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::ConcurrencyConflict);
        }
        Ok(())
    }

    /// Load-check-write with retries. The closure sees the current row and
    /// returns the fields to change, or None for a no-op.
    async fn mutate<F>(&self, subscription_id: i64, mut build: F) -> AppResult<subscriptions::Model>
    where
        F: FnMut(&subscriptions::Model) -> AppResult<Option<subscriptions::ActiveModel>>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let sub = self.load(subscription_id).await?;
            let Some(am) = build(&sub)? else {
                return Ok(sub);
            };
            match self.commit_with_version(sub.id, sub.version, am).await {
                Ok(()) => return self.load(subscription_id).await,
                Err(AppError::ConcurrencyConflict) if attempt < MAX_UPDATE_ATTEMPTS => {
                    log::debug!(
                        "Version conflict on subscription {subscription_id}, attempt {attempt}"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::ConcurrencyConflict)
    }

    fn spawn_charge(&self, subscription_id: i64, amount_cents: i64, currency: String) {
        if amount_cents <= 0 {
            return;
        }
        let gateway = self.payment_gateway.clone();
        tokio::spawn(async move {
            match gateway.charge(subscription_id, amount_cents, &currency).await {
                Ok(receipt) => log::info!(
                    "Charged {amount_cents} for subscription {subscription_id}, receipt {}",
                    receipt.id
                ),
                Err(e) => {
                    // the provider reports the definitive outcome via the
                    // payment-result endpoint; this is just telemetry
                    log::error!("Charge failed for subscription {subscription_id}: {e}");
                }
            }
        });
    }

    pub async fn create_subscription(
        &self,
        user_id: i64,
        req: &CreateSubscriptionRequest,
    ) -> AppResult<(subscriptions::Model, i64, i64, Option<i64>)> {
        let at = req.at.unwrap_or_else(Utc::now);
        let currency = req.currency.to_ascii_uppercase();
        if !self.currency_service.currency_exists(&currency) {
            return Err(AppError::ValidationError(format!(
                "Unknown currency '{currency}'"
            )));
        }

        let plan = self.catalog_service.get_plan(req.plan_id).await?;
        if !plan.is_selectable() {
            return Err(AppError::ValidationError(format!(
                "Plan '{}' is not available",
                plan.slug
            )));
        }
        if plan.kind == PlanKind::OneTime {
            return Err(AppError::ValidationError(
                "One-time plans cannot be subscribed to".into(),
            ));
        }
        if !plan.allows_period(req.billing_period) {
            return Err(AppError::ValidationError(format!(
                "Plan '{}' does not allow {} billing",
                plan.slug, req.billing_period
            )));
        }

        let price = self
            .catalog_service
            .resolve_price(plan.id, &currency, req.billing_period, at)
            .await?;

        let trial = plan.trial_days > 0;
        let (status, trial_ends_at, period_end) = if trial {
            let trial_end = at + Duration::days(plan.trial_days as i64);
            (SubscriptionStatus::Trial, Some(trial_end), trial_end)
        } else {
            (
                SubscriptionStatus::Active,
                None,
                at + req.billing_period.length(),
            )
        };

        let txn = self.pool.begin().await?;

        let mut am = subscriptions::ActiveModel {
            user_id: Set(user_id),
            plan_id: Set(plan.id),
            billing_period: Set(req.billing_period),
            currency: Set(currency.clone()),
            status: Set(status),
            trial_ends_at: Set(trial_ends_at),
            current_period_start: Set(at),
            current_period_end: Set(period_end),
            cancel_at_period_end: Set(false),
            version: Set(0),
            ..Default::default()
        };

        let mut discount_applied = 0i64;
        let mut redemption_id = None;

        if let Some(code) = &req.coupon_code {
            // validate first so an invalid coupon fails before any row exists
            let coupon = self
                .coupon_service
                .validate_coupon(user_id, code, plan.id, req.billing_period, at)
                .await?;
            discount_applied = discount_amount(price.amount_cents, coupon.discount_type, coupon.value);
            let mut meta = serde_json::Map::new();
            if coupon.first_payment_only {
                if trial {
                    // the first real charge happens at conversion
                    meta.insert(PENDING_DISCOUNT_KEY.into(), discount_applied.into());
                }
            } else {
                // recurring terms are recomputed against each period's price
                meta.insert(
                    RECURRING_DISCOUNT_KEY.into(),
                    serde_json::json!({
                        "discount_type": coupon.discount_type,
                        "value": coupon.value,
                    }),
                );
            }
            if !meta.is_empty() {
                am.metadata = Set(Some(serde_json::Value::Object(meta)));
            }
        }

        let sub = am.insert(&txn).await?;

        if let Some(code) = &req.coupon_code {
            let (_, redemption) = self
                .coupon_service
                .redeem_in_txn(
                    &txn,
                    user_id,
                    code,
                    plan.id,
                    req.billing_period,
                    Some(sub.id),
                    at,
                )
                .await?;
            redemption_id = Some(redemption.id);
        }

        txn.commit().await?;

        let first_charge = if trial {
            0
        } else {
            calculate_discount_first_charge(price.amount_cents, discount_applied)
        };

        log::info!(
            "Subscription {} created for user {user_id} on plan '{}' ({status})",
            sub.id,
            plan.slug
        );
        self.spawn_charge(sub.id, first_charge, currency);

        Ok((sub, first_charge, discount_applied, redemption_id))
    }

    pub async fn get_subscription(
        &self,
        user_id: i64,
        subscription_id: i64,
    ) -> AppResult<subscriptions::Model> {
        self.load_owned(subscription_id, user_id).await
    }

    pub async fn list_subscriptions(
        &self,
        user_id: i64,
        query: &SubscriptionQuery,
    ) -> AppResult<PaginatedResponse<SubscriptionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query =
            subscriptions::Entity::find().filter(subscriptions::Column::UserId.eq(user_id));
        if let Some(status) = query.status {
            base_query = base_query.filter(subscriptions::Column::Status.eq(status));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;

        let rows = base_query
            .order_by_desc(subscriptions::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let items: Vec<SubscriptionResponse> = rows.into_iter().map(Into::into).collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_per_page(),
            total,
        ))
    }

    /// Immediate change prorates the unused remainder of the current
    /// period against the new plan's price and restarts the period at
    /// `at`. A scheduled change only records intent; `advance` applies it
    /// at the period boundary.
    pub async fn change_plan(
        &self,
        user_id: i64,
        subscription_id: i64,
        req: &ChangePlanRequest,
    ) -> AppResult<(subscriptions::Model, i64, i64)> {
        let at = req.at.unwrap_or_else(Utc::now);

        let plan = self.catalog_service.get_plan(req.plan_id).await?;
        if !plan.is_selectable() {
            return Err(AppError::ValidationError(format!(
                "Plan '{}' is not available",
                plan.slug
            )));
        }
        if plan.kind == PlanKind::OneTime {
            return Err(AppError::ValidationError(
                "One-time plans cannot be subscribed to".into(),
            ));
        }

        if req.scheduled {
            let sub = self.mutate(subscription_id, |sub| {
                if sub.user_id != user_id {
                    return Err(AppError::NotFound(format!(
                        "Subscription {subscription_id} not found"
                    )));
                }
                if !matches!(
                    sub.status,
                    SubscriptionStatus::Trial
                        | SubscriptionStatus::Active
                        | SubscriptionStatus::Paused
                ) {
                    return Err(AppError::InvalidTransition(format!(
                        "Cannot schedule a plan change while {}",
                        sub.status
                    )));
                }
                if !plan.allows_period(sub.billing_period) {
                    return Err(AppError::ValidationError(format!(
                        "Plan '{}' does not allow {} billing",
                        plan.slug, sub.billing_period
                    )));
                }
                let mut am = sub.clone().into_active_model();
                am.pending_plan_id = Set(Some(plan.id));
                am.pending_effective_at = Set(Some(sub.current_period_end));
                Ok(Some(am))
            })
            .await?;
            return Ok((sub, 0, 0));
        }

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let sub = self.load_owned(subscription_id, user_id).await?;

            if !matches!(
                sub.status,
                SubscriptionStatus::Trial | SubscriptionStatus::Active
            ) {
                return Err(AppError::InvalidTransition(format!(
                    "Cannot change plan while {}",
                    sub.status
                )));
            }
            if !plan.allows_period(sub.billing_period) {
                return Err(AppError::ValidationError(format!(
                    "Plan '{}' does not allow {} billing",
                    plan.slug, sub.billing_period
                )));
            }

            let new_price = self
                .catalog_service
                .resolve_price(plan.id, &sub.currency, sub.billing_period, at)
                .await?;

            let mut am = sub.clone().into_active_model();
            am.plan_id = Set(plan.id);
            am.pending_plan_id = Set(None);
            am.pending_effective_at = Set(None);

            let (credit, charge) = if sub.status == SubscriptionStatus::Trial {
                // nothing paid yet, just swap the plan under the trial
                (0, 0)
            } else {
                let old_price = self
                    .catalog_service
                    .resolve_price(sub.plan_id, &sub.currency, sub.billing_period, at)
                    .await?;
                let credit = proration_credit(
                    sub.current_period_start,
                    sub.current_period_end,
                    at,
                    old_price.amount_cents,
                );
                let charge = prorated_charge(new_price.amount_cents, credit);
                am.current_period_start = Set(at);
                am.current_period_end = Set(at + sub.billing_period.length());
                (credit, charge)
            };

            match self.commit_with_version(sub.id, sub.version, am).await {
                Ok(()) => {
                    log::info!(
                        "Subscription {} moved to plan '{}' (credit {credit}, charge {charge})",
                        sub.id,
                        plan.slug
                    );
                    self.spawn_charge(sub.id, charge, sub.currency.clone());
                    let updated = self.load(subscription_id).await?;
                    return Ok((updated, credit, charge));
                }
                Err(AppError::ConcurrencyConflict) if attempt < MAX_UPDATE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }
        Err(AppError::ConcurrencyConflict)
    }

    pub async fn pause_subscription(
        &self,
        user_id: i64,
        subscription_id: i64,
        req: &PauseSubscriptionRequest,
    ) -> AppResult<subscriptions::Model> {
        let at = req.at.unwrap_or_else(Utc::now);
        if let Some(resume_at) = req.resume_at
            && resume_at <= at
        {
            return Err(AppError::ValidationError(
                "resume_at must be in the future".into(),
            ));
        }

        self.mutate(subscription_id, |sub| {
            if sub.user_id != user_id {
                return Err(AppError::NotFound(format!(
                    "Subscription {subscription_id} not found"
                )));
            }
            if !matches!(
                sub.status,
                SubscriptionStatus::Trial | SubscriptionStatus::Active
            ) {
                return Err(AppError::InvalidTransition(format!(
                    "Cannot pause a {} subscription",
                    sub.status
                )));
            }
            let mut am = sub.clone().into_active_model();
            am.status = Set(SubscriptionStatus::Paused);
            am.paused_at = Set(Some(at));
            am.resume_at = Set(req.resume_at);
            Ok(Some(am))
        })
        .await
    }

    /// The clock stops while paused: every future-facing timestamp is
    /// shifted forward by the paused duration, so no billable time is lost.
    pub async fn resume_subscription(
        &self,
        user_id: i64,
        subscription_id: i64,
        at: DateTime<Utc>,
    ) -> AppResult<subscriptions::Model> {
        self.mutate(subscription_id, |sub| {
            if sub.user_id != user_id {
                return Err(AppError::NotFound(format!(
                    "Subscription {subscription_id} not found"
                )));
            }
            if sub.status != SubscriptionStatus::Paused {
                return Err(AppError::InvalidTransition(format!(
                    "Cannot resume a {} subscription",
                    sub.status
                )));
            }
            let paused_at = sub.paused_at.unwrap_or(at);
            let shift = (at - paused_at).max(Duration::zero());

            let mut am = sub.clone().into_active_model();
            am.status = Set(SubscriptionStatus::Active);
            am.current_period_start = Set(sub.current_period_start + shift);
            am.current_period_end = Set(sub.current_period_end + shift);
            am.trial_ends_at = Set(sub.trial_ends_at.map(|t| t + shift));
            am.pending_effective_at = Set(sub.pending_effective_at.map(|t| t + shift));
            am.paused_at = Set(None);
            am.resume_at = Set(None);
            Ok(Some(am))
        })
        .await
    }

    pub async fn cancel_subscription(
        &self,
        user_id: i64,
        subscription_id: i64,
        req: &CancelSubscriptionRequest,
    ) -> AppResult<subscriptions::Model> {
        let at = req.at.unwrap_or_else(Utc::now);

        self.mutate(subscription_id, |sub| {
            if sub.user_id != user_id {
                return Err(AppError::NotFound(format!(
                    "Subscription {subscription_id} not found"
                )));
            }
            if sub.status.is_terminal() {
                return Err(AppError::InvalidTransition(format!(
                    "Subscription is already {}",
                    sub.status
                )));
            }
            let mut am = sub.clone().into_active_model();
            if req.at_period_end {
                if !can_cancel_at_period_end(sub.status) {
                    return Err(AppError::InvalidTransition(format!(
                        "Cannot schedule cancellation while {}",
                        sub.status
                    )));
                }
                if sub.cancel_at_period_end {
                    return Ok(None);
                }
                am.cancel_at_period_end = Set(true);
            } else {
                am.status = Set(SubscriptionStatus::Cancelled);
                am.ends_at = Set(Some(at));
            }
            Ok(Some(am))
        })
        .await
    }

    /// Move a subscription across its period boundary if it is due.
    /// Safe to call repeatedly: a subscription that is not due is left
    /// untouched, and concurrent advances race on the version column.
    pub async fn advance(
        &self,
        subscription_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<(subscriptions::Model, bool)> {
        let grace = Duration::days(self.billing.past_due_grace_days);

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let sub = self.load(subscription_id).await?;

            let outcome = advance_outcome(&sub, now, grace);
            if outcome == AdvanceOutcome::NotDue {
                return Ok((sub, false));
            }

            let mut am = sub.clone().into_active_model();
            let mut charge = 0i64;

            match outcome {
                AdvanceOutcome::CancelAtPeriodEnd => {
                    am.status = Set(SubscriptionStatus::Cancelled);
                    am.ends_at = Set(Some(sub.current_period_end));
                }
                AdvanceOutcome::ExpirePastDue => {
                    am.status = Set(SubscriptionStatus::Expired);
                    am.ends_at = Set(Some(now));
                }
                AdvanceOutcome::ConvertTrial | AdvanceOutcome::Renew => {
                    // a due scheduled downgrade takes effect at this boundary
                    let plan_id = match (sub.pending_plan_id, sub.pending_effective_at) {
                        (Some(pending), Some(effective)) if effective <= now => {
                            am.pending_plan_id = Set(None);
                            am.pending_effective_at = Set(None);
                            pending
                        }
                        _ => sub.plan_id,
                    };
                    am.plan_id = Set(plan_id);

                    let price = self
                        .catalog_service
                        .resolve_price(plan_id, &sub.currency, sub.billing_period, now)
                        .await?;

                    let start = sub.current_period_end;
                    am.status = Set(SubscriptionStatus::Active);
                    am.current_period_start = Set(start);
                    am.current_period_end = Set(start + sub.billing_period.length());

                    let converting = outcome == AdvanceOutcome::ConvertTrial;
                    charge = period_charge(&sub, price.amount_cents, converting);
                    if converting
                        && let Some(mut meta) = sub.metadata.clone()
                        && let Some(obj) = meta.as_object_mut()
                    {
                        obj.remove(PENDING_DISCOUNT_KEY);
                        am.metadata = Set(Some(meta));
                    }
                }
                AdvanceOutcome::NotDue => unreachable!(),
            }

            match self.commit_with_version(sub.id, sub.version, am).await {
                Ok(()) => {
                    log::info!(
                        "Subscription {} advanced from {} at {now}",
                        sub.id,
                        sub.status
                    );
                    self.spawn_charge(sub.id, charge, sub.currency.clone());
                    let updated = self.load(subscription_id).await?;
                    return Ok((updated, true));
                }
                Err(AppError::ConcurrencyConflict) if attempt < MAX_UPDATE_ATTEMPTS => continue,
                Err(e) => return Err(e),
            }
        }
        Err(AppError::ConcurrencyConflict)
    }

    /// Advance every due subscription. One failing row never aborts the
    /// sweep; it is logged and retried on the next run.
    pub async fn sweep_due(&self, now: DateTime<Utc>) -> AppResult<SweepResponse> {
        let due_rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::CurrentPeriodEnd.lte(now))
            .filter(
                subscriptions::Column::Status.is_in([
                    SubscriptionStatus::Trial,
                    SubscriptionStatus::Active,
                    SubscriptionStatus::PastDue,
                ]),
            )
            .order_by_asc(subscriptions::Column::CurrentPeriodEnd)
            .all(&self.pool)
            .await?;

        let due = due_rows.len() as i64;
        let mut advanced = 0i64;

        for row in due_rows {
            match self.advance(row.id, now).await {
                Ok((_, true)) => advanced += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    log::error!("Sweep failed to advance subscription {}: {e}", row.id);
                }
            }
        }

        if due > 0 {
            log::info!("Sweep at {now}: {due} due, {advanced} advanced");
        }

        Ok(SweepResponse { due, advanced })
    }

    /// Feedback from the payment provider. Success recovers a past_due
    /// subscription; failure demotes an active one. Anything else is a
    /// no-op so replayed notifications are harmless.
    pub async fn record_payment_result(
        &self,
        subscription_id: i64,
        success: bool,
    ) -> AppResult<subscriptions::Model> {
        self.mutate(subscription_id, |sub| {
            let mut am = sub.clone().into_active_model();
            match (success, sub.status) {
                (true, SubscriptionStatus::PastDue) => {
                    am.status = Set(SubscriptionStatus::Active);
                    Ok(Some(am))
                }
                (false, SubscriptionStatus::Active) => {
                    am.status = Set(SubscriptionStatus::PastDue);
                    Ok(Some(am))
                }
                _ => Ok(None),
            }
        })
        .await
    }
}

/// First charge at signup: list price minus the coupon discount, floored
/// at zero.
fn calculate_discount_first_charge(amount_cents: i64, discount_cents: i64) -> i64 {
    (amount_cents - discount_cents).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::BillingPeriod;
    use chrono::TimeZone;

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn sub(status: SubscriptionStatus) -> subscriptions::Model {
        subscriptions::Model {
            id: 1,
            user_id: 42,
            plan_id: 7,
            billing_period: BillingPeriod::Monthly,
            currency: "USD".into(),
            status,
            trial_ends_at: None,
            current_period_start: ts(0),
            current_period_end: ts(30),
            cancel_at_period_end: false,
            pending_plan_id: None,
            pending_effective_at: None,
            paused_at: None,
            resume_at: None,
            ends_at: None,
            version: 0,
            metadata: None,
            created_at: None,
            updated_at: None,
        }
    }

    const GRACE: Duration = Duration::days(7);

    #[test]
    fn test_not_due_before_period_end() {
        let s = sub(SubscriptionStatus::Active);
        assert_eq!(advance_outcome(&s, ts(29), GRACE), AdvanceOutcome::NotDue);
    }

    #[test]
    fn test_active_renews_at_period_end() {
        let s = sub(SubscriptionStatus::Active);
        assert_eq!(advance_outcome(&s, ts(30), GRACE), AdvanceOutcome::Renew);
    }

    #[test]
    fn test_trial_converts() {
        let mut s = sub(SubscriptionStatus::Trial);
        s.trial_ends_at = Some(ts(30));
        assert_eq!(
            advance_outcome(&s, ts(30), GRACE),
            AdvanceOutcome::ConvertTrial
        );
    }

    #[test]
    fn test_cancel_flag_wins_over_renewal() {
        let mut s = sub(SubscriptionStatus::Active);
        s.cancel_at_period_end = true;
        assert_eq!(
            advance_outcome(&s, ts(30), GRACE),
            AdvanceOutcome::CancelAtPeriodEnd
        );
    }

    #[test]
    fn test_paused_is_never_advanced() {
        let s = sub(SubscriptionStatus::Paused);
        assert_eq!(advance_outcome(&s, ts(100), GRACE), AdvanceOutcome::NotDue);
    }

    #[test]
    fn test_terminal_states_are_inert() {
        for status in [SubscriptionStatus::Cancelled, SubscriptionStatus::Expired] {
            let s = sub(status);
            assert_eq!(advance_outcome(&s, ts(100), GRACE), AdvanceOutcome::NotDue);
        }
    }

    #[test]
    fn test_past_due_waits_for_grace() {
        let s = sub(SubscriptionStatus::PastDue);
        assert_eq!(advance_outcome(&s, ts(33), GRACE), AdvanceOutcome::NotDue);
        assert_eq!(
            advance_outcome(&s, ts(37), GRACE),
            AdvanceOutcome::ExpirePastDue
        );
    }

    #[test]
    fn test_advance_is_idempotent_after_renewal() {
        // after a renewal the period end moves past `now`, so a second
        // advance at the same instant is a no-op
        let mut s = sub(SubscriptionStatus::Active);
        s.current_period_start = ts(30);
        s.current_period_end = ts(60);
        assert_eq!(advance_outcome(&s, ts(30), GRACE), AdvanceOutcome::NotDue);
    }

    #[test]
    fn test_pending_discount_read() {
        let mut s = sub(SubscriptionStatus::Trial);
        assert_eq!(pending_discount(&s), 0);
        s.metadata = Some(serde_json::json!({ PENDING_DISCOUNT_KEY: 500 }));
        assert_eq!(pending_discount(&s), 500);
    }

    #[test]
    fn test_first_charge_floors_at_zero() {
        assert_eq!(calculate_discount_first_charge(2000, 500), 1500);
        assert_eq!(calculate_discount_first_charge(2000, 2500), 0);
    }

    #[test]
    fn test_first_payment_only_coupon_leaves_renewals_at_list_price() {
        // no recurring entry on the subscription, so the renewal is full price
        let s = sub(SubscriptionStatus::Active);
        assert_eq!(period_charge(&s, 2000, false), 2000);
    }

    #[test]
    fn test_recurring_coupon_discounts_every_renewal() {
        let mut s = sub(SubscriptionStatus::Active);
        s.metadata = Some(serde_json::json!({
            RECURRING_DISCOUNT_KEY: { "discount_type": "percentage", "value": 50 },
        }));
        assert_eq!(period_charge(&s, 2000, false), 1000);

        s.metadata = Some(serde_json::json!({
            RECURRING_DISCOUNT_KEY: { "discount_type": "fixed_amount", "value": 300 },
        }));
        assert_eq!(period_charge(&s, 2000, false), 1700);
    }

    #[test]
    fn test_recurring_discount_parse() {
        let mut s = sub(SubscriptionStatus::Active);
        assert_eq!(recurring_discount(&s), None);
        s.metadata = Some(serde_json::json!({
            RECURRING_DISCOUNT_KEY: { "discount_type": "percentage", "value": 25 },
        }));
        assert_eq!(recurring_discount(&s), Some((DiscountType::Percentage, 25)));
    }

    #[test]
    fn test_trial_conversion_applies_deferred_signup_discount() {
        let mut s = sub(SubscriptionStatus::Trial);
        s.metadata = Some(serde_json::json!({ PENDING_DISCOUNT_KEY: 500 }));
        assert_eq!(period_charge(&s, 2000, true), 1500);
        // the deferred discount never applies past the conversion charge
        assert_eq!(period_charge(&s, 2000, false), 2000);
    }

    #[test]
    fn test_period_charge_never_negative() {
        let mut s = sub(SubscriptionStatus::Trial);
        s.metadata = Some(serde_json::json!({ PENDING_DISCOUNT_KEY: 5000 }));
        assert_eq!(period_charge(&s, 2000, true), 0);
    }

    #[test]
    fn test_cancel_at_period_end_requires_running_state() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trial,
            SubscriptionStatus::Paused,
        ] {
            assert!(can_cancel_at_period_end(status), "{status} should allow it");
        }
        for status in [
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Pending,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            assert!(!can_cancel_at_period_end(status), "{status} should refuse");
        }
    }
}
