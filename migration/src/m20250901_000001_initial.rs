use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Plans {
    Table,
    Id,
    Slug,
    Kind,
    TrialDays,
    Status,
    BillingPeriods,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PricePoints {
    Table,
    Id,
    PlanId,
    Currency,
    BillingPeriod,
    AmountCents,
    CompareAtCents,
    EffectiveFrom,
    EffectiveUntil,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PlanLimits {
    Table,
    Id,
    PlanId,
    ResourceKey,
    Quota,
    ResetPeriod,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    Code,
    DiscountType,
    Value,
    PlanIds,
    BillingPeriods,
    UsageCap,
    PerUserCap,
    ValidFrom,
    ValidUntil,
    FirstPaymentOnly,
    IsActive,
    UsedCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CouponRedemptions {
    Table,
    Id,
    CouponId,
    UserId,
    SubscriptionId,
    RedeemedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    PlanId,
    BillingPeriod,
    Currency,
    Status,
    TrialEndsAt,
    CurrentPeriodStart,
    CurrentPeriodEnd,
    CancelAtPeriodEnd,
    PendingPlanId,
    PendingEffectiveAt,
    PausedAt,
    ResumeAt,
    EndsAt,
    Version,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UsageRecords {
    Table,
    Id,
    SubscriptionId,
    ResourceKey,
    Quantity,
    PeriodStart,
    PeriodEnd,
    RecordedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // enums
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("plan_kind"))
                    .values(vec![
                        Alias::new("subscription"),
                        Alias::new("one_time"),
                        Alias::new("usage_based"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("plan_status"))
                    .values(vec![
                        Alias::new("draft"),
                        Alias::new("active"),
                        Alias::new("archived"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("billing_period"))
                    .values(vec![
                        Alias::new("monthly"),
                        Alias::new("quarterly"),
                        Alias::new("yearly"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("quota_reset_period"))
                    .values(vec![Alias::new("billing_cycle"), Alias::new("daily")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("discount_type"))
                    .values(vec![Alias::new("percentage"), Alias::new("fixed_amount")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("subscription_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("trial"),
                        Alias::new("active"),
                        Alias::new("paused"),
                        Alias::new("past_due"),
                        Alias::new("cancelled"),
                        Alias::new("expired"),
                    ])
                    .to_owned(),
            )
            .await?;

        // plans
        manager
            .create_table(
                Table::create()
                    .table(Plans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Plans::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Plans::Slug).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Plans::Kind)
                            .custom(Alias::new("plan_kind"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Plans::TrialDays)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Plans::Status)
                            .custom(Alias::new("plan_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Plans::BillingPeriods).json_binary().not_null())
                    .col(ColumnDef::new(Plans::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Plans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Plans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_plans_slug_unique")
                    .table(Plans::Table)
                    .col(Plans::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // price_points
        manager
            .create_table(
                Table::create()
                    .table(PricePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PricePoints::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PricePoints::PlanId).big_integer().not_null())
                    .col(ColumnDef::new(PricePoints::Currency).string_len(3).not_null())
                    .col(
                        ColumnDef::new(PricePoints::BillingPeriod)
                            .custom(Alias::new("billing_period"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PricePoints::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PricePoints::CompareAtCents).big_integer().null())
                    .col(
                        ColumnDef::new(PricePoints::EffectiveFrom)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PricePoints::EffectiveUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PricePoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PricePoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_price_points_plan_currency_period")
                    .table(PricePoints::Table)
                    .col(PricePoints::PlanId)
                    .col(PricePoints::Currency)
                    .col(PricePoints::BillingPeriod)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(PricePoints::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_price_point_plan")
                            .from_tbl(PricePoints::Table)
                            .from_col(PricePoints::PlanId)
                            .to_tbl(Plans::Table)
                            .to_col(Plans::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // plan_limits
        manager
            .create_table(
                Table::create()
                    .table(PlanLimits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlanLimits::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlanLimits::PlanId).big_integer().not_null())
                    .col(
                        ColumnDef::new(PlanLimits::ResourceKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlanLimits::Quota).big_integer().null())
                    .col(
                        ColumnDef::new(PlanLimits::ResetPeriod)
                            .custom(Alias::new("quota_reset_period"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlanLimits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(PlanLimits::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // one limit row per (plan, resource)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_plan_limits_plan_resource_unique")
                    .table(PlanLimits::Table)
                    .col(PlanLimits::PlanId)
                    .col(PlanLimits::ResourceKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(PlanLimits::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_plan_limit_plan")
                            .from_tbl(PlanLimits::Table)
                            .from_col(PlanLimits::PlanId)
                            .to_tbl(Plans::Table)
                            .to_col(Plans::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // coupons
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Coupons::Code).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Coupons::DiscountType)
                            .custom(Alias::new("discount_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Coupons::Value).big_integer().not_null())
                    .col(ColumnDef::new(Coupons::PlanIds).json_binary().null())
                    .col(ColumnDef::new(Coupons::BillingPeriods).json_binary().null())
                    .col(ColumnDef::new(Coupons::UsageCap).big_integer().null())
                    .col(ColumnDef::new(Coupons::PerUserCap).big_integer().null())
                    .col(
                        ColumnDef::new(Coupons::ValidFrom)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::ValidUntil)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::FirstPaymentOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Coupons::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Coupons::UsedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Coupons::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupons_code_unique")
                    .table(Coupons::Table)
                    .col(Coupons::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // coupon_redemptions
        manager
            .create_table(
                Table::create()
                    .table(CouponRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CouponRedemptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::CouponId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::SubscriptionId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CouponRedemptions::RedeemedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        // per-user cap is checked by counting these rows
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_coupon_redemptions_coupon_user")
                    .table(CouponRedemptions::Table)
                    .col(CouponRedemptions::CouponId)
                    .col(CouponRedemptions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(CouponRedemptions::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_coupon_redemption_coupon")
                            .from_tbl(CouponRedemptions::Table)
                            .from_col(CouponRedemptions::CouponId)
                            .to_tbl(Coupons::Table)
                            .to_col(Coupons::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // subscriptions
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PlanId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::BillingPeriod)
                            .custom(Alias::new("billing_period"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Currency)
                            .string_len(3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .custom(Alias::new("subscription_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::TrialEndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CurrentPeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CurrentPeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::CancelAtPeriodEnd)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PendingPlanId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PendingEffectiveAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::PausedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::ResumeAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Subscriptions::Metadata).json_binary().null())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_user")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .to_owned(),
            )
            .await?;

        // sweep scans by period end
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_period_end")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::CurrentPeriodEnd)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(Subscriptions::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_subscription_plan")
                            .from_tbl(Subscriptions::Table)
                            .from_col(Subscriptions::PlanId)
                            .to_tbl(Plans::Table)
                            .to_col(Plans::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // usage_records
        manager
            .create_table(
                Table::create()
                    .table(UsageRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UsageRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::SubscriptionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::ResourceKey)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::Quantity)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UsageRecords::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_usage_records_sub_resource_period")
                    .table(UsageRecords::Table)
                    .col(UsageRecords::SubscriptionId)
                    .col(UsageRecords::ResourceKey)
                    .col(UsageRecords::PeriodStart)
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(UsageRecords::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_usage_record_subscription")
                            .from_tbl(UsageRecords::Table)
                            .from_col(UsageRecords::SubscriptionId)
                            .to_tbl(Subscriptions::Table)
                            .to_col(Subscriptions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(UsageRecords::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(CouponRedemptions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Coupons::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(PlanLimits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(PricePoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Plans::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().if_exists().name(Alias::new("subscription_status")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(Alias::new("discount_type")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(Alias::new("quota_reset_period")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(Alias::new("billing_period")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(Alias::new("plan_status")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().if_exists().name(Alias::new("plan_kind")).to_owned())
            .await?;

        Ok(())
    }
}
