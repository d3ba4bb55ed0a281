use chrono::{DateTime, Utc};

/// Credit for the unused remainder of the current period, in minor units.
///
/// `credit = (period_end - now) / (period_end - period_start) * old_price`,
/// computed with sub-day (second) precision and rounded half-up. The result
/// is always within `[0, old_price_cents]`.
pub fn proration_credit(
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    now: DateTime<Utc>,
    old_price_cents: i64,
) -> i64 {
    let total_secs = (period_end - period_start).num_seconds();
    if total_secs <= 0 || old_price_cents <= 0 {
        return 0;
    }
    let unused_secs = (period_end - now).num_seconds().clamp(0, total_secs);

    let numer = old_price_cents as i128 * unused_secs as i128;
    let denom = total_secs as i128;
    ((numer + denom / 2) / denom) as i64
}

/// Proration credit applies to the first charge of the new plan and is
/// forfeited beyond it, never producing a negative charge.
pub fn prorated_charge(new_price_cents: i64, credit_cents: i64) -> i64 {
    (new_price_cents - credit_cents).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day_zero() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_credit_ten_days_into_thirty() {
        // pro monthly at 30.00, upgrade exactly 10 days in: 20/30 unused
        let start = day_zero();
        let end = start + Duration::days(30);
        let now = start + Duration::days(10);

        let credit = proration_credit(start, end, now, 3000);
        assert_eq!(credit, 2000);
        // elite monthly at 60.00 -> first charge 40.00
        assert_eq!(prorated_charge(6000, credit), 4000);
    }

    #[test]
    fn test_credit_at_period_start_is_full_price() {
        let start = day_zero();
        let end = start + Duration::days(30);
        assert_eq!(proration_credit(start, end, start, 3000), 3000);
    }

    #[test]
    fn test_credit_at_period_end_is_zero() {
        let start = day_zero();
        let end = start + Duration::days(30);
        assert_eq!(proration_credit(start, end, end, 3000), 0);
    }

    #[test]
    fn test_credit_clamped_outside_period() {
        let start = day_zero();
        let end = start + Duration::days(30);
        assert_eq!(proration_credit(start, end, end + Duration::days(5), 3000), 0);
        assert_eq!(
            proration_credit(start, end, start - Duration::days(5), 3000),
            3000
        );
    }

    #[test]
    fn test_credit_sub_day_precision() {
        let start = day_zero();
        let end = start + Duration::days(30);
        let now = start + Duration::days(10) + Duration::hours(12);
        // 19.5/30 unused of 3000 = 1950
        assert_eq!(proration_credit(start, end, now, 3000), 1950);
    }

    #[test]
    fn test_credit_never_exceeds_old_price() {
        let start = day_zero();
        let end = start + Duration::days(30);
        let now = start + Duration::seconds(1);
        let credit = proration_credit(start, end, now, 3000);
        assert!(credit >= 0 && credit <= 3000);
    }

    #[test]
    fn test_charge_never_negative() {
        assert_eq!(prorated_charge(1000, 2500), 0);
        assert_eq!(prorated_charge(6000, 2000), 4000);
    }

    #[test]
    fn test_zero_length_period() {
        let start = day_zero();
        assert_eq!(proration_credit(start, start, start, 3000), 0);
    }
}
