use crate::entities::DiscountType;

/// Integer division rounded half-up. Callers guarantee non-negative inputs.
fn div_round_half_up(numer: i128, denom: i128) -> i64 {
    ((numer + denom / 2) / denom) as i64
}

/// Apply a coupon discount to an amount in minor units.
///
/// Percentage: `amount * (1 - value/100)`, rounded half-up to the minor
/// unit, floored at zero. Fixed amount: `max(0, amount - value)`.
pub fn calculate_discount(amount_cents: i64, discount_type: DiscountType, value: i64) -> i64 {
    match discount_type {
        DiscountType::Percentage => {
            let pct = value.clamp(0, 100);
            div_round_half_up(amount_cents as i128 * (100 - pct) as i128, 100)
        }
        DiscountType::FixedAmount => (amount_cents - value).max(0),
    }
}

/// The amount taken off, rather than the amount left to pay.
pub fn discount_amount(amount_cents: i64, discount_type: DiscountType, value: i64) -> i64 {
    amount_cents - calculate_discount(amount_cents, discount_type, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_discount_half_off() {
        // SAVE50 on a 20.00 price -> 10.00 to pay, 10.00 off
        assert_eq!(calculate_discount(2000, DiscountType::Percentage, 50), 1000);
        assert_eq!(discount_amount(2000, DiscountType::Percentage, 50), 1000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 25 cents at 50% -> 12.5 -> 13
        assert_eq!(calculate_discount(25, DiscountType::Percentage, 50), 13);
        // 33% off 100 -> 67
        assert_eq!(calculate_discount(100, DiscountType::Percentage, 33), 67);
    }

    #[test]
    fn test_percentage_full_and_zero() {
        assert_eq!(calculate_discount(2000, DiscountType::Percentage, 100), 0);
        assert_eq!(calculate_discount(2000, DiscountType::Percentage, 0), 2000);
    }

    #[test]
    fn test_percentage_value_clamped() {
        assert_eq!(calculate_discount(2000, DiscountType::Percentage, 150), 0);
    }

    #[test]
    fn test_fixed_amount_discount() {
        assert_eq!(calculate_discount(2000, DiscountType::FixedAmount, 500), 1500);
    }

    #[test]
    fn test_fixed_amount_floors_at_zero() {
        assert_eq!(calculate_discount(300, DiscountType::FixedAmount, 500), 0);
        assert_eq!(discount_amount(300, DiscountType::FixedAmount, 500), 300);
    }
}
