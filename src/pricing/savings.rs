use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::AlertType;

/// Alert fields derived from a price that clears the savings threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsDecision {
    pub alert_type: AlertType,
    /// Whole percent, rounded half away from zero.
    pub savings_percent: i32,
    /// Currency amount, rounded to cents.
    pub savings_amount: Decimal,
}

/// Fraction saved versus the user's average: `(avg - price) / avg`.
/// Zero when the user has no usable average.
pub fn savings_fraction(avg_purchase_price: Decimal, price: Decimal) -> Decimal {
    if avg_purchase_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (avg_purchase_price - price) / avg_purchase_price
}

/// Decide whether `price` warrants an alert. Returns `None` below `threshold`.
pub fn evaluate_savings(
    avg_purchase_price: Decimal,
    price: Decimal,
    is_promotion: bool,
    threshold: Decimal,
) -> Option<SavingsDecision> {
    if avg_purchase_price <= Decimal::ZERO {
        return None;
    }

    let fraction = savings_fraction(avg_purchase_price, price);
    if fraction < threshold {
        return None;
    }

    let savings_percent = (fraction * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i32()?;
    let savings_amount = (avg_purchase_price - price)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Some(SavingsDecision {
        alert_type: if is_promotion {
            AlertType::Promotion
        } else {
            AlertType::PriceDrop
        },
        savings_percent,
        savings_amount,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold() -> Decimal {
        Decimal::new(15, 2)
    }

    #[test]
    fn test_one_third_off_is_price_drop() {
        let d = evaluate_savings(Decimal::from(15), Decimal::from(10), false, threshold()).unwrap();
        assert_eq!(d.alert_type, AlertType::PriceDrop);
        assert_eq!(d.savings_percent, 33);
        assert_eq!(d.savings_amount, Decimal::from(5));
    }

    #[test]
    fn test_promotion_flag_sets_alert_type() {
        let d = evaluate_savings(Decimal::from(20), Decimal::from(10), true, threshold()).unwrap();
        assert_eq!(d.alert_type, AlertType::Promotion);
        assert_eq!(d.savings_percent, 50);
    }

    #[test]
    fn test_exactly_at_threshold_alerts() {
        // 100 -> 85 is exactly 15%
        let d = evaluate_savings(Decimal::from(100), Decimal::from(85), false, threshold()).unwrap();
        assert_eq!(d.savings_percent, 15);
        assert_eq!(d.savings_amount, Decimal::from(15));
    }

    #[test]
    fn test_just_below_threshold_is_none() {
        // 100 -> 85.01 is 14.99%
        let d = evaluate_savings(Decimal::from(100), Decimal::new(8501, 2), false, threshold());
        assert!(d.is_none());
    }

    #[test]
    fn test_zero_average_never_alerts() {
        assert!(evaluate_savings(Decimal::ZERO, Decimal::ONE, true, threshold()).is_none());
        assert_eq!(savings_fraction(Decimal::ZERO, Decimal::ONE), Decimal::ZERO);
    }

    #[test]
    fn test_price_above_average_is_none() {
        assert!(evaluate_savings(Decimal::from(10), Decimal::from(12), false, threshold()).is_none());
    }

    #[test]
    fn test_percent_rounds_half_up() {
        // (40 - 33.8) / 40 = 0.155 -> 15.5% -> 16
        let d = evaluate_savings(Decimal::from(40), Decimal::new(338, 1), false, threshold()).unwrap();
        assert_eq!(d.savings_percent, 16);
        assert_eq!(d.savings_amount, Decimal::new(620, 2));
    }

    #[test]
    fn test_amount_rounds_to_cents() {
        // 19.999 - 9.994 = 10.005 -> 10.01
        let d = evaluate_savings(Decimal::new(19999, 3), Decimal::new(9994, 3), false, threshold())
            .unwrap();
        assert_eq!(d.savings_amount, Decimal::new(1001, 2));
    }
}
