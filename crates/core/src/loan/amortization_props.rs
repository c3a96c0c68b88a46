//! Property-based tests for the amortization calculator.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::amortization::{build_schedule, emi};

/// Strategy to generate principals (100.00 to 10,000,000.00).
fn principal() -> impl Strategy<Value = Decimal> {
    (10_000i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive annual rates (0.01% to 36.00%).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..=3_600i64).prop_map(|bp| Decimal::new(bp, 2))
}

/// Strategy to generate terms (1 to 360 months).
fn term() -> impl Strategy<Value = u32> {
    1u32..=360
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A zero rate repays the principal in equal parts.
    #[test]
    fn prop_zero_rate_is_principal_over_term(p in principal(), n in term()) {
        let n = i32::try_from(n).unwrap();
        prop_assert_eq!(emi(p, Decimal::ZERO, n), Some(p / Decimal::from(n)));
    }

    /// With a positive rate the installments repay more than the principal.
    #[test]
    fn prop_positive_rate_charges_interest(p in principal(), r in positive_rate(), n in term()) {
        let n = i32::try_from(n).unwrap();
        let installment = emi(p, r, n).unwrap();
        prop_assert!(installment * Decimal::from(n) > p);
    }

    /// A higher rate never lowers the installment.
    #[test]
    fn prop_installment_grows_with_rate(
        p in principal(),
        r in positive_rate(),
        bump in 1i64..500,
        n in term(),
    ) {
        let n = i32::try_from(n).unwrap();
        let lower = emi(p, r, n).unwrap();
        let higher = emi(p, r + Decimal::new(bump, 2), n).unwrap();
        prop_assert!(higher > lower);
    }

    /// The scheduled installments sum to the total payable, and the rounded
    /// installment is within half a minor unit of the exact one.
    #[test]
    fn prop_schedule_sums_to_total(p in principal(), r in positive_rate(), n in term()) {
        let start = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        let schedule = build_schedule(p, r, n, start, 2).unwrap();

        let scheduled: Decimal = std::iter::repeat_n(schedule.installment, schedule.due_dates.len()).sum();
        prop_assert_eq!(scheduled, schedule.total_payable);

        let exact = emi(p, r, i32::try_from(n).unwrap()).unwrap();
        prop_assert!((schedule.installment - exact).abs() <= Decimal::new(5, 3));
    }

    /// Due dates are strictly increasing and there is one per month of term.
    #[test]
    fn prop_due_dates_increase(p in principal(), r in positive_rate(), n in term()) {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 8, 0, 0).unwrap();
        let schedule = build_schedule(p, r, n, start, 2).unwrap();

        prop_assert_eq!(schedule.due_dates.len(), n as usize);
        prop_assert!(schedule.due_dates[0] > start);
        prop_assert!(schedule.due_dates.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(schedule.due_dates.last().copied(), Some(schedule.end_date));
    }
}
