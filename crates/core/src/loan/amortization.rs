//! Fixed equal-installment (EMI) amortization.
//!
//! The interest rate is always an ANNUAL PERCENTAGE: `12` means 12 % per
//! year, i.e. a monthly rate of `0.01`.
//!
//! All arithmetic is `Decimal`, so identical inputs give identical outputs.
//! Rounding to the minor unit happens exactly once, when a schedule is
//! built, which makes the scheduled installments sum to `total_payable`.

use chrono::{DateTime, Months, Utc};
use rust_decimal::prelude::*;
use rust_decimal::MathematicalOps;

use crate::error::LedgerError;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Converts an annual percentage rate into a monthly fraction.
#[must_use]
pub fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / HUNDRED / MONTHS_PER_YEAR
}

/// Computes the unrounded equal monthly installment.
///
/// - `term_months <= 0` gives zero (callers reject such terms first)
/// - a zero rate gives straight-line repayment `principal / term_months`
/// - otherwise `P * r * (1 + r)^n / ((1 + r)^n - 1)`
///
/// Returns `None` if the computation leaves the `Decimal` range.
#[must_use]
pub fn emi(principal: Decimal, annual_rate_percent: Decimal, term_months: i32) -> Option<Decimal> {
    if term_months <= 0 {
        return Some(Decimal::ZERO);
    }
    let n = Decimal::from(term_months);
    let r = monthly_rate(annual_rate_percent);
    if r.is_zero() {
        return principal.checked_div(n);
    }

    let growth = (Decimal::ONE + r).checked_powu(u64::from(term_months.unsigned_abs()))?;
    let denominator = growth.checked_sub(Decimal::ONE)?;
    if denominator.is_zero() {
        // Rate too small to register at 28 digits of precision.
        return principal.checked_div(n);
    }
    principal
        .checked_mul(r)?
        .checked_mul(growth)?
        .checked_div(denominator)
}

/// A fully rounded repayment plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Amount of every installment, rounded to the minor unit.
    pub installment: Decimal,
    /// `installment * term_months`.
    pub total_payable: Decimal,
    /// Due dates, one calendar month apart starting one month after the start.
    pub due_dates: Vec<DateTime<Utc>>,
    /// Due date of the last installment.
    pub end_date: DateTime<Utc>,
}

/// Builds the repayment schedule for a loan starting at `start`.
///
/// Each due date is computed from `start` directly (not from the previous due
/// date), so month-end starts do not drift: a loan starting on 31 January is
/// due on 28/29 February, 31 March, 30 April, and so on.
///
/// # Errors
///
/// Returns `InvalidRequest` if the term is zero, the installment rounds to
/// zero, or the numbers leave the representable range.
pub fn build_schedule(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: u32,
    start: DateTime<Utc>,
    scale: u32,
) -> Result<Schedule, LedgerError> {
    if term_months == 0 {
        return Err(LedgerError::invalid_request("term must be at least one month"));
    }
    let term = i32::try_from(term_months)
        .map_err(|_| LedgerError::invalid_request("term is too long"))?;

    let installment = emi(principal, annual_rate_percent, term)
        .ok_or_else(|| LedgerError::invalid_request("installment is out of range"))?
        .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
    if installment <= Decimal::ZERO {
        return Err(LedgerError::invalid_request(
            "principal is too small for the term",
        ));
    }
    let total_payable = installment
        .checked_mul(Decimal::from(term_months))
        .ok_or_else(|| LedgerError::invalid_request("total payable is out of range"))?;

    let due_dates = (1..=term_months)
        .map(|k| {
            start
                .checked_add_months(Months::new(k))
                .ok_or_else(|| LedgerError::invalid_request("term runs past the calendar range"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let end_date = due_dates
        .last()
        .copied()
        .ok_or_else(|| LedgerError::invalid_request("term must be at least one month"))?;

    Ok(Schedule {
        installment,
        total_payable,
        due_dates,
        end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_monthly_rate() {
        assert_eq!(monthly_rate(dec!(12)), dec!(0.01));
        assert_eq!(monthly_rate(dec!(7.5)), dec!(0.00625));
        assert_eq!(monthly_rate(dec!(0)), dec!(0));
    }

    #[test]
    fn test_emi_reference_example() {
        let installment = emi(dec!(12000), dec!(12), 12).unwrap();
        assert_eq!(installment.round_dp(2), dec!(1066.19));
    }

    #[rstest]
    #[case(dec!(100000), dec!(10), 120, dec!(1321.51))]
    #[case(dec!(5000), dec!(6), 24, dec!(221.60))]
    #[case(dec!(250000), dec!(7.5), 360, dec!(1748.04))]
    fn test_emi_known_values(
        #[case] principal: Decimal,
        #[case] rate: Decimal,
        #[case] term: i32,
        #[case] expected: Decimal,
    ) {
        assert_eq!(emi(principal, rate, term).unwrap().round_dp(2), expected);
    }

    #[test]
    fn test_emi_zero_rate_is_straight_line() {
        assert_eq!(emi(dec!(1200), dec!(0), 12), Some(dec!(100)));
        assert_eq!(emi(dec!(100), dec!(0), 3), Some(dec!(100) / dec!(3)));
    }

    #[rstest]
    #[case(0)]
    #[case(-6)]
    fn test_emi_non_positive_term_is_zero(#[case] term: i32) {
        assert_eq!(emi(dec!(1000), dec!(5), term), Some(Decimal::ZERO));
    }

    #[test]
    fn test_emi_is_deterministic() {
        let a = emi(dec!(98765.43), dec!(11.25), 84);
        let b = emi(dec!(98765.43), dec!(11.25), 84);
        assert_eq!(a, b);
    }

    #[test]
    fn test_schedule_reference_example() {
        let schedule = build_schedule(dec!(12000), dec!(12), 12, start(), 2).unwrap();
        assert_eq!(schedule.installment, dec!(1066.19));
        assert_eq!(schedule.total_payable, dec!(12794.28));
        assert_eq!(schedule.due_dates.len(), 12);
        assert_eq!(
            schedule.due_dates[0],
            Utc.with_ymd_and_hms(2026, 2, 15, 9, 30, 0).unwrap()
        );
        assert_eq!(
            schedule.end_date,
            Utc.with_ymd_and_hms(2027, 1, 15, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_schedule_month_end_does_not_drift() {
        let jan_31 = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
        let schedule = build_schedule(dec!(1000), dec!(5), 4, jan_31, 2).unwrap();
        let days: Vec<u32> = schedule.due_dates.iter().map(Datelike::day).collect();
        assert_eq!(days, vec![28, 31, 30, 31]);
    }

    #[test]
    fn test_schedule_rejects_zero_term() {
        let err = build_schedule(dec!(1000), dec!(5), 0, start(), 2).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));
    }

    #[test]
    fn test_schedule_rejects_installment_rounding_to_zero() {
        let err = build_schedule(dec!(0.01), dec!(0), 12, start(), 2).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRequest(_)));
    }

    #[test]
    fn test_schedule_uses_bankers_rounding() {
        // 100.25 / 10 = 10.025 -> 10.02 (half to even)
        let schedule = build_schedule(dec!(100.25), dec!(0), 10, start(), 2).unwrap();
        assert_eq!(schedule.installment, dec!(10.02));
        assert_eq!(schedule.total_payable, dec!(100.20));
    }

    #[test]
    fn test_schedule_zero_decimal_currency() {
        let schedule = build_schedule(dec!(100000), dec!(3), 6, start(), 0).unwrap();
        assert_eq!(schedule.installment.scale(), 0);
        assert_eq!(schedule.total_payable, schedule.installment * dec!(6));
    }
}
