//! Loan domain types.
//!
//! A loan moves through a two-state lifecycle:
//! - Approved → PaidOff (after the last installment is paid)
//!
//! PaidOff is terminal. Each installment moves Pending → Paid exactly once.

use bankcore_shared::types::{BranchId, CustomerId, LoanId, LoanPaymentId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::types::Transaction;

/// Loan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Disbursed and being repaid.
    Approved,
    /// Every installment has been paid. Terminal.
    PaidOff,
}

impl LoanStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::PaidOff => "paid_off",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "paid_off" => Some(Self::PaidOff),
            _ => None,
        }
    }

    /// Returns true if installments may still be paid.
    #[must_use]
    pub fn accepts_payments(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Installment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not yet paid.
    Pending,
    /// Paid. Never reverts.
    Paid,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fixed-rate amortizing loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    /// Loan ID.
    pub id: LoanId,
    /// Borrowing customer.
    pub customer_id: CustomerId,
    /// Branch the loan is booked at.
    pub branch_id: BranchId,
    /// Amount lent.
    pub principal: Decimal,
    /// Annual interest rate in percent (12 means 12 % per year).
    pub annual_rate: Decimal,
    /// Number of monthly installments.
    pub term_months: u32,
    /// Amount of each installment.
    pub installment: Decimal,
    /// Sum of all installments.
    pub total_payable: Decimal,
    /// Lifecycle status.
    pub status: LoanStatus,
    /// Disbursement time.
    pub start_date: DateTime<Utc>,
    /// Due date of the last installment.
    pub end_date: DateTime<Utc>,
    /// When the loan record was created.
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a loan.
#[derive(Debug, Clone)]
pub struct NewLoan {
    /// Borrowing customer.
    pub customer_id: CustomerId,
    /// Branch the loan is booked at.
    pub branch_id: BranchId,
    /// Amount lent.
    pub principal: Decimal,
    /// Annual interest rate in percent.
    pub annual_rate: Decimal,
    /// Number of monthly installments.
    pub term_months: u32,
    /// Amount of each installment.
    pub installment: Decimal,
    /// Sum of all installments.
    pub total_payable: Decimal,
    /// Disbursement time.
    pub start_date: DateTime<Utc>,
    /// Due date of the last installment.
    pub end_date: DateTime<Utc>,
}

/// One scheduled installment of a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPayment {
    /// Payment ID.
    pub id: LoanPaymentId,
    /// Owning loan.
    pub loan_id: LoanId,
    /// Position in the schedule, starting at 1.
    pub installment_number: u32,
    /// Amount due.
    pub amount: Decimal,
    /// When the installment is due.
    pub due_date: DateTime<Utc>,
    /// When it was paid.
    pub paid_date: Option<DateTime<Utc>>,
    /// Payment status.
    pub status: PaymentStatus,
}

impl LoanPayment {
    /// Returns true once the installment has been paid.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

/// Input for persisting a scheduled installment. New installments are pending.
#[derive(Debug, Clone)]
pub struct NewLoanPayment {
    /// Owning loan.
    pub loan_id: LoanId,
    /// Position in the schedule, starting at 1.
    pub installment_number: u32,
    /// Amount due.
    pub amount: Decimal,
    /// When the installment is due.
    pub due_date: DateTime<Utc>,
}

/// A loan together with its full payment schedule ordered by due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanWithSchedule {
    /// The loan.
    pub loan: Loan,
    /// Its installments.
    pub payments: Vec<LoanPayment>,
}

/// Result of paying one installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The installment, now paid.
    pub payment: LoanPayment,
    /// The loan after the payment. `PaidOff` if this was the last installment.
    pub loan: Loan,
    /// Ledger entry recording the repayment.
    pub transaction: Transaction,
}

/// Parameters for originating a loan.
#[derive(Debug, Clone)]
pub struct CreateLoanInput {
    /// Amount lent. Must be positive.
    pub principal: Decimal,
    /// Annual interest rate in percent. Must not be negative.
    pub annual_rate: Decimal,
    /// Number of monthly installments. Must be positive.
    pub term_months: i32,
    /// Borrowing customer.
    pub customer_id: CustomerId,
    /// Branch the loan is booked at.
    pub branch_id: BranchId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_status_roundtrip() {
        for status in [LoanStatus::Approved, LoanStatus::PaidOff] {
            assert_eq!(LoanStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LoanStatus::parse("PAID_OFF"), Some(LoanStatus::PaidOff));
        assert_eq!(LoanStatus::parse("paid off"), None);
    }

    #[test]
    fn test_only_approved_loans_accept_payments() {
        assert!(LoanStatus::Approved.accepts_payments());
        assert!(!LoanStatus::PaidOff.accepts_payments());
    }

    #[test]
    fn test_payment_status_roundtrip() {
        for status in [PaymentStatus::Pending, PaymentStatus::Paid] {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("overdue"), None);
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }
}
