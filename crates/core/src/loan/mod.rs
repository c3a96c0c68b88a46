//! Fixed-rate amortizing loans.
//!
//! - Equal-installment (EMI) calculation and schedule generation
//! - Loan lifecycle: origination, installment payments, closure

pub mod amortization;
pub mod service;
pub mod types;

#[cfg(test)]
mod amortization_props;

pub use amortization::{Schedule, build_schedule, emi, monthly_rate};
pub use service::{LoanService, STORED_SCALE};
pub use types::{
    CreateLoanInput, Loan, LoanPayment, LoanStatus, LoanWithSchedule, NewLoan, NewLoanPayment,
    PaymentReceipt, PaymentStatus,
};
