//! Error taxonomy shared by every ledger and loan operation.
//!
//! Every failure is returned to the caller. Multi-step operations never leave
//! partial state behind, so the only error worth retrying automatically is
//! [`LedgerError::Contention`].

use bankcore_shared::types::{AccountId, LoanId, LoanPaymentId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger and loan operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount is zero, negative, or not representable in the account currency.
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
        /// Why it was rejected.
        reason: String,
    },

    /// Malformed request parameters (principal, rate, term, account pair, owner).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ========== Lookup Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Loan not found.
    #[error("Loan not found: {0}")]
    LoanNotFound(LoanId),

    /// Loan payment not found.
    #[error("Loan payment not found: {0}")]
    PaymentNotFound(LoanPaymentId),

    // ========== Business Rule Errors ==========
    /// Source account balance does not cover the debit.
    #[error("Insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The account being debited.
        account_id: AccountId,
        /// Balance at the time of the check.
        balance: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// The payment belongs to a different loan than the one named.
    #[error("Payment {payment_id} belongs to loan {actual}, not loan {requested}")]
    PaymentLoanMismatch {
        /// The payment.
        payment_id: LoanPaymentId,
        /// The loan named by the caller.
        requested: LoanId,
        /// The loan that owns the payment.
        actual: LoanId,
    },

    /// The installment has already been paid.
    #[error("Payment {0} has already been paid")]
    PaymentAlreadyPaid(LoanPaymentId),

    /// The loan is paid off and accepts no further payments.
    #[error("Loan {0} is already paid off")]
    LoanAlreadyClosed(LoanId),

    // ========== Store Errors ==========
    /// Lock wait, serialization conflict, or busy store. Safe to retry from scratch.
    #[error("Contention, please retry: {0}")]
    Contention(String),

    /// Underlying persistence failure.
    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl LedgerError {
    /// Creates an invalid amount error.
    #[must_use]
    pub fn invalid_amount(amount: Decimal, reason: impl Into<String>) -> Self {
        Self::InvalidAmount {
            amount,
            reason: reason.into(),
        }
    }

    /// Creates an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::LoanNotFound(_) => "LOAN_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::PaymentLoanMismatch { .. } => "PAYMENT_LOAN_MISMATCH",
            Self::PaymentAlreadyPaid(_) => "PAYMENT_ALREADY_PAID",
            Self::LoanAlreadyClosed(_) => "LOAN_ALREADY_CLOSED",
            Self::Contention(_) => "CONTENTION",
            Self::StoreFailure(_) => "STORE_FAILURE",
        }
    }

    /// Returns the HTTP status code the outer layer should use for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount { .. } | Self::InvalidRequest(_) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::LoanNotFound(_) | Self::PaymentNotFound(_) => 404,

            // 409 Conflict - state and concurrency errors
            Self::PaymentAlreadyPaid(_) | Self::LoanAlreadyClosed(_) | Self::Contention(_) => 409,

            // 422 Unprocessable - business rule violations
            Self::InsufficientFunds { .. } | Self::PaymentLoanMismatch { .. } => 422,

            // 500 Internal Server Error
            Self::StoreFailure(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Contention(msg) => Self::Contention(msg),
            StoreError::Failure(msg) => Self::StoreFailure(msg),
        }
    }
}
