//! Record store interfaces.
//!
//! The core never talks to a database directly. It drives a [`LedgerStore`],
//! which hands out [`UnitOfWork`]s: isolated, all-or-nothing sequences of
//! calls against the four entity stores. A unit that is dropped without
//! [`UnitOfWork::commit`] is rolled back.
//!
//! Implementations:
//! - [`memory::InMemoryStore`] in this crate
//! - the PostgreSQL store in the db crate

pub mod memory;

use std::future::Future;

use bankcore_shared::types::{AccountId, CustomerId, LoanId, LoanPaymentId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::LedgerError;
use crate::ledger::types::{Account, NewAccount, NewTransaction, Transaction};
use crate::loan::types::{Loan, LoanPayment, LoanStatus, NewLoan, NewLoanPayment, PaymentStatus};

pub use memory::InMemoryStore;

/// Errors surfaced by a record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Lock wait timed out, serialization conflict, deadlock, or pool exhausted.
    #[error("contention: {0}")]
    Contention(String),

    /// Any other persistence failure.
    #[error("store failure: {0}")]
    Failure(String),
}

impl StoreError {
    /// Create a failure error.
    #[must_use]
    pub fn failure(msg: impl Into<String>) -> Self {
        Self::Failure(msg.into())
    }
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// How a row is read inside a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Default read consistency, no row lock.
    Plain,
    /// Exclusive row lock held until the unit ends (`SELECT ... FOR UPDATE`).
    ForUpdate,
}

/// Account persistence.
pub trait AccountStore: Send {
    /// Insert a new account with a zero balance.
    fn create_account(
        &mut self,
        input: NewAccount,
    ) -> impl Future<Output = StoreResult<Account>> + Send;

    /// Find an account by ID.
    fn get_account(
        &mut self,
        id: AccountId,
        lock: LockMode,
    ) -> impl Future<Output = StoreResult<Option<Account>>> + Send;

    /// Overwrite an account balance.
    fn update_balance(
        &mut self,
        id: AccountId,
        balance: Decimal,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// List a customer's accounts in creation order.
    fn list_accounts_by_customer(
        &mut self,
        customer_id: CustomerId,
    ) -> impl Future<Output = StoreResult<Vec<Account>>> + Send;
}

/// Append-only ledger entry persistence. There is no update or delete.
pub trait TransactionStore: Send {
    /// Append a ledger entry.
    fn create_transaction(
        &mut self,
        input: NewTransaction,
    ) -> impl Future<Output = StoreResult<Transaction>> + Send;

    /// List entries debiting or crediting an account, oldest first.
    fn list_transactions_by_account(
        &mut self,
        account_id: AccountId,
    ) -> impl Future<Output = StoreResult<Vec<Transaction>>> + Send;
}

/// Loan persistence.
pub trait LoanStore: Send {
    /// Insert a new approved loan.
    fn create_loan(&mut self, input: NewLoan) -> impl Future<Output = StoreResult<Loan>> + Send;

    /// Find a loan by ID.
    fn get_loan(
        &mut self,
        id: LoanId,
        lock: LockMode,
    ) -> impl Future<Output = StoreResult<Option<Loan>>> + Send;

    /// List a customer's loans in creation order.
    fn list_loans_by_customer(
        &mut self,
        customer_id: CustomerId,
    ) -> impl Future<Output = StoreResult<Vec<Loan>>> + Send;

    /// Set a loan's lifecycle status.
    fn update_loan_status(
        &mut self,
        id: LoanId,
        status: LoanStatus,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Installment persistence.
pub trait LoanPaymentStore: Send {
    /// Insert a pending installment.
    fn create_payment(
        &mut self,
        input: NewLoanPayment,
    ) -> impl Future<Output = StoreResult<LoanPayment>> + Send;

    /// Find an installment by ID.
    fn get_payment(
        &mut self,
        id: LoanPaymentId,
        lock: LockMode,
    ) -> impl Future<Output = StoreResult<Option<LoanPayment>>> + Send;

    /// List a loan's installments ordered by due date.
    fn list_payments_by_loan(
        &mut self,
        loan_id: LoanId,
    ) -> impl Future<Output = StoreResult<Vec<LoanPayment>>> + Send;

    /// Count a loan's paid installments.
    fn count_paid_by_loan(
        &mut self,
        loan_id: LoanId,
    ) -> impl Future<Output = StoreResult<u32>> + Send;

    /// Set an installment's status and paid date together.
    fn update_payment_status(
        &mut self,
        id: LoanPaymentId,
        status: PaymentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}

/// An atomic, isolated sequence of store calls.
pub trait UnitOfWork:
    AccountStore + TransactionStore + LoanStore + LoanPaymentStore + Sized + Send
{
    /// Make every mutation of the unit durable at once.
    fn commit(self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Discard every mutation of the unit.
    fn rollback(self) -> impl Future<Output = StoreResult<()>> + Send;
}

/// Entry point to a record store.
pub trait LedgerStore: Send + Sync {
    /// Unit of work type handed out by this store.
    type Unit: UnitOfWork;

    /// Begin a read-write unit. Waits a bounded time, then fails with contention.
    fn begin(&self) -> impl Future<Output = StoreResult<Self::Unit>> + Send;

    /// Begin a read-only unit that takes no row locks.
    fn begin_read(&self) -> impl Future<Output = StoreResult<Self::Unit>> + Send;
}

/// Ends a unit according to the outcome of the work done in it.
///
/// Commits on success. On failure the unit is rolled back and the original
/// error is returned; a failed rollback is only logged because the store
/// discards uncommitted work anyway.
pub async fn finish<U, T>(unit: U, result: Result<T, LedgerError>) -> Result<T, LedgerError>
where
    U: UnitOfWork,
{
    match result {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = unit.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
