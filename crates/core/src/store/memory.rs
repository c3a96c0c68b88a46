//! In-memory record store.
//!
//! A write unit takes a store-wide lock for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state only on commit.
//! That gives serializable isolation and all-or-nothing commits. Lock
//! acquisition is bounded by a timeout and fails with
//! [`StoreError::Contention`].
//!
//! Read units clone a snapshot and release the lock immediately.
//!
//! The store enforces the same row constraints as the PostgreSQL schema
//! (non-negative balances, positive entry amounts, one entry kind).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bankcore_shared::types::{
    AccountId, CustomerId, LoanId, LoanPaymentId, TransactionId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    AccountStore, LedgerStore, LockMode, LoanPaymentStore, LoanStore, StoreError, StoreResult,
    TransactionStore, UnitOfWork,
};
use crate::ledger::types::{Account, NewAccount, NewTransaction, Transaction};
use crate::loan::types::{
    Loan, LoanPayment, LoanStatus, NewLoan, NewLoanPayment, PaymentStatus,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    loans: BTreeMap<LoanId, Loan>,
    payments: BTreeMap<LoanPaymentId, LoanPayment>,
    last_account_id: i64,
    last_transaction_id: i64,
    last_loan_id: i64,
    last_payment_id: i64,
}

/// Thread-safe in-memory [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    lock_timeout: Duration,
    #[cfg(test)]
    fail_installment: Option<u32>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with the default lock timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Creates an empty store whose units wait at most `lock_timeout` for the lock.
    #[must_use]
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            lock_timeout,
            #[cfg(test)]
            fail_installment: None,
        }
    }

    /// Makes inserting the given installment number fail inside every unit.
    #[cfg(test)]
    pub(crate) fn failing_installment(mut self, installment_number: u32) -> Self {
        self.fail_installment = Some(installment_number);
        self
    }

    /// Entries appended to the committed ledger so far.
    #[cfg(test)]
    pub(crate) async fn ledger_len(&self) -> usize {
        self.state.lock().await.transactions.len()
    }

    async fn acquire(&self) -> StoreResult<OwnedMutexGuard<MemoryState>> {
        tokio::time::timeout(self.lock_timeout, Arc::clone(&self.state).lock_owned())
            .await
            .map_err(|_| {
                StoreError::Contention(format!(
                    "store lock not acquired within {} ms",
                    self.lock_timeout.as_millis()
                ))
            })
    }
}

impl LedgerStore for InMemoryStore {
    type Unit = MemoryUnit;

    async fn begin(&self) -> StoreResult<MemoryUnit> {
        let guard = self.acquire().await?;
        Ok(MemoryUnit {
            working: MemoryState::clone(&guard),
            guard: Some(guard),
            #[cfg(test)]
            fail_installment: self.fail_installment,
        })
    }

    async fn begin_read(&self) -> StoreResult<MemoryUnit> {
        let guard = self.acquire().await?;
        let working = MemoryState::clone(&guard);
        drop(guard);
        Ok(MemoryUnit {
            working,
            guard: None,
            #[cfg(test)]
            fail_installment: self.fail_installment,
        })
    }
}

/// Unit of work over an [`InMemoryStore`].
///
/// Read units hold no lock and discard anything written to them.
#[derive(Debug)]
pub struct MemoryUnit {
    working: MemoryState,
    guard: Option<OwnedMutexGuard<MemoryState>>,
    #[cfg(test)]
    fail_installment: Option<u32>,
}

impl MemoryUnit {
    #[cfg(test)]
    fn injected_failure(&self, installment_number: u32) -> StoreResult<()> {
        if self.fail_installment == Some(installment_number) {
            return Err(StoreError::failure("injected installment insert failure"));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[allow(clippy::unused_self)]
    fn injected_failure(&self, _installment_number: u32) -> StoreResult<()> {
        Ok(())
    }
}

impl UnitOfWork for MemoryUnit {
    async fn commit(self) -> StoreResult<()> {
        if let Some(mut guard) = self.guard {
            *guard = self.working;
        }
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

impl AccountStore for MemoryUnit {
    async fn create_account(&mut self, input: NewAccount) -> StoreResult<Account> {
        self.working.last_account_id += 1;
        let account = Account {
            id: AccountId::new(self.working.last_account_id),
            customer_id: input.customer_id,
            branch_id: input.branch_id,
            owner: input.owner,
            balance: Decimal::ZERO,
            currency: input.currency,
            created_at: Utc::now(),
        };
        self.working.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&mut self, id: AccountId, _lock: LockMode) -> StoreResult<Option<Account>> {
        Ok(self.working.accounts.get(&id).cloned())
    }

    async fn update_balance(&mut self, id: AccountId, balance: Decimal) -> StoreResult<()> {
        if balance < Decimal::ZERO {
            return Err(StoreError::failure(format!(
                "balance check violated for account {id}"
            )));
        }
        let account = self
            .working
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::failure(format!("account {id} does not exist")))?;
        account.balance = balance;
        Ok(())
    }

    async fn list_accounts_by_customer(&mut self, customer_id: CustomerId) -> StoreResult<Vec<Account>> {
        Ok(self
            .working
            .accounts
            .values()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

impl TransactionStore for MemoryUnit {
    async fn create_transaction(&mut self, input: NewTransaction) -> StoreResult<Transaction> {
        if input.amount <= Decimal::ZERO {
            return Err(StoreError::failure("transaction amount check violated"));
        }
        self.working.last_transaction_id += 1;
        let transaction = Transaction {
            id: TransactionId::new(self.working.last_transaction_id),
            kind: input.kind,
            beneficiary_id: input.beneficiary_id,
            amount: input.amount,
            created_at: Utc::now(),
        };
        self.working.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn list_transactions_by_account(&mut self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        let mut entries: Vec<Transaction> = self
            .working
            .transactions
            .iter()
            .filter(|t| t.kind.touches(account_id))
            .cloned()
            .collect();
        entries.sort_by_key(|t| (t.created_at, t.id));
        Ok(entries)
    }
}

impl LoanStore for MemoryUnit {
    async fn create_loan(&mut self, input: NewLoan) -> StoreResult<Loan> {
        self.working.last_loan_id += 1;
        let loan = Loan {
            id: LoanId::new(self.working.last_loan_id),
            customer_id: input.customer_id,
            branch_id: input.branch_id,
            principal: input.principal,
            annual_rate: input.annual_rate,
            term_months: input.term_months,
            installment: input.installment,
            total_payable: input.total_payable,
            status: LoanStatus::Approved,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: Utc::now(),
        };
        self.working.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn get_loan(&mut self, id: LoanId, _lock: LockMode) -> StoreResult<Option<Loan>> {
        Ok(self.working.loans.get(&id).cloned())
    }

    async fn list_loans_by_customer(&mut self, customer_id: CustomerId) -> StoreResult<Vec<Loan>> {
        Ok(self
            .working
            .loans
            .values()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn update_loan_status(&mut self, id: LoanId, status: LoanStatus) -> StoreResult<()> {
        let loan = self
            .working
            .loans
            .get_mut(&id)
            .ok_or_else(|| StoreError::failure(format!("loan {id} does not exist")))?;
        loan.status = status;
        Ok(())
    }
}

impl LoanPaymentStore for MemoryUnit {
    async fn create_payment(&mut self, input: NewLoanPayment) -> StoreResult<LoanPayment> {
        self.injected_failure(input.installment_number)?;
        if !self.working.loans.contains_key(&input.loan_id) {
            return Err(StoreError::failure(format!(
                "loan {} does not exist",
                input.loan_id
            )));
        }
        self.working.last_payment_id += 1;
        let payment = LoanPayment {
            id: LoanPaymentId::new(self.working.last_payment_id),
            loan_id: input.loan_id,
            installment_number: input.installment_number,
            amount: input.amount,
            due_date: input.due_date,
            paid_date: None,
            status: PaymentStatus::Pending,
        };
        self.working.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get_payment(&mut self, id: LoanPaymentId, _lock: LockMode) -> StoreResult<Option<LoanPayment>> {
        Ok(self.working.payments.get(&id).cloned())
    }

    async fn list_payments_by_loan(&mut self, loan_id: LoanId) -> StoreResult<Vec<LoanPayment>> {
        let mut payments: Vec<LoanPayment> = self
            .working
            .payments
            .values()
            .filter(|p| p.loan_id == loan_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.due_date, p.id));
        Ok(payments)
    }

    async fn count_paid_by_loan(&mut self, loan_id: LoanId) -> StoreResult<u32> {
        let paid = self
            .working
            .payments
            .values()
            .filter(|p| p.loan_id == loan_id && p.is_paid())
            .count();
        u32::try_from(paid).map_err(|_| StoreError::failure("paid installment count overflow"))
    }

    async fn update_payment_status(
        &mut self,
        id: LoanPaymentId,
        status: PaymentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        let payment = self
            .working
            .payments
            .get_mut(&id)
            .ok_or_else(|| StoreError::failure(format!("payment {id} does not exist")))?;
        payment.status = status;
        payment.paid_date = paid_date;
        Ok(())
    }
}
