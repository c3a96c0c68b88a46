//! Transfer engine: account opening, deposits and account-to-account transfers.

use std::sync::Arc;

use bankcore_shared::types::{AccountId, CustomerId};
use rust_decimal::Decimal;
use tracing::info;

use super::types::{ensure_positive, Account, NewAccount, NewTransaction, Transaction};
use crate::error::{LedgerError, LedgerResult};
use crate::store::{self, AccountStore, LedgerStore, LockMode, UnitOfWork};

/// Moves value into and between accounts.
///
/// Every mutating call runs inside one unit of work, so a failed call leaves
/// balances and the ledger exactly as they were.
pub struct TransferService<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> TransferService<S> {
    /// Create a new transfer service over a record store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Open an account with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the owner name is blank.
    pub async fn create_account(&self, input: NewAccount) -> LedgerResult<Account> {
        if input.owner.trim().is_empty() {
            return Err(LedgerError::invalid_request("owner must not be empty"));
        }
        let mut unit = self.store.begin().await?;
        let result = unit.create_account(input).await.map_err(LedgerError::from);
        let account = store::finish(unit, result).await?;

        info!(
            account_id = %account.id,
            customer_id = %account.customer_id,
            currency = %account.currency,
            "Account opened"
        );
        Ok(account)
    }

    /// Fetch one account.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if no such account exists.
    pub async fn get_account(&self, account_id: AccountId) -> LedgerResult<Account> {
        let mut unit = self.store.begin_read().await?;
        let result = unit
            .get_account(account_id, LockMode::Plain)
            .await
            .map_err(LedgerError::from)
            .and_then(|found| found.ok_or(LedgerError::AccountNotFound(account_id)));
        store::finish(unit, result).await
    }

    /// List a customer's accounts in the order they were opened.
    ///
    /// # Errors
    ///
    /// Returns a store error if the read fails.
    pub async fn list_accounts(&self, customer_id: CustomerId) -> LedgerResult<Vec<Account>> {
        let mut unit = self.store.begin_read().await?;
        let result = unit
            .list_accounts_by_customer(customer_id)
            .await
            .map_err(LedgerError::from);
        store::finish(unit, result).await
    }

    /// Credit external value to an account and record a deposit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Amount is not positive or has too many decimal places for the currency
    /// - Account does not exist
    /// - Store is contended or fails
    pub async fn deposit(&self, account_id: AccountId, amount: Decimal) -> LedgerResult<Transaction> {
        ensure_positive(amount)?;

        let mut unit = self.store.begin().await?;
        let result = deposit_in(&mut unit, account_id, amount).await;
        let entry = store::finish(unit, result).await?;

        info!(
            transaction_id = %entry.id,
            account_id = %account_id,
            amount = %amount,
            "Deposit committed"
        );
        Ok(entry)
    }

    /// Move `amount` from one account to another and record a transfer entry.
    ///
    /// Both accounts are locked in ascending ID order, so two transfers in
    /// opposite directions between the same pair cannot deadlock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Amount is not positive or has too many decimal places for the currency
    /// - Source and destination are the same account
    /// - Either account does not exist
    /// - The accounts hold different currencies
    /// - Source balance is below the amount
    /// - Store is contended or fails
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> LedgerResult<Transaction> {
        ensure_positive(amount)?;
        if from == to {
            return Err(LedgerError::invalid_request(
                "source and destination must be different accounts",
            ));
        }

        let mut unit = self.store.begin().await?;
        let result = transfer_in(&mut unit, from, to, amount).await;
        let entry = store::finish(unit, result).await?;

        info!(
            transaction_id = %entry.id,
            from_account = %from,
            to_account = %to,
            amount = %amount,
            "Transfer committed"
        );
        Ok(entry)
    }
}

async fn lock_account<U: UnitOfWork>(unit: &mut U, id: AccountId) -> LedgerResult<Account> {
    unit.get_account(id, LockMode::ForUpdate)
        .await?
        .ok_or(LedgerError::AccountNotFound(id))
}

async fn deposit_in<U: UnitOfWork>(
    unit: &mut U,
    account_id: AccountId,
    amount: Decimal,
) -> LedgerResult<Transaction> {
    let account = lock_account(unit, account_id).await?;
    account.check_amount(amount)?;

    let balance = account.credit(amount)?;
    unit.update_balance(account_id, balance).await?;
    let entry = unit
        .create_transaction(NewTransaction::deposit(account_id, amount))
        .await?;
    Ok(entry)
}

async fn transfer_in<U: UnitOfWork>(
    unit: &mut U,
    from: AccountId,
    to: AccountId,
    amount: Decimal,
) -> LedgerResult<Transaction> {
    // Lock in ascending ID order
    let (low, high) = if from < to { (from, to) } else { (to, from) };
    let low_account = lock_account(unit, low).await?;
    let high_account = lock_account(unit, high).await?;
    let (source, destination) = if low == from {
        (low_account, high_account)
    } else {
        (high_account, low_account)
    };

    if source.currency != destination.currency {
        return Err(LedgerError::invalid_request(format!(
            "cannot transfer {} to a {} account",
            source.currency, destination.currency
        )));
    }
    source.check_amount(amount)?;

    let source_balance = source.debit(amount)?;
    let destination_balance = destination.credit(amount)?;
    unit.update_balance(from, source_balance).await?;
    unit.update_balance(to, destination_balance).await?;

    let entry = unit
        .create_transaction(NewTransaction::transfer(from, to, amount))
        .await?;
    Ok(entry)
}
