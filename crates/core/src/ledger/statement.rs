//! Account statements.

use std::sync::Arc;

use bankcore_shared::types::AccountId;

use super::types::Transaction;
use crate::error::{LedgerError, LedgerResult};
use crate::store::{self, LedgerStore, LockMode, UnitOfWork};

/// Read-only view over the ledger.
pub struct StatementReader<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> StatementReader<S> {
    /// Create a new statement reader over a record store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Every entry debiting or crediting the account, oldest first.
    ///
    /// Entries created in the same instant are ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    pub async fn get_statement(&self, account_id: AccountId) -> LedgerResult<Vec<Transaction>> {
        let mut unit = self.store.begin_read().await?;
        let result = statement_in(&mut unit, account_id).await;
        store::finish(unit, result).await
    }
}

async fn statement_in<U: UnitOfWork>(
    unit: &mut U,
    account_id: AccountId,
) -> LedgerResult<Vec<Transaction>> {
    if unit.get_account(account_id, LockMode::Plain).await?.is_none() {
        return Err(LedgerError::AccountNotFound(account_id));
    }
    Ok(unit.list_transactions_by_account(account_id).await?)
}
