//! PostgreSQL record store.
//!
//! Every unit of work is one database transaction:
//! - write units run at READ COMMITTED with `SET LOCAL lock_timeout`, and
//!   locking reads use `SELECT ... FOR UPDATE`
//! - read units run READ ONLY at REPEATABLE READ so a multi-query read sees
//!   one snapshot
//!
//! Dropping a unit without committing rolls the transaction back.

use std::time::Duration;

use bankcore_core::ledger::types::{
    Account, NewAccount, NewTransaction, Transaction, TransactionKind,
};
use bankcore_core::loan::types::{
    Loan, LoanPayment, LoanStatus, NewLoan, NewLoanPayment, PaymentStatus,
};
use bankcore_core::store::{
    AccountStore, LedgerStore, LockMode, LoanPaymentStore, LoanStore, StoreError, StoreResult,
    TransactionStore, UnitOfWork,
};
use bankcore_shared::types::{
    AccountId, BeneficiaryId, BranchId, Currency, CustomerId, LoanId, LoanPaymentId,
    TransactionId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set, TransactionTrait,
};

use crate::entities::{accounts, loan_payments, loans, sea_orm_active_enums, transactions};
use crate::error::map_db_err;

/// [`LedgerStore`] backed by a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
    lock_timeout: Duration,
}

impl PgStore {
    /// Creates a store whose write units wait at most `lock_timeout` for a row lock.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl LedgerStore for PgStore {
    type Unit = PgUnit;

    async fn begin(&self) -> StoreResult<PgUnit> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await
            .map_err(map_db_err)?;

        // Scoped to this transaction only
        let sql = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        txn.execute_unprepared(&sql).await.map_err(map_db_err)?;

        Ok(PgUnit { txn })
    }

    async fn begin_read(&self) -> StoreResult<PgUnit> {
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await
            .map_err(map_db_err)?;
        Ok(PgUnit { txn })
    }
}

/// Unit of work wrapping one database transaction.
pub struct PgUnit {
    txn: DatabaseTransaction,
}

impl PgUnit {
    /// Returns the underlying transaction for ad-hoc queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }
}

impl UnitOfWork for PgUnit {
    async fn commit(self) -> StoreResult<()> {
        self.txn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}

fn with_lock<E: EntityTrait>(query: Select<E>, lock: LockMode) -> Select<E> {
    match lock {
        LockMode::Plain => query,
        LockMode::ForUpdate => query.lock_exclusive(),
    }
}

fn to_utc(value: sea_orm::prelude::DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

fn to_u32(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::failure(format!("negative {column}: {value}")))
}

fn to_i32(value: u32, column: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::failure(format!("{column} out of range: {value}")))
}

// ============================================================
// ROW CONVERSIONS
// ============================================================

fn account_from_model(model: accounts::Model) -> StoreResult<Account> {
    let currency: Currency = model
        .currency
        .parse()
        .map_err(|e| StoreError::failure(format!("account {}: {e}", model.id)))?;
    Ok(Account {
        id: AccountId::new(model.id),
        customer_id: CustomerId::new(model.customer_id),
        branch_id: BranchId::new(model.branch_id),
        owner: model.owner,
        balance: model.balance,
        currency,
        created_at: to_utc(model.created_at),
    })
}

fn transaction_from_model(model: transactions::Model) -> StoreResult<Transaction> {
    let kind = TransactionKind::from_parts(
        model.from_account_id.map(AccountId::new),
        model.to_account_id.map(AccountId::new),
        model.loan_payment_id.map(LoanPaymentId::new),
    )
    .ok_or_else(|| {
        StoreError::failure(format!("transaction {} matches no entry kind", model.id))
    })?;
    Ok(Transaction {
        id: TransactionId::new(model.id),
        kind,
        beneficiary_id: model.beneficiary_id.map(BeneficiaryId::new),
        amount: model.amount,
        created_at: to_utc(model.created_at),
    })
}

fn loan_status_from_db(status: sea_orm_active_enums::LoanStatus) -> LoanStatus {
    match status {
        sea_orm_active_enums::LoanStatus::Approved => LoanStatus::Approved,
        sea_orm_active_enums::LoanStatus::PaidOff => LoanStatus::PaidOff,
    }
}

fn loan_status_to_db(status: LoanStatus) -> sea_orm_active_enums::LoanStatus {
    match status {
        LoanStatus::Approved => sea_orm_active_enums::LoanStatus::Approved,
        LoanStatus::PaidOff => sea_orm_active_enums::LoanStatus::PaidOff,
    }
}

fn payment_status_from_db(status: sea_orm_active_enums::PaymentStatus) -> PaymentStatus {
    match status {
        sea_orm_active_enums::PaymentStatus::Pending => PaymentStatus::Pending,
        sea_orm_active_enums::PaymentStatus::Paid => PaymentStatus::Paid,
    }
}

fn payment_status_to_db(status: PaymentStatus) -> sea_orm_active_enums::PaymentStatus {
    match status {
        PaymentStatus::Pending => sea_orm_active_enums::PaymentStatus::Pending,
        PaymentStatus::Paid => sea_orm_active_enums::PaymentStatus::Paid,
    }
}

fn loan_from_model(model: loans::Model) -> StoreResult<Loan> {
    Ok(Loan {
        id: LoanId::new(model.id),
        customer_id: CustomerId::new(model.customer_id),
        branch_id: BranchId::new(model.branch_id),
        principal: model.principal,
        annual_rate: model.annual_rate,
        term_months: to_u32(model.term_months, "term_months")?,
        installment: model.installment,
        total_payable: model.total_payable,
        status: loan_status_from_db(model.status),
        start_date: to_utc(model.start_date),
        end_date: to_utc(model.end_date),
        created_at: to_utc(model.created_at),
    })
}

fn payment_from_model(model: loan_payments::Model) -> StoreResult<LoanPayment> {
    Ok(LoanPayment {
        id: LoanPaymentId::new(model.id),
        loan_id: LoanId::new(model.loan_id),
        installment_number: to_u32(model.installment_number, "installment_number")?,
        amount: model.amount,
        due_date: to_utc(model.due_date),
        paid_date: model.paid_date.map(to_utc),
        status: payment_status_from_db(model.status),
    })
}

// ============================================================
// ENTITY STORES
// ============================================================

impl AccountStore for PgUnit {
    async fn create_account(&mut self, input: NewAccount) -> StoreResult<Account> {
        let model = accounts::ActiveModel {
            customer_id: Set(input.customer_id.into_inner()),
            branch_id: Set(input.branch_id.into_inner()),
            owner: Set(input.owner),
            balance: Set(Decimal::ZERO),
            currency: Set(input.currency.code().to_string()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(map_db_err)?;
        account_from_model(model)
    }

    async fn get_account(&mut self, id: AccountId, lock: LockMode) -> StoreResult<Option<Account>> {
        with_lock(accounts::Entity::find_by_id(id.into_inner()), lock)
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(account_from_model)
            .transpose()
    }

    async fn update_balance(&mut self, id: AccountId, balance: Decimal) -> StoreResult<()> {
        accounts::ActiveModel {
            id: Set(id.into_inner()),
            balance: Set(balance),
            ..Default::default()
        }
        .update(&self.txn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn list_accounts_by_customer(&mut self, customer_id: CustomerId) -> StoreResult<Vec<Account>> {
        accounts::Entity::find()
            .filter(accounts::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_asc(accounts::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(account_from_model)
            .collect()
    }
}

impl TransactionStore for PgUnit {
    async fn create_transaction(&mut self, input: NewTransaction) -> StoreResult<Transaction> {
        let model = transactions::ActiveModel {
            from_account_id: Set(input.kind.source().map(AccountId::into_inner)),
            to_account_id: Set(input.kind.destination().map(AccountId::into_inner)),
            loan_payment_id: Set(input.kind.loan_payment().map(LoanPaymentId::into_inner)),
            beneficiary_id: Set(input.beneficiary_id.map(BeneficiaryId::into_inner)),
            amount: Set(input.amount),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(map_db_err)?;
        transaction_from_model(model)
    }

    async fn list_transactions_by_account(&mut self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        let id = account_id.into_inner();
        transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::FromAccountId.eq(id))
                    .add(transactions::Column::ToAccountId.eq(id)),
            )
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(transaction_from_model)
            .collect()
    }
}

impl LoanStore for PgUnit {
    async fn create_loan(&mut self, input: NewLoan) -> StoreResult<Loan> {
        let model = loans::ActiveModel {
            customer_id: Set(input.customer_id.into_inner()),
            branch_id: Set(input.branch_id.into_inner()),
            principal: Set(input.principal),
            annual_rate: Set(input.annual_rate),
            term_months: Set(to_i32(input.term_months, "term_months")?),
            installment: Set(input.installment),
            total_payable: Set(input.total_payable),
            status: Set(sea_orm_active_enums::LoanStatus::Approved),
            start_date: Set(input.start_date.into()),
            end_date: Set(input.end_date.into()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(map_db_err)?;
        loan_from_model(model)
    }

    async fn get_loan(&mut self, id: LoanId, lock: LockMode) -> StoreResult<Option<Loan>> {
        with_lock(loans::Entity::find_by_id(id.into_inner()), lock)
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(loan_from_model)
            .transpose()
    }

    async fn list_loans_by_customer(&mut self, customer_id: CustomerId) -> StoreResult<Vec<Loan>> {
        loans::Entity::find()
            .filter(loans::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_asc(loans::Column::CreatedAt)
            .order_by_asc(loans::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(loan_from_model)
            .collect()
    }

    async fn update_loan_status(&mut self, id: LoanId, status: LoanStatus) -> StoreResult<()> {
        loans::ActiveModel {
            id: Set(id.into_inner()),
            status: Set(loan_status_to_db(status)),
            ..Default::default()
        }
        .update(&self.txn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }
}

impl LoanPaymentStore for PgUnit {
    async fn create_payment(&mut self, input: NewLoanPayment) -> StoreResult<LoanPayment> {
        let model = loan_payments::ActiveModel {
            loan_id: Set(input.loan_id.into_inner()),
            installment_number: Set(to_i32(input.installment_number, "installment_number")?),
            amount: Set(input.amount),
            due_date: Set(input.due_date.into()),
            paid_date: Set(None),
            status: Set(sea_orm_active_enums::PaymentStatus::Pending),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(map_db_err)?;
        payment_from_model(model)
    }

    async fn get_payment(&mut self, id: LoanPaymentId, lock: LockMode) -> StoreResult<Option<LoanPayment>> {
        with_lock(loan_payments::Entity::find_by_id(id.into_inner()), lock)
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(payment_from_model)
            .transpose()
    }

    async fn list_payments_by_loan(&mut self, loan_id: LoanId) -> StoreResult<Vec<LoanPayment>> {
        loan_payments::Entity::find()
            .filter(loan_payments::Column::LoanId.eq(loan_id.into_inner()))
            .order_by_asc(loan_payments::Column::DueDate)
            .order_by_asc(loan_payments::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(payment_from_model)
            .collect()
    }

    async fn count_paid_by_loan(&mut self, loan_id: LoanId) -> StoreResult<u32> {
        let paid = loan_payments::Entity::find()
            .filter(loan_payments::Column::LoanId.eq(loan_id.into_inner()))
            .filter(loan_payments::Column::Status.eq(sea_orm_active_enums::PaymentStatus::Paid))
            .count(&self.txn)
            .await
            .map_err(map_db_err)?;
        u32::try_from(paid).map_err(|_| StoreError::failure("paid installment count overflow"))
    }

    async fn update_payment_status(
        &mut self,
        id: LoanPaymentId,
        status: PaymentStatus,
        paid_date: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        loan_payments::ActiveModel {
            id: Set(id.into_inner()),
            status: Set(payment_status_to_db(status)),
            paid_date: Set(paid_date.map(Into::into)),
            ..Default::default()
        }
        .update(&self.txn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts() -> sea_orm::prelude::DateTimeWithTimeZone {
        Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap().into()
    }

    #[test]
    fn test_account_from_model() {
        let account = account_from_model(accounts::Model {
            id: 4,
            customer_id: 9,
            branch_id: 2,
            owner: "Ines".to_string(),
            balance: dec!(12.5000),
            currency: "EUR".to_string(),
            created_at: ts(),
        })
        .unwrap();
        assert_eq!(account.id, AccountId::new(4));
        assert_eq!(account.currency, Currency::Eur);
        assert_eq!(account.balance, dec!(12.5));
    }

    #[test]
    fn test_account_with_unknown_currency_is_failure() {
        let err = account_from_model(accounts::Model {
            id: 4,
            customer_id: 9,
            branch_id: 2,
            owner: "Ines".to_string(),
            balance: dec!(0),
            currency: "XXX".to_string(),
            created_at: ts(),
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Failure(_)));
    }

    #[test]
    fn test_transaction_kind_from_columns() {
        let model = transactions::Model {
            id: 1,
            from_account_id: Some(1),
            to_account_id: Some(2),
            loan_payment_id: None,
            beneficiary_id: None,
            amount: dec!(50),
            created_at: ts(),
        };
        let entry = transaction_from_model(model.clone()).unwrap();
        assert_eq!(
            entry.kind,
            TransactionKind::Transfer {
                from: AccountId::new(1),
                to: AccountId::new(2)
            }
        );

        let broken = transactions::Model {
            to_account_id: None,
            ..model
        };
        assert!(transaction_from_model(broken).is_err());
    }

    #[test]
    fn test_status_mapping_roundtrip() {
        for status in [LoanStatus::Approved, LoanStatus::PaidOff] {
            assert_eq!(loan_status_from_db(loan_status_to_db(status)), status);
        }
        for status in [PaymentStatus::Pending, PaymentStatus::Paid] {
            assert_eq!(payment_status_from_db(payment_status_to_db(status)), status);
        }
    }

    #[test]
    fn test_negative_term_is_failure() {
        assert!(to_u32(-1, "term_months").is_err());
        assert_eq!(to_u32(12, "term_months").unwrap(), 12);
        assert!(to_i32(u32::MAX, "term_months").is_err());
    }
}
