//! Initial database migration.
//!
//! Creates the account, ledger and loan tables together with the enums,
//! check constraints and the trigger that keeps the ledger append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: LOANS
        // ============================================================
        db.execute_unprepared(LOANS_SQL).await?;
        db.execute_unprepared(LOAN_PAYMENTS_SQL).await?;

        // ============================================================
        // PART 4: LEDGER
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Loan lifecycle
CREATE TYPE loan_status AS ENUM ('approved', 'paid_off');

-- Installment status
CREATE TYPE payment_status AS ENUM ('pending', 'paid');
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id BIGSERIAL PRIMARY KEY,
    customer_id BIGINT NOT NULL,
    branch_id BIGINT NOT NULL,
    owner VARCHAR(255) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    currency VARCHAR(3) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_accounts_owner_not_blank CHECK (btrim(owner) <> ''),
    CONSTRAINT chk_accounts_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_accounts_currency CHECK (
        currency IN ('USD', 'EUR', 'GBP', 'INR', 'IDR', 'SGD', 'JPY')
    )
);

CREATE INDEX idx_accounts_customer ON accounts(customer_id);
";

const LOANS_SQL: &str = r"
CREATE TABLE loans (
    id BIGSERIAL PRIMARY KEY,
    customer_id BIGINT NOT NULL,
    branch_id BIGINT NOT NULL,
    principal NUMERIC(19, 4) NOT NULL,
    annual_rate NUMERIC(9, 4) NOT NULL,
    term_months INTEGER NOT NULL,
    installment NUMERIC(19, 4) NOT NULL,
    total_payable NUMERIC(19, 4) NOT NULL,
    status loan_status NOT NULL DEFAULT 'approved',
    start_date TIMESTAMPTZ NOT NULL,
    end_date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_loans_principal_positive CHECK (principal > 0),
    CONSTRAINT chk_loans_rate_non_negative CHECK (annual_rate >= 0),
    CONSTRAINT chk_loans_term_positive CHECK (term_months > 0),
    CONSTRAINT chk_loans_installment_positive CHECK (installment > 0),
    CONSTRAINT chk_loans_dates CHECK (end_date > start_date)
);

CREATE INDEX idx_loans_customer ON loans(customer_id);
";

const LOAN_PAYMENTS_SQL: &str = r"
CREATE TABLE loan_payments (
    id BIGSERIAL PRIMARY KEY,
    loan_id BIGINT NOT NULL REFERENCES loans(id),
    installment_number INTEGER NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    due_date TIMESTAMPTZ NOT NULL,
    paid_date TIMESTAMPTZ,
    status payment_status NOT NULL DEFAULT 'pending',

    CONSTRAINT uq_loan_payments_installment UNIQUE (loan_id, installment_number),
    CONSTRAINT chk_loan_payments_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_loan_payments_installment_positive CHECK (installment_number > 0),
    CONSTRAINT chk_loan_payments_paid_date CHECK (
        (status = 'paid') = (paid_date IS NOT NULL)
    )
);

CREATE INDEX idx_loan_payments_loan_due ON loan_payments(loan_id, due_date);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id BIGSERIAL PRIMARY KEY,
    from_account_id BIGINT REFERENCES accounts(id),
    to_account_id BIGINT REFERENCES accounts(id),
    loan_payment_id BIGINT REFERENCES loan_payments(id),
    beneficiary_id BIGINT,
    amount NUMERIC(19, 4) NOT NULL,
    -- Insert time rather than transaction start
    created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),

    CONSTRAINT chk_transactions_amount_positive CHECK (amount > 0),
    -- Exactly one kind: transfer, deposit, or loan payment
    CONSTRAINT chk_transactions_kind CHECK (
        (from_account_id IS NOT NULL AND to_account_id IS NOT NULL
            AND loan_payment_id IS NULL AND from_account_id <> to_account_id)
        OR (from_account_id IS NULL AND to_account_id IS NOT NULL AND loan_payment_id IS NULL)
        OR (from_account_id IS NULL AND to_account_id IS NULL AND loan_payment_id IS NOT NULL)
    )
);

CREATE INDEX idx_transactions_from ON transactions(from_account_id, created_at, id);
CREATE INDEX idx_transactions_to ON transactions(to_account_id, created_at, id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_transaction_modification
-- The ledger is append-only.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_transaction_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Ledger entries are immutable. Record a new entry instead.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_transaction_mod
BEFORE UPDATE OR DELETE ON transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_transaction_modification();
";

const DROP_ALL_SQL: &str = r"
-- Drop triggers
DROP TRIGGER IF EXISTS trg_prevent_transaction_mod ON transactions;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_transaction_modification();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS loan_payments CASCADE;
DROP TABLE IF EXISTS loans CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

-- Drop enums
DROP TYPE IF EXISTS payment_status CASCADE;
DROP TYPE IF EXISTS loan_status CASCADE;
";
