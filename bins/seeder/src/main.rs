//! Development data seeder for Bankcore.
//!
//! Applies pending migrations, then opens two accounts, funds and links them
//! with a deposit and a transfer, and originates a small loan with its first
//! installment paid. Everything goes through the core services so the seeded
//! rows obey the same rules as production traffic.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use bankcore_core::ledger::types::NewAccount;
use bankcore_core::loan::types::CreateLoanInput;
use bankcore_core::{LoanService, StatementReader, TransferService, retry_on_contention};
use bankcore_db::migration::{Migrator, MigratorTrait};
use bankcore_shared::config::AppConfig;
use bankcore_shared::types::{BranchId, Currency, CustomerId};
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset: this binary plus the library crates.
const DEFAULT_LOG_FILTER: &str = "seeder=debug,bankcore=debug";

/// Customer that owns every seeded row.
const SEED_CUSTOMER: CustomerId = CustomerId::new(1);
/// Branch every seeded row is booked at.
const SEED_BRANCH: BranchId = BranchId::new(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    info!("Connecting to database...");
    let store = bankcore_db::connect_store(&config.database)
        .await
        .context("Failed to connect to database")?;

    info!("Applying migrations...");
    Migrator::up(store.connection(), None)
        .await
        .context("Failed to apply migrations")?;

    let store = Arc::new(store);
    let transfers = TransferService::new(Arc::clone(&store));
    let loans = LoanService::new(Arc::clone(&store), config.ledger.rounding_scale)?;
    let statements = StatementReader::new(Arc::clone(&store));
    let retries = config.ledger.contention_retries;

    info!("Seeding accounts...");
    let checking = transfers
        .create_account(NewAccount {
            customer_id: SEED_CUSTOMER,
            branch_id: SEED_BRANCH,
            owner: "Ada Lovelace".to_string(),
            currency: Currency::Usd,
        })
        .await?;
    let savings = transfers
        .create_account(NewAccount {
            customer_id: SEED_CUSTOMER,
            branch_id: SEED_BRANCH,
            owner: "Ada Lovelace".to_string(),
            currency: Currency::Usd,
        })
        .await?;

    info!("Seeding ledger entries...");
    retry_on_contention(retries, || transfers.deposit(checking.id, dec!(5000))).await?;
    retry_on_contention(retries, || {
        transfers.transfer(checking.id, savings.id, dec!(1250.50))
    })
    .await?;

    info!("Seeding loan...");
    let loan = loans
        .create_loan(CreateLoanInput {
            principal: dec!(12000),
            annual_rate: dec!(12),
            term_months: 12,
            customer_id: SEED_CUSTOMER,
            branch_id: SEED_BRANCH,
        })
        .await?;
    if let Some(first) = loan.payments.first() {
        retry_on_contention(retries, || loans.make_payment(first.id, loan.loan.id)).await?;
    }

    let entries = statements.get_statement(checking.id).await?;
    info!(
        checking = %checking.id,
        savings = %savings.id,
        loan = %loan.loan.id,
        installment = %loan.loan.installment,
        checking_entries = entries.len(),
        "Seeding complete"
    );

    Ok(())
}
