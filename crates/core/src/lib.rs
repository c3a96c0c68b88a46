//! Core business logic for Bankcore.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the store traits in [`store`].
//!
//! # Modules
//!
//! - `ledger` - Accounts, deposits, transfers and statements
//! - `loan` - Amortization and the loan lifecycle
//! - `store` - Unit-of-work store traits and the in-memory store
//! - `retry` - Re-running operations that hit contention
//! - `error` - The error taxonomy shared by every operation

pub mod error;
pub mod ledger;
pub mod loan;
pub mod retry;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{StatementReader, TransferService};
pub use loan::LoanService;
pub use retry::retry_on_contention;
pub use store::{InMemoryStore, LedgerStore, StoreError, UnitOfWork};
