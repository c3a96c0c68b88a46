//! Deposit accounts and the append-only transaction ledger.
//!
//! - Account and ledger-entry types
//! - Transfer engine (deposits and account-to-account transfers)
//! - Account statements

pub mod statement;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod transfer_props;

pub use statement::StatementReader;
pub use transfer::TransferService;
pub use types::{Account, NewAccount, NewTransaction, Transaction, TransactionKind};
