//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::loan_payments::Entity as LoanPayments;
pub use super::loans::Entity as Loans;
pub use super::transactions::Entity as Transactions;
