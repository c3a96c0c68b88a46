//! `SeaORM` entities for the bankcore schema.

pub mod prelude;

pub mod accounts;
pub mod loan_payments;
pub mod loans;
pub mod sea_orm_active_enums;
pub mod transactions;
