//! `SeaORM` Entity for transactions table.
//!
//! Rows are insert-only; a trigger rejects UPDATE and DELETE.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub from_account_id: Option<i64>,
    pub to_account_id: Option<i64>,
    pub loan_payment_id: Option<i64>,
    pub beneficiary_id: Option<i64>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loan_payments::Entity",
        from = "Column::LoanPaymentId",
        to = "super::loan_payments::Column::Id"
    )]
    LoanPayments,
}

impl Related<super::loan_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
