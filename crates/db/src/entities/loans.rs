//! `SeaORM` Entity for loans table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::LoanStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub customer_id: i64,
    pub branch_id: i64,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub principal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((9, 4)))")]
    pub annual_rate: Decimal,
    pub term_months: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub installment: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_payable: Decimal,
    pub status: LoanStatus,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::loan_payments::Entity")]
    LoanPayments,
}

impl Related<super::loan_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
