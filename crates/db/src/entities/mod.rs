//! `SeaORM` entity definitions.

pub mod installment_plans;
pub mod ledger_payments;
pub mod ledger_records;
pub mod sea_orm_active_enums;
