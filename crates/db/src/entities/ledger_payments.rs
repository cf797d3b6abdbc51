//! `SeaORM` Entity for ledger_payments table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{AccountStatus, PaymentMethod};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub record_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    pub payment_date: Date,
    pub method: PaymentMethod,
    pub bank_slip_number: Option<String>,
    pub pix_key: Option<String>,
    pub proof_reference: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub adjustment_interest: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub adjustment_fine: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub adjustment_discount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub effective_due_amount: Decimal,
    pub resulting_status: AccountStatus,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledger_records::Entity",
        from = "Column::RecordId",
        to = "super::ledger_records::Column::Id"
    )]
    LedgerRecords,
}

impl Related<super::ledger_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
