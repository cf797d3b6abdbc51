//! `SeaORM` Entity for installment_plans table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::LedgerDirection;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "installment_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub direction: LedgerDirection,
    pub source_record_id: Uuid,
    pub installment_count: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 6)))", nullable)]
    pub interest_rate: Option<Decimal>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_records::Entity")]
    LedgerRecords,
}

impl Related<super::ledger_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
