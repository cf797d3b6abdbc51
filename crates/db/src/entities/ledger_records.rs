//! `SeaORM` Entity for ledger_records table.
//!
//! One table holds both payables and receivables, told apart by `direction`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{AccountStatus, LedgerDirection, PaymentMethod};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub direction: LedgerDirection,
    pub counterparty_id: Uuid,
    pub invoice_number: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub original_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub discount_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub interest_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub fine_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub net_amount: Decimal,
    pub issue_date: Date,
    pub due_date: Date,
    pub payment_date: Option<Date>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub paid_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub adjustment_interest: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub adjustment_fine: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub adjustment_discount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub bank_slip_number: Option<String>,
    pub pix_key: Option<String>,
    pub proof_reference: Option<String>,
    pub status: AccountStatus,
    pub requires_approval: bool,
    pub approved_by: Option<Uuid>,
    pub approval_date: Option<DateTimeWithTimeZone>,
    pub approval_notes: Option<String>,
    pub category_id: Option<Uuid>,
    pub cost_center_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub installment_number: Option<i32>,
    pub installment_count: Option<i32>,
    pub created_by: Uuid,
    pub settled_by: Option<Uuid>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub cancellation_reason: Option<String>,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::installment_plans::Entity",
        from = "Column::ParentId",
        to = "super::installment_plans::Column::Id"
    )]
    InstallmentPlans,
    #[sea_orm(has_many = "super::ledger_payments::Entity")]
    LedgerPayments,
}

impl Related<super::installment_plans::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InstallmentPlans.def()
    }
}

impl Related<super::ledger_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
