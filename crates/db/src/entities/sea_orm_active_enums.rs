//! String-backed enums shared by the ledger tables.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LedgerDirection {
    #[sea_orm(string_value = "payable")]
    Payable,
    #[sea_orm(string_value = "receivable")]
    Receivable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AccountStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "overdue")]
    Overdue,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "bank_slip")]
    BankSlip,
    #[sea_orm(string_value = "pix")]
    Pix,
    #[sea_orm(string_value = "credit_card")]
    CreditCard,
    #[sea_orm(string_value = "debit_card")]
    DebitCard,
    #[sea_orm(string_value = "check")]
    Check,
    #[sea_orm(string_value = "other")]
    Other,
}

impl From<ledgerly_core::accounts::LedgerDirection> for LedgerDirection {
    fn from(value: ledgerly_core::accounts::LedgerDirection) -> Self {
        match value {
            ledgerly_core::accounts::LedgerDirection::Payable => Self::Payable,
            ledgerly_core::accounts::LedgerDirection::Receivable => Self::Receivable,
        }
    }
}

impl From<LedgerDirection> for ledgerly_core::accounts::LedgerDirection {
    fn from(value: LedgerDirection) -> Self {
        match value {
            LedgerDirection::Payable => Self::Payable,
            LedgerDirection::Receivable => Self::Receivable,
        }
    }
}

impl From<ledgerly_core::accounts::AccountStatus> for AccountStatus {
    fn from(value: ledgerly_core::accounts::AccountStatus) -> Self {
        use ledgerly_core::accounts::AccountStatus as Core;
        match value {
            Core::Pending => Self::Pending,
            Core::PartiallyPaid => Self::PartiallyPaid,
            Core::Paid => Self::Paid,
            Core::Overdue => Self::Overdue,
            Core::Cancelled => Self::Cancelled,
        }
    }
}

impl From<AccountStatus> for ledgerly_core::accounts::AccountStatus {
    fn from(value: AccountStatus) -> Self {
        match value {
            AccountStatus::Pending => Self::Pending,
            AccountStatus::PartiallyPaid => Self::PartiallyPaid,
            AccountStatus::Paid => Self::Paid,
            AccountStatus::Overdue => Self::Overdue,
            AccountStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ledgerly_core::accounts::PaymentMethod> for PaymentMethod {
    fn from(value: ledgerly_core::accounts::PaymentMethod) -> Self {
        use ledgerly_core::accounts::PaymentMethod as Core;
        match value {
            Core::Cash => Self::Cash,
            Core::BankTransfer => Self::BankTransfer,
            Core::BankSlip => Self::BankSlip,
            Core::Pix => Self::Pix,
            Core::CreditCard => Self::CreditCard,
            Core::DebitCard => Self::DebitCard,
            Core::Check => Self::Check,
            Core::Other => Self::Other,
        }
    }
}

impl From<PaymentMethod> for ledgerly_core::accounts::PaymentMethod {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::BankSlip => Self::BankSlip,
            PaymentMethod::Pix => Self::Pix,
            PaymentMethod::CreditCard => Self::CreditCard,
            PaymentMethod::DebitCard => Self::DebitCard,
            PaymentMethod::Check => Self::Check,
            PaymentMethod::Other => Self::Other,
        }
    }
}
