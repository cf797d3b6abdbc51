//! Accounts payable / receivable ledger engine.
//!
//! One engine serves both directions; [`LedgerDirection`] only changes how
//! the counterparty is named and which routes expose it.
//!
//! # Modules
//!
//! - `types` - Ledger records, statuses, payment methods
//! - `money` - Fixed-precision amounts and remainder-preserving splits
//! - `error` - Engine error taxonomy
//! - `state` - Status state machine, cancellation, deletion rules
//! - `update` - Pre-payment edits
//! - `approval` - Role-gated approval
//! - `payment` - Payment application with adjustments
//! - `installment` - Installment plan generation
//! - `sweep` - Overdue sweep policy

pub mod approval;
pub mod error;
pub mod installment;
pub mod money;
pub mod payment;
pub mod state;
pub mod sweep;
pub mod types;
pub mod update;

#[cfg(test)]
mod service_props;

pub use approval::{ApprovalAction, ApprovalGate, UserRole};
pub use error::AccountsError;
pub use installment::{InstallmentPlan, InstallmentPlanHeader, InstallmentPlanner};
pub use money::{Adjustments, AmountBreakdown, AMOUNT_LIMIT};
pub use payment::{PaymentEvent, PaymentInput, PaymentOutcome, PaymentProcessor};
pub use state::{CancelAction, StatusMachine};
pub use sweep::SweepPolicy;
pub use types::{
    AccountStatus, Approval, Cancellation, InstallmentLink, LedgerDirection, LedgerRecord,
    NewLedgerRecord, PaymentDetails, PaymentMethod, MAX_BANK_SLIP_NUMBER_LEN,
    MAX_INVOICE_NUMBER_LEN, MAX_PIX_KEY_LEN,
};
pub use update::RecordUpdate;
