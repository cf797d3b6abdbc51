//! Domain types shared by both ledger directions.
//!
//! A [`LedgerRecord`] is the engine's snapshot of one payable or receivable.
//! The store converts rows to and from this type; every business decision is
//! taken against it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use ledgerly_shared::types::LedgerRecordId;

use crate::accounts::error::AccountsError;
use crate::accounts::money::{Adjustments, AmountBreakdown};

/// Longest invoice number the store accepts, in characters.
pub const MAX_INVOICE_NUMBER_LEN: usize = 100;

/// Longest bank slip number the store accepts, in characters.
pub const MAX_BANK_SLIP_NUMBER_LEN: usize = 100;

/// Longest pix key the store accepts, in characters.
pub const MAX_PIX_KEY_LEN: usize = 150;

fn bounded_text(name: &str, value: String, max_len: usize) -> Result<String, AccountsError> {
    if value.chars().count() > max_len {
        return Err(AccountsError::validation(format!(
            "{name} cannot be longer than {max_len} characters"
        )));
    }
    Ok(value)
}

/// Trims and checks an invoice number.
///
/// # Errors
///
/// `Validation` when blank or longer than [`MAX_INVOICE_NUMBER_LEN`].
pub fn invoice_number(raw: &str) -> Result<String, AccountsError> {
    let number = raw.trim();
    if number.is_empty() {
        return Err(AccountsError::validation("invoice number is required"));
    }
    bounded_text("invoice number", number.to_string(), MAX_INVOICE_NUMBER_LEN)
}

/// Which side of the ledger a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerDirection {
    /// Money owed to a supplier.
    Payable,
    /// Money owed by a customer.
    Receivable,
}

impl LedgerDirection {
    /// Both directions, payable first.
    pub const ALL: [Self; 2] = [Self::Payable, Self::Receivable];

    /// Returns the string representation of the direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payable => "payable",
            Self::Receivable => "receivable",
        }
    }

    /// URL collection segment for this direction.
    #[must_use]
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Payable => "accounts-payable",
            Self::Receivable => "accounts-receivable",
        }
    }

    /// What the counterparty is called on this side.
    #[must_use]
    pub fn counterparty_kind(&self) -> &'static str {
        match self {
            Self::Payable => "supplier",
            Self::Receivable => "customer",
        }
    }

    /// Verb used for settling a record (`pay` / `receive`).
    #[must_use]
    pub fn settlement_verb(&self) -> &'static str {
        match self {
            Self::Payable => "pay",
            Self::Receivable => "receive",
        }
    }
}

impl fmt::Display for LedgerDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a ledger record.
///
/// Valid transitions:
/// - Pending → PartiallyPaid | Paid | Overdue | Cancelled
/// - PartiallyPaid → Paid | Overdue | Cancelled
/// - Overdue → PartiallyPaid | Paid | Cancelled
///
/// `Paid` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Open, nothing paid yet.
    Pending,
    /// Some money applied, balance remaining.
    PartiallyPaid,
    /// Fully settled (terminal).
    Paid,
    /// Past due; set only by the sweeper.
    Overdue,
    /// Administratively cancelled (terminal).
    Cancelled,
}

impl AccountStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::PartiallyPaid,
        Self::Paid,
        Self::Overdue,
        Self::Cancelled,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "partially_paid" | "partiallypaid" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no transition may leave this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank wire / transfer.
    BankTransfer,
    /// Bank slip (boleto); carries a slip number.
    BankSlip,
    /// Instant payment; carries a pix key.
    Pix,
    /// Credit card.
    CreditCard,
    /// Debit card.
    DebitCard,
    /// Cheque.
    Check,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::BankSlip => "bank_slip",
            Self::Pix => "pix",
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Check => "check",
            Self::Other => "other",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "bank_slip" => Some(Self::BankSlip),
            "pix" => Some(Self::Pix),
            "credit_card" => Some(Self::CreditCard),
            "debit_card" => Some(Self::DebitCard),
            "check" => Some(Self::Check),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Method-specific payment data. At most one variant applies, dictated by
/// the payment method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentDetails {
    /// No method-specific data.
    #[default]
    None,
    /// Bank slip number.
    BankSlip {
        /// The slip's barcode / number.
        number: String,
    },
    /// Pix key used for the transfer.
    Pix {
        /// The pix key.
        key: String,
    },
}

impl PaymentDetails {
    /// Builds the details for `method` from the optional raw fields.
    ///
    /// # Errors
    ///
    /// `Validation` if a field is supplied for a method it does not belong
    /// to, or is longer than the store accepts.
    pub fn for_method(
        method: PaymentMethod,
        bank_slip_number: Option<String>,
        pix_key: Option<String>,
    ) -> Result<Self, AccountsError> {
        let bank_slip_number = bank_slip_number
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| bounded_text("bank slip number", s, MAX_BANK_SLIP_NUMBER_LEN))
            .transpose()?;
        let pix_key = pix_key
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| bounded_text("pix key", s, MAX_PIX_KEY_LEN))
            .transpose()?;

        match method {
            PaymentMethod::BankSlip => {
                if pix_key.is_some() {
                    return Err(AccountsError::validation(
                        "pix key is only allowed for pix payments",
                    ));
                }
                Ok(bank_slip_number.map_or(Self::None, |number| Self::BankSlip { number }))
            }
            PaymentMethod::Pix => {
                if bank_slip_number.is_some() {
                    return Err(AccountsError::validation(
                        "bank slip number is only allowed for bank slip payments",
                    ));
                }
                Ok(pix_key.map_or(Self::None, |key| Self::Pix { key }))
            }
            _ => {
                if bank_slip_number.is_some() || pix_key.is_some() {
                    return Err(AccountsError::validation(format!(
                        "method {method} does not take a bank slip number or pix key"
                    )));
                }
                Ok(Self::None)
            }
        }
    }

    /// The bank slip number, if any.
    #[must_use]
    pub fn bank_slip_number(&self) -> Option<&str> {
        match self {
            Self::BankSlip { number } => Some(number),
            _ => None,
        }
    }

    /// The pix key, if any.
    #[must_use]
    pub fn pix_key(&self) -> Option<&str> {
        match self {
            Self::Pix { key } => Some(key),
            _ => None,
        }
    }
}

/// Approval sign-off on a gated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// Who approved.
    pub approved_by: Uuid,
    /// When.
    pub approval_date: DateTime<Utc>,
    /// Free-text notes.
    pub approval_notes: Option<String>,
}

/// Installment linkage of a generated child record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentLink {
    /// The plan every sibling points to.
    pub plan_id: Uuid,
    /// 1-based position within the plan.
    pub number: i32,
    /// Number of installments in the plan.
    pub count: i32,
}

/// Cancellation audit data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    /// Who cancelled.
    pub cancelled_by: Uuid,
    /// When.
    pub cancelled_at: DateTime<Utc>,
    /// Why.
    pub reason: Option<String>,
}

/// Snapshot of one ledger record.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord {
    /// Record ID.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Payable or receivable.
    pub direction: LedgerDirection,
    /// Supplier (payable) or customer (receivable).
    pub counterparty_id: Uuid,
    /// External document reference.
    pub invoice_number: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Amount components fixed at creation.
    pub amounts: AmountBreakdown,
    /// Derived net amount.
    pub net_amount: Decimal,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Due date (immutable).
    pub due_date: NaiveDate,
    /// Date of the latest payment.
    pub payment_date: Option<NaiveDate>,
    /// Total applied so far.
    pub paid_amount: Decimal,
    /// Running total of payment-time adjustments.
    pub adjustments: Adjustments,
    /// Method of the latest payment.
    pub payment_method: Option<PaymentMethod>,
    /// Method-specific data of the latest payment.
    pub payment_details: PaymentDetails,
    /// Proof-of-payment reference of the latest payment.
    pub proof_reference: Option<String>,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Whether payment is gated on approval.
    pub requires_approval: bool,
    /// Approval sign-off, once given.
    pub approval: Option<Approval>,
    /// Classification.
    pub category_id: Option<Uuid>,
    /// Classification.
    pub cost_center_id: Option<Uuid>,
    /// Installment linkage for plan children.
    pub installment: Option<InstallmentLink>,
    /// Creator.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// User who applied the latest payment (paid by / received by).
    pub settled_by: Option<Uuid>,
    /// Cancellation audit data.
    pub cancellation: Option<Cancellation>,
    /// Row-state token for compare-and-set writes.
    pub version: i64,
}

/// Input for creating a ledger record directly.
#[derive(Debug, Clone)]
pub struct NewLedgerRecord {
    /// Owning organization.
    pub organization_id: Uuid,
    /// Payable or receivable.
    pub direction: LedgerDirection,
    /// Supplier or customer.
    pub counterparty_id: Uuid,
    /// External document reference.
    pub invoice_number: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Face value.
    pub original_amount: Decimal,
    /// Discount at creation.
    pub discount_amount: Decimal,
    /// Interest at creation.
    pub interest_amount: Decimal,
    /// Fine at creation.
    pub fine_amount: Decimal,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Whether payment is gated on approval.
    pub requires_approval: bool,
    /// Classification.
    pub category_id: Option<Uuid>,
    /// Classification.
    pub cost_center_id: Option<Uuid>,
}

impl LedgerRecord {
    /// Validates `input` and builds a fresh `Pending` record.
    ///
    /// # Errors
    ///
    /// `Validation` for a nil counterparty, blank or over-long invoice
    /// number, invalid amounts, or a due date before the issue date.
    pub fn create(
        input: NewLedgerRecord,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Self, AccountsError> {
        if input.counterparty_id.is_nil() {
            return Err(AccountsError::validation(format!(
                "{} is required",
                input.direction.counterparty_kind()
            )));
        }
        let invoice_number = invoice_number(&input.invoice_number)?;
        if input.due_date < input.issue_date {
            return Err(AccountsError::validation(
                "due date cannot be before issue date",
            ));
        }

        let amounts = AmountBreakdown::new(
            input.original_amount,
            input.discount_amount,
            input.interest_amount,
            input.fine_amount,
        )?;

        Ok(Self {
            id: LedgerRecordId::new().into_inner(),
            organization_id: input.organization_id,
            direction: input.direction,
            counterparty_id: input.counterparty_id,
            invoice_number,
            description: input.description.filter(|d| !d.trim().is_empty()),
            amounts,
            net_amount: amounts.net(),
            issue_date: input.issue_date,
            due_date: input.due_date,
            payment_date: None,
            paid_amount: Decimal::ZERO,
            adjustments: Adjustments::default(),
            payment_method: None,
            payment_details: PaymentDetails::None,
            proof_reference: None,
            status: AccountStatus::Pending,
            requires_approval: input.requires_approval,
            approval: None,
            category_id: input.category_id,
            cost_center_id: input.cost_center_id,
            installment: None,
            created_by,
            created_at: now,
            settled_by: None,
            cancellation: None,
            version: 0,
        })
    }

    /// Net amount plus every payment-time adjustment applied so far.
    #[must_use]
    pub fn adjusted_due_amount(&self) -> Decimal {
        self.net_amount + self.adjustments.net_effect()
    }

    /// What is still owed at the current adjusted due amount.
    #[must_use]
    pub fn outstanding_amount(&self) -> Decimal {
        (self.adjusted_due_amount() - self.paid_amount).max(Decimal::ZERO)
    }

    /// True when gated on approval and not yet approved.
    #[must_use]
    pub fn awaits_approval(&self) -> bool {
        self.requires_approval && self.approval.is_none()
    }

    /// True while nothing has been paid and the record is still open.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.paid_amount.is_zero() && matches!(self.status, AccountStatus::Pending | AccountStatus::Overdue)
    }

    /// Replaces the amount components, keeping the net amount in sync.
    pub fn set_amounts(&mut self, amounts: AmountBreakdown) {
        self.amounts = amounts;
        self.net_amount = amounts.net();
    }
}

#[cfg(test)]
pub(crate) fn sample_input(direction: LedgerDirection) -> NewLedgerRecord {
    NewLedgerRecord {
        organization_id: Uuid::new_v4(),
        direction,
        counterparty_id: Uuid::new_v4(),
        invoice_number: "INV-001".to_string(),
        description: None,
        original_amount: Decimal::new(100_000, 2),
        discount_amount: Decimal::ZERO,
        interest_amount: Decimal::ZERO,
        fine_amount: Decimal::ZERO,
        issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
        due_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap_or_default(),
        requires_approval: false,
        category_id: None,
        cost_center_id: None,
    }
}

/// Pending record of `original` with no charges, due 2025-01-31.
#[cfg(test)]
pub(crate) fn sample_record(direction: LedgerDirection, original: Decimal) -> LedgerRecord {
    let mut input = sample_input(direction);
    input.original_amount = original;
    LedgerRecord::create(input, Uuid::new_v4(), Utc::now()).unwrap()
}
