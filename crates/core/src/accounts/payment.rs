//! Payment processor.
//!
//! Applies money to a ledger record. Payment-time adjustments move the
//! effective due amount of the event; they never touch `net_amount`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use ledgerly_shared::types::LedgerPaymentId;

use crate::accounts::approval::ApprovalGate;
use crate::accounts::error::AccountsError;
use crate::accounts::money::{checked_sum, exceeds_with_tolerance, parse_amount, Adjustments};
use crate::accounts::state::StatusMachine;
use crate::accounts::types::{AccountStatus, LedgerRecord, PaymentDetails, PaymentMethod};

/// Default rounding tolerance accepted above the effective due amount (0.01).
#[must_use]
pub fn default_payment_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// One payment event as requested by a caller.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    /// Amount being applied.
    pub amount: Decimal,
    /// Payment method.
    pub method: PaymentMethod,
    /// Method-specific data.
    pub details: PaymentDetails,
    /// Date the money moved.
    pub payment_date: NaiveDate,
    /// Proof-of-payment reference.
    pub proof_reference: Option<String>,
    /// Interest, fine and discount charged or granted with this event.
    pub adjustments: Adjustments,
    /// Acting user.
    pub settled_by: Uuid,
}

/// History row for one applied payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    /// Event id.
    pub id: Uuid,
    /// Record the money was applied to.
    pub record_id: Uuid,
    /// Amount credited to `paid_amount` by this event.
    pub amount: Decimal,
    /// Date the money moved.
    pub payment_date: NaiveDate,
    /// Payment method.
    pub method: PaymentMethod,
    /// Method-specific data.
    pub details: PaymentDetails,
    /// Proof-of-payment reference.
    pub proof_reference: Option<String>,
    /// Adjustments of this event only.
    pub adjustments: Adjustments,
    /// Effective due amount at the time of this event.
    pub effective_due_amount: Decimal,
    /// Status the record ended in.
    pub resulting_status: AccountStatus,
    /// Acting user.
    pub created_by: Uuid,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// Every field change a payment makes, plus its history row.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    /// Status before the payment.
    pub from: AccountStatus,
    /// Status after the payment.
    pub to: AccountStatus,
    /// New cumulative paid amount.
    pub paid_amount: Decimal,
    /// New running adjustment totals.
    pub adjustments: Adjustments,
    /// Effective due amount for this event.
    pub effective_due_amount: Decimal,
    /// History row to insert alongside the record update.
    pub event: PaymentEvent,
}

impl PaymentOutcome {
    /// Applies the payment to a record snapshot.
    pub fn apply_to(&self, record: &mut LedgerRecord) {
        record.status = self.to;
        record.paid_amount = self.paid_amount;
        record.adjustments = self.adjustments;
        record.payment_date = Some(self.event.payment_date);
        record.payment_method = Some(self.event.method);
        record.payment_details = self.event.details.clone();
        record.proof_reference = self.event.proof_reference.clone();
        record.settled_by = Some(self.event.created_by);
    }
}

/// Applies payments under a fixed over-payment tolerance.
#[derive(Debug, Clone, Copy)]
pub struct PaymentProcessor {
    tolerance: Decimal,
}

impl Default for PaymentProcessor {
    fn default() -> Self {
        Self::new(default_payment_tolerance())
    }
}

impl PaymentProcessor {
    /// Creates a processor; a negative tolerance is treated as zero.
    #[must_use]
    pub fn new(tolerance: Decimal) -> Self {
        Self {
            tolerance: tolerance.max(Decimal::ZERO),
        }
    }

    /// The configured tolerance.
    #[must_use]
    pub fn tolerance(&self) -> Decimal {
        self.tolerance
    }

    /// Decide the effect of one payment on `record`.
    ///
    /// The record itself is not modified; call [`PaymentOutcome::apply_to`]
    /// once the outcome has been persisted.
    ///
    /// # Errors
    /// * `InvalidState` if the record is paid or cancelled
    /// * `ApprovalRequired` if the record is gated and unapproved
    /// * `Validation` for a non-positive or unstorable amount, or an
    ///   over-payment beyond tolerance
    pub fn apply(
        &self,
        record: &LedgerRecord,
        input: PaymentInput,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, AccountsError> {
        if record.status.is_terminal() {
            return Err(AccountsError::invalid_state(
                record.status,
                "no further payments can be applied",
            ));
        }
        ApprovalGate::ensure_payable(record)?;

        let amount = parse_amount("payment amount", input.amount)?;
        if amount.is_zero() {
            return Err(AccountsError::validation("payment amount must be positive"));
        }

        let adjustments = record.adjustments.accumulate(&input.adjustments)?;
        let effective_due = checked_sum(
            "amount due",
            record.adjusted_due_amount(),
            input.adjustments.net_effect(),
        )?;
        if effective_due <= record.paid_amount {
            return Err(AccountsError::validation(format!(
                "adjustments would bring the amount due to {effective_due}, \
                 not above the {} already paid",
                record.paid_amount
            )));
        }
        let requested = checked_sum("paid amount", record.paid_amount, amount)?;
        if exceeds_with_tolerance(requested, effective_due, self.tolerance) {
            return Err(AccountsError::validation(format!(
                "payment of {amount} exceeds the outstanding balance of {}",
                (effective_due - record.paid_amount).max(Decimal::ZERO)
            )));
        }

        // Rounding slack within tolerance settles the record exactly.
        let paid_amount = if requested > effective_due {
            effective_due
        } else {
            requested
        };
        let to = StatusMachine::settlement_status(record.status, paid_amount, effective_due)?;
        let credited = paid_amount - record.paid_amount;

        Ok(PaymentOutcome {
            from: record.status,
            to,
            paid_amount,
            adjustments,
            effective_due_amount: effective_due,
            event: PaymentEvent {
                id: LedgerPaymentId::new().into_inner(),
                record_id: record.id,
                amount: credited,
                payment_date: input.payment_date,
                method: input.method,
                details: input.details,
                proof_reference: input.proof_reference.filter(|p| !p.trim().is_empty()),
                adjustments: input.adjustments,
                effective_due_amount: effective_due,
                resulting_status: to,
                created_by: input.settled_by,
                created_at: now,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::money::AMOUNT_LIMIT;
    use crate::accounts::types::{sample_record, LedgerDirection};
    use rust_decimal_macros::dec;

    fn payment(amount: Decimal) -> PaymentInput {
        PaymentInput {
            amount,
            method: PaymentMethod::BankTransfer,
            details: PaymentDetails::None,
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            proof_reference: None,
            adjustments: Adjustments::default(),
            settled_by: Uuid::new_v4(),
        }
    }

    fn pay(record: &mut LedgerRecord, input: PaymentInput) -> Result<PaymentOutcome, AccountsError> {
        let outcome = PaymentProcessor::default().apply(record, input, Utc::now())?;
        outcome.apply_to(record);
        Ok(outcome)
    }

    #[test]
    fn test_default_tolerance_is_one_cent() {
        assert_eq!(PaymentProcessor::default().tolerance(), dec!(0.01));
        assert_eq!(PaymentProcessor::new(dec!(-1)).tolerance(), Decimal::ZERO);
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(1000.00));

        let first = pay(&mut record, payment(dec!(600.00))).unwrap();
        assert_eq!(first.to, AccountStatus::PartiallyPaid);
        assert_eq!(record.paid_amount, dec!(600.00));
        assert_eq!(record.outstanding_amount(), dec!(400.00));

        let second = pay(&mut record, payment(dec!(400.00))).unwrap();
        assert_eq!(second.from, AccountStatus::PartiallyPaid);
        assert_eq!(record.status, AccountStatus::Paid);
        assert_eq!(record.payment_date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(second.event.amount, dec!(400.00));
    }

    #[test]
    fn test_overpayment_rejected_and_record_unchanged() {
        let record = sample_record(LedgerDirection::Receivable, dec!(100.00));
        let before = record.clone();

        let result = PaymentProcessor::default().apply(&record, payment(dec!(100.02)), Utc::now());
        assert!(matches!(result, Err(AccountsError::Validation(_))));
        assert_eq!(record, before);
    }

    #[test]
    fn test_overpayment_within_tolerance_snaps_to_due() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100.00));
        let outcome = pay(&mut record, payment(dec!(100.01))).unwrap();

        assert_eq!(record.paid_amount, dec!(100.00));
        assert_eq!(record.status, AccountStatus::Paid);
        assert_eq!(outcome.event.amount, dec!(100.00));
    }

    #[test]
    fn test_adjustments_raise_due_without_touching_net() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(1000.00));
        let mut input = payment(dec!(1030.00));
        input.adjustments = Adjustments::new(Some(dec!(20)), Some(dec!(15)), Some(dec!(5))).unwrap();

        let outcome = pay(&mut record, input).unwrap();
        assert_eq!(outcome.effective_due_amount, dec!(1030.00));
        assert_eq!(record.net_amount, dec!(1000.00));
        assert_eq!(record.status, AccountStatus::Paid);
        assert_eq!(record.adjustments.net_effect(), dec!(30));
    }

    #[test]
    fn test_prior_adjustments_carry_into_later_payments() {
        let mut record = sample_record(LedgerDirection::Receivable, dec!(100.00));
        let mut first = payment(dec!(50.00));
        first.adjustments = Adjustments::new(Some(dec!(10)), None, None).unwrap();
        pay(&mut record, first).unwrap();

        let outcome = pay(&mut record, payment(dec!(60.00))).unwrap();
        assert_eq!(outcome.effective_due_amount, dec!(110.00));
        assert_eq!(record.status, AccountStatus::Paid);
    }

    #[test]
    fn test_payment_on_closed_record_rejected() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(10));
        record.status = AccountStatus::Cancelled;
        let result = PaymentProcessor::default().apply(&record, payment(dec!(1)), Utc::now());
        assert!(matches!(result, Err(AccountsError::InvalidState { .. })));
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let record = sample_record(LedgerDirection::Payable, dec!(10));
        let result = PaymentProcessor::default().apply(&record, payment(dec!(0)), Utc::now());
        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn test_unstorable_amount_rejected_without_panic() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        pay(&mut record, payment(dec!(40))).unwrap();
        assert_eq!(record.status, AccountStatus::PartiallyPaid);
        let before = record.clone();

        let result = PaymentProcessor::default().apply(&record, payment(Decimal::MAX), Utc::now());
        assert!(matches!(result, Err(AccountsError::Validation(_))));
        assert_eq!(record, before);
    }

    #[test]
    fn test_adjustments_beyond_storable_due_rejected() {
        let record = sample_record(LedgerDirection::Receivable, dec!(1000));
        let mut input = payment(dec!(10));
        input.adjustments = Adjustments {
            interest: AMOUNT_LIMIT - dec!(1),
            ..Adjustments::default()
        };

        let result = PaymentProcessor::default().apply(&record, input, Utc::now());
        assert!(matches!(result, Err(AccountsError::Validation(msg)) if msg.contains("amount due")));
    }

    #[test]
    fn test_gated_record_requires_approval() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(10));
        record.requires_approval = true;
        let result = PaymentProcessor::default().apply(&record, payment(dec!(5)), Utc::now());
        assert!(matches!(result, Err(AccountsError::ApprovalRequired(_))));
    }

    #[test]
    fn test_overdue_record_accepts_payment() {
        let mut record = sample_record(LedgerDirection::Receivable, dec!(10));
        record.status = AccountStatus::Overdue;
        pay(&mut record, payment(dec!(4))).unwrap();
        assert_eq!(record.status, AccountStatus::PartiallyPaid);
    }

    #[test]
    fn test_payment_records_method_details() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(10));
        let mut input = payment(dec!(10));
        input.method = PaymentMethod::Pix;
        input.details = PaymentDetails::Pix { key: "k".into() };
        input.proof_reference = Some("receipt-1".into());
        let settled_by = input.settled_by;

        pay(&mut record, input).unwrap();
        assert_eq!(record.payment_method, Some(PaymentMethod::Pix));
        assert_eq!(record.payment_details.pix_key(), Some("k"));
        assert_eq!(record.proof_reference.as_deref(), Some("receipt-1"));
        assert_eq!(record.settled_by, Some(settled_by));
    }
}
