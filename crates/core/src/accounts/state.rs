//! Status state machine for ledger records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::accounts::error::AccountsError;
use crate::accounts::types::{AccountStatus, Cancellation, LedgerRecord};

/// Outcome of a successful cancellation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAction {
    /// Status the record was in.
    pub from: AccountStatus,
    /// Audit data to store.
    pub cancellation: Cancellation,
}

impl CancelAction {
    /// Applies the cancellation to a record snapshot.
    pub fn apply_to(&self, record: &mut LedgerRecord) {
        record.status = AccountStatus::Cancelled;
        record.cancellation = Some(self.cancellation.clone());
    }
}

/// Stateless transition rules for [`AccountStatus`].
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → PartiallyPaid | Paid | Overdue | Cancelled
    /// - PartiallyPaid → Paid | Overdue | Cancelled
    /// - Overdue → PartiallyPaid | Paid | Cancelled
    #[must_use]
    pub fn is_valid_transition(from: AccountStatus, to: AccountStatus) -> bool {
        use AccountStatus::{Cancelled, Overdue, Paid, PartiallyPaid, Pending};

        matches!(
            (from, to),
            (Pending, PartiallyPaid | Paid | Overdue | Cancelled)
                | (PartiallyPaid, Paid | Overdue | Cancelled)
                | (Overdue, PartiallyPaid | Paid | Cancelled)
        )
    }

    /// Status after money is applied: `Paid` once `paid` reaches
    /// `effective_due`, `PartiallyPaid` otherwise.
    ///
    /// # Errors
    ///
    /// `InvalidState` when `current` cannot accept a payment.
    pub fn settlement_status(
        current: AccountStatus,
        paid: Decimal,
        effective_due: Decimal,
    ) -> Result<AccountStatus, AccountsError> {
        let target = if paid >= effective_due {
            AccountStatus::Paid
        } else {
            AccountStatus::PartiallyPaid
        };

        // A partial payment on a partially paid record keeps its status.
        if current == target || Self::is_valid_transition(current, target) {
            Ok(target)
        } else {
            Err(AccountsError::invalid_state(
                current,
                format!("cannot move to {target}"),
            ))
        }
    }

    /// Decide an administrative cancellation.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the record is terminal or already has money applied.
    pub fn cancel(
        record: &LedgerRecord,
        cancelled_by: Uuid,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CancelAction, AccountsError> {
        if record.status.is_terminal() {
            return Err(AccountsError::invalid_state(
                record.status,
                "record is already closed",
            ));
        }
        if !record.paid_amount.is_zero() {
            return Err(AccountsError::invalid_state(
                record.status,
                format!(
                    "cannot cancel a record with {} already applied",
                    record.paid_amount
                ),
            ));
        }

        Ok(CancelAction {
            from: record.status,
            cancellation: Cancellation {
                cancelled_by,
                cancelled_at: now,
                reason: reason.filter(|r| !r.trim().is_empty()),
            },
        })
    }

    /// Deletion is allowed only for pending records with nothing paid.
    ///
    /// # Errors
    ///
    /// `InvalidState` otherwise.
    pub fn ensure_deletable(record: &LedgerRecord) -> Result<(), AccountsError> {
        if record.status == AccountStatus::Pending && record.paid_amount.is_zero() {
            Ok(())
        } else {
            Err(AccountsError::invalid_state(
                record.status,
                "only pending records with no payments can be deleted",
            ))
        }
    }

    /// Pre-payment edits are allowed while pending or overdue with nothing paid.
    ///
    /// # Errors
    ///
    /// `InvalidState` otherwise.
    pub fn ensure_editable(record: &LedgerRecord) -> Result<(), AccountsError> {
        if record.is_untouched() {
            Ok(())
        } else {
            Err(AccountsError::invalid_state(
                record.status,
                "only unpaid pending or overdue records can be edited",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::types::{sample_record, LedgerDirection};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::accounts::types::AccountStatus::{Cancelled, Overdue, Paid, PartiallyPaid, Pending};

    #[rstest]
    #[case(Pending, PartiallyPaid, true)]
    #[case(Pending, Paid, true)]
    #[case(Pending, Overdue, true)]
    #[case(Pending, Cancelled, true)]
    #[case(PartiallyPaid, Paid, true)]
    #[case(PartiallyPaid, Overdue, true)]
    #[case(PartiallyPaid, Pending, false)]
    #[case(Overdue, PartiallyPaid, true)]
    #[case(Overdue, Pending, false)]
    #[case(Paid, Pending, false)]
    #[case(Paid, Cancelled, false)]
    #[case(Cancelled, Pending, false)]
    fn test_transitions(
        #[case] from: AccountStatus,
        #[case] to: AccountStatus,
        #[case] valid: bool,
    ) {
        assert_eq!(StatusMachine::is_valid_transition(from, to), valid);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for to in AccountStatus::ALL {
            assert!(!StatusMachine::is_valid_transition(Paid, to));
            assert!(!StatusMachine::is_valid_transition(Cancelled, to));
        }
    }

    #[test]
    fn test_settlement_status() {
        assert_eq!(
            StatusMachine::settlement_status(Pending, dec!(600), dec!(1000)).unwrap(),
            PartiallyPaid
        );
        assert_eq!(
            StatusMachine::settlement_status(PartiallyPaid, dec!(700), dec!(1000)).unwrap(),
            PartiallyPaid
        );
        assert_eq!(
            StatusMachine::settlement_status(Overdue, dec!(1000), dec!(1000)).unwrap(),
            Paid
        );
        assert!(StatusMachine::settlement_status(Cancelled, dec!(1), dec!(10)).is_err());
    }

    #[test]
    fn test_cancel_pending() {
        let record = sample_record(LedgerDirection::Payable, dec!(100));
        let user = Uuid::new_v4();
        let action =
            StatusMachine::cancel(&record, user, Some("duplicate".into()), Utc::now()).unwrap();

        let mut updated = record.clone();
        action.apply_to(&mut updated);
        assert_eq!(action.from, Pending);
        assert_eq!(updated.status, Cancelled);
        assert_eq!(updated.cancellation.unwrap().cancelled_by, user);
    }

    #[test]
    fn test_cancel_with_payment_is_rejected() {
        let mut record = sample_record(LedgerDirection::Receivable, dec!(100));
        record.paid_amount = dec!(10);
        record.status = PartiallyPaid;

        let result = StatusMachine::cancel(&record, Uuid::new_v4(), None, Utc::now());
        assert!(matches!(result, Err(AccountsError::InvalidState { .. })));
    }

    #[test]
    fn test_cancel_terminal_is_rejected() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        record.status = Cancelled;
        assert!(StatusMachine::cancel(&record, Uuid::new_v4(), None, Utc::now()).is_err());
    }

    #[test]
    fn test_deletable_only_when_pending_and_unpaid() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        assert!(StatusMachine::ensure_deletable(&record).is_ok());

        record.status = Overdue;
        assert!(StatusMachine::ensure_deletable(&record).is_err());
        assert!(StatusMachine::ensure_editable(&record).is_ok());

        record.status = PartiallyPaid;
        record.paid_amount = dec!(1);
        assert!(StatusMachine::ensure_editable(&record).is_err());
    }
}
