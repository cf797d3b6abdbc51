//! Pre-payment edits of a ledger record.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::accounts::error::AccountsError;
use crate::accounts::money::AmountBreakdown;
use crate::accounts::state::StatusMachine;
use crate::accounts::types::{self, LedgerRecord};

/// Fields a caller may change before any money is applied.
///
/// Due date, counterparty and direction are not here: they never change
/// after creation.
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    /// New invoice number.
    pub invoice_number: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New original amount.
    pub original_amount: Option<Decimal>,
    /// New discount.
    pub discount_amount: Option<Decimal>,
    /// New interest.
    pub interest_amount: Option<Decimal>,
    /// New fine.
    pub fine_amount: Option<Decimal>,
    /// New category; `Some(None)` clears it.
    pub category_id: Option<Option<Uuid>>,
    /// New cost center; `Some(None)` clears it.
    pub cost_center_id: Option<Option<Uuid>>,
    /// New approval requirement.
    pub requires_approval: Option<bool>,
}

impl RecordUpdate {
    /// True when any amount component is present.
    #[must_use]
    pub fn touches_amounts(&self) -> bool {
        self.original_amount.is_some()
            || self.discount_amount.is_some()
            || self.interest_amount.is_some()
            || self.fine_amount.is_some()
    }

    /// Applies the edit to `record` after checking it is still editable.
    ///
    /// Changing any amount component recomputes the net amount and drops an
    /// existing approval, which must then be given again.
    ///
    /// # Errors
    /// * `InvalidState` once money has been applied or the record is closed
    /// * `Validation` for a blank invoice number or invalid amounts
    pub fn apply_to(self, record: &mut LedgerRecord) -> Result<(), AccountsError> {
        StatusMachine::ensure_editable(record)?;

        let amounts = if self.touches_amounts() {
            Some(AmountBreakdown::new(
                self.original_amount.unwrap_or(record.amounts.original),
                self.discount_amount.unwrap_or(record.amounts.discount),
                self.interest_amount.unwrap_or(record.amounts.interest),
                self.fine_amount.unwrap_or(record.amounts.fine),
            )?)
        } else {
            None
        };

        let invoice_number = self
            .invoice_number
            .as_deref()
            .map(types::invoice_number)
            .transpose()?;

        if let Some(number) = invoice_number {
            record.invoice_number = number;
        }
        if let Some(description) = self.description {
            record.description = description.filter(|d| !d.trim().is_empty());
        }
        if let Some(category) = self.category_id {
            record.category_id = category;
        }
        if let Some(cost_center) = self.cost_center_id {
            record.cost_center_id = cost_center;
        }
        if let Some(required) = self.requires_approval {
            record.requires_approval = required;
            if !required {
                record.approval = None;
            }
        }
        if let Some(amounts) = amounts {
            if amounts != record.amounts {
                record.approval = None;
            }
            record.set_amounts(amounts);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::types::{
        sample_record, AccountStatus, Approval, LedgerDirection, MAX_INVOICE_NUMBER_LEN,
    };
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_update_recomputes_net() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        let update = RecordUpdate {
            discount_amount: Some(dec!(10)),
            fine_amount: Some(dec!(2.50)),
            ..Default::default()
        };
        update.apply_to(&mut record).unwrap();
        assert_eq!(record.net_amount, dec!(92.50));
        assert_eq!(record.amounts.original, dec!(100));
    }

    #[test]
    fn test_amount_change_clears_approval() {
        let mut record = sample_record(LedgerDirection::Receivable, dec!(100));
        record.requires_approval = true;
        record.approval = Some(Approval {
            approved_by: Uuid::new_v4(),
            approval_date: Utc::now(),
            approval_notes: None,
        });

        RecordUpdate {
            description: Some(Some("renamed".into())),
            ..Default::default()
        }
        .apply_to(&mut record)
        .unwrap();
        assert!(record.approval.is_some());

        RecordUpdate {
            original_amount: Some(dec!(150)),
            ..Default::default()
        }
        .apply_to(&mut record)
        .unwrap();
        assert!(record.approval.is_none());
        assert!(record.awaits_approval());
    }

    #[test]
    fn test_update_after_payment_rejected() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        record.paid_amount = dec!(1);
        record.status = AccountStatus::PartiallyPaid;

        let result = RecordUpdate {
            invoice_number: Some("X".into()),
            ..Default::default()
        }
        .apply_to(&mut record);
        assert!(matches!(result, Err(AccountsError::InvalidState { .. })));
    }

    #[test]
    fn test_invalid_amounts_leave_record_unchanged() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        let before = record.clone();

        let result = RecordUpdate {
            invoice_number: Some("NEW".into()),
            discount_amount: Some(dec!(500)),
            ..Default::default()
        }
        .apply_to(&mut record);
        assert!(matches!(result, Err(AccountsError::Validation(_))));
        assert_eq!(record, before);
    }

    #[test]
    fn test_blank_invoice_rejected() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        let result = RecordUpdate {
            invoice_number: Some("  ".into()),
            ..Default::default()
        }
        .apply_to(&mut record);
        assert!(result.is_err());
    }

    #[test]
    fn test_long_invoice_leaves_record_unchanged() {
        let mut record = sample_record(LedgerDirection::Payable, dec!(100));
        let before = record.clone();
        let result = RecordUpdate {
            invoice_number: Some("N".repeat(MAX_INVOICE_NUMBER_LEN + 1)),
            description: Some(Some("changed".into())),
            ..Default::default()
        }
        .apply_to(&mut record);
        assert!(matches!(result, Err(AccountsError::Validation(_))));
        assert_eq!(record, before);
    }
}
