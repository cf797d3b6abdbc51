//! Property-based tests for the ledger engine.
//!
//! Amount invariants, installment conservation, over-payment rejection, the
//! approval gate, sweep eligibility and state-machine closure, followed by
//! the end-to-end lifecycle scenarios. The overdue sweep statement itself is
//! exercised in the db crate.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::accounts::approval::{ApprovalGate, UserRole};
use crate::accounts::error::AccountsError;
use crate::accounts::installment::InstallmentPlanner;
use crate::accounts::money::{Adjustments, AmountBreakdown};
use crate::accounts::payment::{PaymentInput, PaymentProcessor};
use crate::accounts::state::StatusMachine;
use crate::accounts::sweep::SweepPolicy;
use crate::accounts::types::{
    sample_input, sample_record, AccountStatus, LedgerDirection, LedgerRecord, PaymentDetails,
    PaymentMethod,
};

/// Strategy to generate amounts from 0.01 to 1,000,000.00.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate amounts from 0.00 to 10,000.00.
fn small_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_status() -> impl Strategy<Value = AccountStatus> {
    prop_oneof![
        Just(AccountStatus::Pending),
        Just(AccountStatus::PartiallyPaid),
        Just(AccountStatus::Paid),
        Just(AccountStatus::Overdue),
        Just(AccountStatus::Cancelled),
    ]
}

fn arb_direction() -> impl Strategy<Value = LedgerDirection> {
    prop_oneof![Just(LedgerDirection::Payable), Just(LedgerDirection::Receivable)]
}

fn arb_uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

fn cash(amount: Decimal) -> PaymentInput {
    PaymentInput {
        amount,
        method: PaymentMethod::Cash,
        details: PaymentDetails::None,
        payment_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
        proof_reference: None,
        adjustments: Adjustments::default(),
        settled_by: Uuid::new_v4(),
    }
}

fn apply(record: &mut LedgerRecord, input: PaymentInput) -> Result<(), AccountsError> {
    let outcome = PaymentProcessor::default().apply(record, input, Utc::now())?;
    outcome.apply_to(record);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Amount invariant
    // =========================================================================

    /// Net always equals original - discount + interest + fine, and is never negative.
    #[test]
    fn prop_net_amount_matches_components(
        original in positive_amount(),
        discount in small_amount(),
        interest in small_amount(),
        fine in small_amount(),
    ) {
        match AmountBreakdown::new(original, discount, interest, fine) {
            Ok(amounts) => {
                prop_assert_eq!(amounts.net(), original - discount + interest + fine);
                prop_assert!(amounts.net() >= Decimal::ZERO);
            }
            Err(err) => {
                prop_assert!(matches!(err, AccountsError::Validation(_)));
                prop_assert!(original - discount + interest + fine < Decimal::ZERO);
            }
        }
    }

    // =========================================================================
    // Property 2: Installment conservation
    // =========================================================================

    /// Children's original amounts sum to the base; all point at the plan id.
    #[test]
    fn prop_installments_conserve_base_amount(
        cents in 1_000i64..10_000_000i64,
        count in 2u32..=60,
        direction in arb_direction(),
    ) {
        let base = sample_record(direction, Decimal::new(cents, 2));
        let plan = InstallmentPlanner::generate(&base, count, Uuid::new_v4(), None, Utc::now())
            .unwrap();

        let total: Decimal = plan.children.iter().map(|c| c.amounts.original).sum();
        prop_assert_eq!(total, base.amounts.original);
        prop_assert_eq!(plan.children.len(), count as usize);
        for child in &plan.children {
            prop_assert_eq!(child.installment.map(|l| l.plan_id), Some(plan.header.id));
            prop_assert!(child.amounts.original > Decimal::ZERO);
        }
    }

    /// Compounded interest never produces a negative installment and sums exactly.
    #[test]
    fn prop_compound_interest_sums_to_header(
        cents in 100_000i64..10_000_000i64,
        count in 2u32..=24,
        rate_bp in 10i64..500,
    ) {
        let base = sample_record(LedgerDirection::Receivable, Decimal::new(cents, 2));
        let rate = Decimal::new(rate_bp, 4);
        let plan = InstallmentPlanner::generate(&base, count, Uuid::new_v4(), Some(rate), Utc::now())
            .unwrap();

        let net: Decimal = plan.children.iter().map(|c| c.net_amount).sum();
        prop_assert_eq!(net, plan.header.total_amount);
        prop_assert!(plan.children.iter().all(|c| c.amounts.interest >= Decimal::ZERO));
        prop_assert_eq!(plan.children[0].amounts.interest, Decimal::ZERO);
    }

    // =========================================================================
    // Property 3: No over-payment
    // =========================================================================

    /// Paying more than the balance plus tolerance fails and leaves the record unchanged.
    #[test]
    fn prop_overpayment_rejected(
        original in positive_amount(),
        paid_first in 0i64..100,
        excess_cents in 2i64..100_000,
    ) {
        let mut record = sample_record(LedgerDirection::Payable, original);
        let first = (original * Decimal::new(paid_first, 2)).round_dp(2);
        if first > Decimal::ZERO && first < original {
            apply(&mut record, cash(first)).unwrap();
        }
        let before = record.clone();

        let amount = record.outstanding_amount() + Decimal::new(excess_cents, 2);
        let result = PaymentProcessor::default().apply(&record, cash(amount), Utc::now());

        prop_assert!(matches!(result, Err(AccountsError::Validation(_))));
        prop_assert_eq!(record, before);
    }

    /// Paid amount never exceeds the adjusted due amount.
    #[test]
    fn prop_paid_never_exceeds_adjusted_due(
        original in positive_amount(),
        splits in prop::collection::vec(1i64..100, 1..6),
    ) {
        let mut record = sample_record(LedgerDirection::Receivable, original);
        for pct in splits {
            let amount = (original * Decimal::new(pct, 2)).round_dp(2);
            if amount <= Decimal::ZERO {
                continue;
            }
            let _ = apply(&mut record, cash(amount));
            prop_assert!(record.paid_amount <= record.adjusted_due_amount());
        }
        if record.status == AccountStatus::Paid {
            prop_assert_eq!(record.paid_amount, record.adjusted_due_amount());
            prop_assert!(record.payment_date.is_some());
        }
    }

    // =========================================================================
    // Property 4: Approval gate
    // =========================================================================

    /// A gated record takes no money before approval.
    #[test]
    fn prop_gated_record_needs_approval(
        original in positive_amount(),
        approver in arb_uuid(),
    ) {
        let mut record = sample_record(LedgerDirection::Payable, original);
        record.requires_approval = true;

        let denied = PaymentProcessor::default().apply(&record, cash(original), Utc::now());
        prop_assert!(matches!(denied, Err(AccountsError::ApprovalRequired(_))));
        prop_assert_eq!(record.status, AccountStatus::Pending);
        prop_assert!(record.paid_amount.is_zero());

        ApprovalGate::approve(&record, approver, UserRole::Approver, None, Utc::now())
            .unwrap()
            .apply_to(&mut record);
        apply(&mut record, cash(original)).unwrap();
        prop_assert_eq!(record.status, AccountStatus::Paid);
    }

    // =========================================================================
    // Property 5: Sweep eligibility
    // =========================================================================

    /// Only open, not yet overdue statuses are ever swept, so a repeated
    /// sweep finds nothing the first one moved.
    #[test]
    fn prop_sweep_candidates_exclude_swept_and_closed(
        status in arb_status(),
        include_partial in any::<bool>(),
    ) {
        let candidates = SweepPolicy::new(include_partial).candidate_statuses();
        prop_assert!(!candidates.contains(&AccountStatus::Overdue));
        if candidates.contains(&status) {
            prop_assert!(StatusMachine::is_valid_transition(status, AccountStatus::Overdue));
        }
    }

    // =========================================================================
    // Property 6: State-machine closure
    // =========================================================================

    /// No operation moves a record out of a terminal status.
    #[test]
    fn prop_terminal_states_are_closed(
        status in prop_oneof![Just(AccountStatus::Paid), Just(AccountStatus::Cancelled)],
        amount in positive_amount(),
        user in arb_uuid(),
    ) {
        let mut record = sample_record(LedgerDirection::Receivable, amount);
        record.status = status;
        record.requires_approval = true;

        prop_assert!(PaymentProcessor::default().apply(&record, cash(amount), Utc::now()).is_err());
        prop_assert!(StatusMachine::cancel(&record, user, None, Utc::now()).is_err());
        prop_assert!(ApprovalGate::approve(&record, user, UserRole::Owner, None, Utc::now()).is_err());
        prop_assert!(InstallmentPlanner::generate(&record, 2, user, None, Utc::now()).is_err());
        prop_assert!(!SweepPolicy::new(true).candidate_statuses().contains(&status));
        for to in AccountStatus::ALL {
            prop_assert!(!StatusMachine::is_valid_transition(status, to));
        }
    }
}

// =========================================================================
// Lifecycle scenarios
// =========================================================================

#[test]
fn scenario_partial_then_full_payment() {
    let mut input = sample_input(LedgerDirection::Payable);
    input.original_amount = dec!(1000.00);
    let mut record = LedgerRecord::create(input, Uuid::new_v4(), Utc::now()).unwrap();
    assert_eq!(record.net_amount, dec!(1000.00));
    assert_eq!(record.status, AccountStatus::Pending);

    apply(&mut record, cash(dec!(600.00))).unwrap();
    assert_eq!(record.status, AccountStatus::PartiallyPaid);
    assert_eq!(record.paid_amount, dec!(600.00));

    apply(&mut record, cash(dec!(400.00))).unwrap();
    assert_eq!(record.status, AccountStatus::Paid);
}

#[test]
fn scenario_three_monthly_installments() {
    let mut input = sample_input(LedgerDirection::Receivable);
    input.original_amount = dec!(300.00);
    input.issue_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    input.due_date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let base = LedgerRecord::create(input, Uuid::new_v4(), Utc::now()).unwrap();

    let plan = InstallmentPlanner::generate(&base, 3, Uuid::new_v4(), None, Utc::now()).unwrap();
    let originals: Decimal = plan.children.iter().map(|c| c.amounts.original).sum();
    let dues: Vec<_> = plan.children.iter().map(|c| c.due_date.to_string()).collect();

    assert_eq!(originals, dec!(300.00));
    assert_eq!(dues, vec!["2025-01-10", "2025-02-10", "2025-03-10"]);
}

#[test]
fn scenario_approval_unblocks_payment() {
    let mut input = sample_input(LedgerDirection::Payable);
    input.requires_approval = true;
    let mut record = LedgerRecord::create(input, Uuid::new_v4(), Utc::now()).unwrap();
    let payment = cash(dec!(250.00));

    let first = PaymentProcessor::default().apply(&record, payment.clone(), Utc::now());
    assert!(matches!(first, Err(AccountsError::ApprovalRequired(id)) if id == record.id));

    ApprovalGate::approve(&record, Uuid::new_v4(), UserRole::Accountant, None, Utc::now())
        .unwrap()
        .apply_to(&mut record);
    apply(&mut record, payment).unwrap();
    assert_eq!(record.status, AccountStatus::PartiallyPaid);
}
