//! Installment plan generation.
//!
//! A base record is replaced by `count` child records that share a freshly
//! minted plan id. Original amount, discount and fine are split with the
//! rounding remainder on the last child, so the children always add back up
//! to the base. The base's interest is spread the same way; a monthly rate
//! adds compound interest per installment on top of that share.

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use ledgerly_shared::types::{InstallmentPlanId, LedgerRecordId};

use crate::accounts::error::AccountsError;
use crate::accounts::money::{
    checked_sum, round_with_last_remainder, split_with_last_remainder, Adjustments,
    AmountBreakdown,
};
use crate::accounts::types::{
    AccountStatus, InstallmentLink, LedgerDirection, LedgerRecord, PaymentDetails,
};

/// Smallest number of installments in a plan.
pub const MIN_INSTALLMENTS: u32 = 2;

/// Largest number of installments in a plan (30 years of monthly dues).
pub const MAX_INSTALLMENTS: u32 = 360;

/// Decimal places kept on a stored interest rate.
pub const INTEREST_RATE_SCALE: u32 = 6;

/// Exclusive upper bound of a stored interest rate, NUMERIC(10,6).
pub const INTEREST_RATE_LIMIT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Plan header stored alongside the generated children.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentPlanHeader {
    /// Plan id; every child's parent reference.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: Uuid,
    /// Direction of the base and children.
    pub direction: LedgerDirection,
    /// The record that was split.
    pub source_record_id: Uuid,
    /// Number of children.
    pub installment_count: i32,
    /// Sum of the children's net amounts.
    pub total_amount: Decimal,
    /// Monthly interest rate, if one was applied.
    pub interest_rate: Option<Decimal>,
    /// Acting user.
    pub created_by: Uuid,
    /// Generation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Result of [`InstallmentPlanner::generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentPlan {
    /// Plan header.
    pub header: InstallmentPlanHeader,
    /// Children in installment order.
    pub children: Vec<LedgerRecord>,
    /// Reason stored on the cancelled base record.
    pub base_cancellation_reason: String,
}

/// Stateless installment planner.
pub struct InstallmentPlanner;

impl InstallmentPlanner {
    /// Generate an installment plan from `base`.
    ///
    /// # Arguments
    /// * `base` - The record being split
    /// * `count` - Number of installments (2..=360)
    /// * `created_by` - The acting user
    /// * `interest_rate` - Optional monthly interest rate as a fraction,
    ///   rounded to six decimal places
    /// * `now` - Generation timestamp
    ///
    /// # Errors
    /// * `Validation` for a count out of range, a rate outside `0..10000`,
    ///   or amounts that grow beyond what the store holds
    /// * `InvalidState` if the base is paid, closed, or itself an installment
    pub fn generate(
        base: &LedgerRecord,
        count: u32,
        created_by: Uuid,
        interest_rate: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<InstallmentPlan, AccountsError> {
        if !(MIN_INSTALLMENTS..=MAX_INSTALLMENTS).contains(&count) {
            return Err(AccountsError::validation(format!(
                "installment count must be between {MIN_INSTALLMENTS} and {MAX_INSTALLMENTS}, got {count}"
            )));
        }
        let interest_rate = interest_rate.map(normalize_rate).transpose()?;
        if !base.is_untouched() {
            return Err(AccountsError::invalid_state(
                base.status,
                "only unpaid pending or overdue records can be split into installments",
            ));
        }
        if base.installment.is_some() {
            return Err(AccountsError::invalid_state(
                base.status,
                "an installment cannot be split again",
            ));
        }

        let originals = split_with_last_remainder(base.amounts.original, count);
        if originals.iter().any(Decimal::is_zero) {
            return Err(AccountsError::validation(format!(
                "{} cannot be split into {count} installments of at least 0.01",
                base.amounts.original
            )));
        }
        let discounts = split_with_last_remainder(base.amounts.discount, count);
        let fines = split_with_last_remainder(base.amounts.fine, count);
        let mut interests = split_with_last_remainder(base.amounts.interest, count);
        if let Some(rate) = interest_rate {
            let compound = compound_interest(&originals, rate)?;
            for (interest, extra) in interests.iter_mut().zip(compound) {
                *interest = checked_sum("installment interest", *interest, extra)?;
            }
        }

        let plan_id = InstallmentPlanId::new().into_inner();
        let count_i32 = to_i32(count)?;
        let mut children = Vec::with_capacity(originals.len());

        for (k, original) in originals.into_iter().enumerate() {
            let number = to_i32(k + 1)?;
            let amounts = AmountBreakdown::new(original, discounts[k], interests[k], fines[k])?;
            children.push(LedgerRecord {
                id: LedgerRecordId::new().into_inner(),
                organization_id: base.organization_id,
                direction: base.direction,
                counterparty_id: base.counterparty_id,
                invoice_number: base.invoice_number.clone(),
                description: Some(format!(
                    "{} ({number}/{count})",
                    base.description.as_deref().unwrap_or(&base.invoice_number)
                )),
                amounts,
                net_amount: amounts.net(),
                issue_date: base.issue_date,
                due_date: add_months(base.due_date, k)?,
                payment_date: None,
                paid_amount: Decimal::ZERO,
                adjustments: Adjustments::default(),
                payment_method: None,
                payment_details: PaymentDetails::None,
                proof_reference: None,
                status: AccountStatus::Pending,
                requires_approval: base.requires_approval,
                approval: base.approval.clone(),
                category_id: base.category_id,
                cost_center_id: base.cost_center_id,
                installment: Some(InstallmentLink {
                    plan_id,
                    number,
                    count: count_i32,
                }),
                created_by,
                created_at: now,
                settled_by: None,
                cancellation: None,
                version: 0,
            });
        }

        let total_amount = children.iter().try_fold(Decimal::ZERO, |total, child| {
            checked_sum("installment plan total", total, child.net_amount)
        })?;

        Ok(InstallmentPlan {
            header: InstallmentPlanHeader {
                id: plan_id,
                organization_id: base.organization_id,
                direction: base.direction,
                source_record_id: base.id,
                installment_count: count_i32,
                total_amount,
                interest_rate,
                created_by,
                created_at: now,
            },
            children,
            base_cancellation_reason: format!("replaced by installment plan {plan_id}"),
        })
    }
}

fn normalize_rate(rate: Decimal) -> Result<Decimal, AccountsError> {
    let rate = rate.round_dp(INTEREST_RATE_SCALE);
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(AccountsError::validation("interest rate cannot be negative"));
    }
    if rate >= INTEREST_RATE_LIMIT {
        return Err(AccountsError::validation(format!(
            "interest rate must be below {INTEREST_RATE_LIMIT}"
        )));
    }
    Ok(rate)
}

/// Interest of installment k (zero-based) is `share_k * ((1 + rate)^k - 1)`.
fn compound_interest(shares: &[Decimal], rate: Decimal) -> Result<Vec<Decimal>, AccountsError> {
    let growth = Decimal::ONE
        .checked_add(rate)
        .ok_or_else(|| AccountsError::validation("interest rate is too large"))?;
    let mut factor = Decimal::ONE;
    let mut exact = Vec::with_capacity(shares.len());

    for share in shares {
        let interest = share
            .checked_mul(factor - Decimal::ONE)
            .ok_or_else(|| AccountsError::validation("interest rate is too large"))?;
        exact.push(interest);
        factor = factor
            .checked_mul(growth)
            .ok_or_else(|| AccountsError::validation("interest rate is too large"))?;
    }

    Ok(round_with_last_remainder(&exact))
}

fn add_months(date: NaiveDate, months: usize) -> Result<NaiveDate, AccountsError> {
    u32::try_from(months)
        .ok()
        .and_then(|m| date.checked_add_months(Months::new(m)))
        .ok_or_else(|| AccountsError::validation("installment due date out of range"))
}

fn to_i32<T: TryInto<i32>>(value: T) -> Result<i32, AccountsError> {
    value
        .try_into()
        .map_err(|_| AccountsError::validation("installment count out of range"))
}
