//! Ledger record store for accounts payable and receivable.
//!
//! Every write follows the same unit of work: begin a transaction, read the
//! row, let `ledgerly_core` decide, then write back with a compare-and-set on
//! `version`. Losing the race surfaces as `ConcurrencyConflict`, which is
//! retried with fresh data up to the configured limit.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait, UpdateMany,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ledgerly_core::accounts::{
    AccountStatus, AccountsError, Adjustments, AmountBreakdown, Approval, ApprovalGate,
    Cancellation, InstallmentLink, InstallmentPlan, InstallmentPlanner, LedgerDirection,
    LedgerRecord, NewLedgerRecord, PaymentDetails, PaymentEvent, PaymentInput, PaymentProcessor,
    RecordUpdate, StatusMachine, SweepPolicy, UserRole,
};
use ledgerly_shared::LedgerConfig;
use ledgerly_shared::types::PageRequest;

use crate::entities::{
    installment_plans, ledger_payments, ledger_records, sea_orm_active_enums as db_enums,
};

/// Engine policy applied by the store.
#[derive(Debug, Clone, Copy)]
pub struct LedgerPolicy {
    /// Rounding tolerance accepted above the effective due amount.
    pub payment_tolerance: Decimal,
    /// Retries after a lost compare-and-set before the conflict surfaces.
    pub max_write_retries: u32,
    /// Overdue sweep scope.
    pub sweep: SweepPolicy,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for LedgerPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            payment_tolerance: config.payment_tolerance,
            max_write_retries: config.max_write_retries,
            sweep: SweepPolicy::new(config.sweep_include_partially_paid),
        }
    }
}

/// Filter for searching ledger records.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    /// Only records in this status.
    pub status: Option<AccountStatus>,
    /// Only records of this supplier / customer.
    pub counterparty_id: Option<Uuid>,
    /// Due on or after this date.
    pub due_date_from: Option<NaiveDate>,
    /// Due on or before this date.
    pub due_date_to: Option<NaiveDate>,
    /// Only records in this category.
    pub category_id: Option<Uuid>,
    /// Only records in this cost center.
    pub cost_center_id: Option<Uuid>,
    /// `true` for the approval queue, `false` to exclude it.
    pub pending_approval: Option<bool>,
    /// Only children of this installment plan.
    pub plan_id: Option<Uuid>,
    /// Case-insensitive match on invoice number or description.
    pub search: Option<String>,
}

impl LedgerFilter {
    fn condition(&self) -> Condition {
        use ledger_records::Column;

        let mut condition = Condition::all();
        if let Some(status) = self.status {
            condition = condition.add(Column::Status.eq(db_enums::AccountStatus::from(status)));
        }
        if let Some(counterparty_id) = self.counterparty_id {
            condition = condition.add(Column::CounterpartyId.eq(counterparty_id));
        }
        if let Some(from) = self.due_date_from {
            condition = condition.add(Column::DueDate.gte(from));
        }
        if let Some(to) = self.due_date_to {
            condition = condition.add(Column::DueDate.lte(to));
        }
        if let Some(category_id) = self.category_id {
            condition = condition.add(Column::CategoryId.eq(category_id));
        }
        if let Some(cost_center_id) = self.cost_center_id {
            condition = condition.add(Column::CostCenterId.eq(cost_center_id));
        }
        if let Some(pending) = self.pending_approval {
            let queue = awaiting_approval();
            condition = condition.add(if pending { queue } else { queue.not() });
        }
        if let Some(plan_id) = self.plan_id {
            condition = condition.add(Column::ParentId.eq(plan_id));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{term}%");
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(Column::InvoiceNumber).ilike(pattern.clone()))
                    .add(Expr::col(Column::Description).ilike(pattern)),
            );
        }
        condition
    }
}

/// Sortable columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LedgerSortField {
    /// Due date (default).
    #[default]
    DueDate,
    /// Issue date.
    IssueDate,
    /// Net amount.
    NetAmount,
    /// Creation timestamp.
    CreatedAt,
    /// Invoice number.
    InvoiceNumber,
    /// Status.
    Status,
}

impl LedgerSortField {
    /// Parses a sort field from its query-string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "due_date" => Some(Self::DueDate),
            "issue_date" => Some(Self::IssueDate),
            "net_amount" => Some(Self::NetAmount),
            "created_at" => Some(Self::CreatedAt),
            "invoice_number" => Some(Self::InvoiceNumber),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    fn column(self) -> ledger_records::Column {
        match self {
            Self::DueDate => ledger_records::Column::DueDate,
            Self::IssueDate => ledger_records::Column::IssueDate,
            Self::NetAmount => ledger_records::Column::NetAmount,
            Self::CreatedAt => ledger_records::Column::CreatedAt,
            Self::InvoiceNumber => ledger_records::Column::InvoiceNumber,
            Self::Status => ledger_records::Column::Status,
        }
    }
}

/// Sort order for searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSort {
    /// Column to sort by.
    pub field: LedgerSortField,
    /// Descending instead of ascending.
    pub descending: bool,
}

impl LedgerSort {
    fn order(self) -> Order {
        if self.descending { Order::Desc } else { Order::Asc }
    }
}

/// Which records an overdue sweep may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepScope {
    /// Every organization, both directions (scheduled job).
    All,
    /// One organization's records of one direction (on-demand route).
    Collection {
        /// Organization to sweep.
        organization_id: Uuid,
        /// Direction to sweep.
        direction: LedgerDirection,
    },
}

/// Repository for ledger records, installment plans and payment history.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: Arc<DatabaseConnection>,
    policy: LedgerPolicy,
}

impl LedgerRepository {
    /// Creates a new ledger repository with the default policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_policy(db, LedgerPolicy::default())
    }

    /// Creates a new ledger repository with an explicit policy.
    #[must_use]
    pub fn with_policy(db: DatabaseConnection, policy: LedgerPolicy) -> Self {
        Self { db: Arc::new(db), policy }
    }

    /// True when the database answers a ping.
    pub async fn ping(&self) -> bool {
        match self.db.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database ping failed");
                false
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Gets one record of the caller's organization.
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, of another organization or of the other direction.
    pub async fn get(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
    ) -> Result<LedgerRecord, AccountsError> {
        load(self.db.as_ref(), organization_id, direction, id).await
    }

    /// Paged, filtered search. Returns the page and the total match count.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn search(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        filter: &LedgerFilter,
        sort: LedgerSort,
        page: &PageRequest,
    ) -> Result<(Vec<LedgerRecord>, u64), AccountsError> {
        let query = scoped(organization_id, direction).filter(filter.condition());

        let total = query.clone().count(self.db.as_ref()).await.map_err(persistence)?;
        let models = query
            .order_by(sort.field.column(), sort.order())
            .order_by_asc(ledger_records::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(self.db.as_ref())
            .await
            .map_err(persistence)?;

        Ok((models.into_iter().map(to_record).collect(), total))
    }

    /// Sum of `net_amount` over records in `status`.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn total_by_status(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        status: AccountStatus,
    ) -> Result<Decimal, AccountsError> {
        let condition = Condition::all()
            .add(ledger_records::Column::Status.eq(db_enums::AccountStatus::from(status)));
        self.sum_net_amount(organization_id, direction, condition).await
    }

    /// Sum of `net_amount` over records of one counterparty.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn total_by_counterparty(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        counterparty_id: Uuid,
    ) -> Result<Decimal, AccountsError> {
        let condition =
            Condition::all().add(ledger_records::Column::CounterpartyId.eq(counterparty_id));
        self.sum_net_amount(organization_id, direction, condition).await
    }

    /// Records currently stored as overdue, oldest due date first.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn list_overdue(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
    ) -> Result<Vec<LedgerRecord>, AccountsError> {
        let condition = Condition::all()
            .add(ledger_records::Column::Status.eq(db_enums::AccountStatus::Overdue));
        self.list(organization_id, direction, condition).await
    }

    /// Open, not-yet-overdue records due between `today` and `today + days`.
    ///
    /// # Errors
    ///
    /// `Validation` if the window ends past the last representable date,
    /// `Persistence` if the query fails.
    pub async fn list_due_soon(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        today: NaiveDate,
        days: u32,
    ) -> Result<Vec<LedgerRecord>, AccountsError> {
        let until = today
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| AccountsError::validation("due-soon window is out of range"))?;
        let condition = Condition::all()
            .add(ledger_records::Column::Status.is_in([
                db_enums::AccountStatus::Pending,
                db_enums::AccountStatus::PartiallyPaid,
            ]))
            .add(ledger_records::Column::DueDate.between(today, until));
        self.list(organization_id, direction, condition).await
    }

    /// Open records waiting for an approver.
    ///
    /// # Errors
    ///
    /// `Persistence` if the query fails.
    pub async fn list_pending_approval(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
    ) -> Result<Vec<LedgerRecord>, AccountsError> {
        let condition = awaiting_approval().add(ledger_records::Column::Status.is_not_in([
            db_enums::AccountStatus::Paid,
            db_enums::AccountStatus::Cancelled,
        ]));
        self.list(organization_id, direction, condition).await
    }

    /// Payment history of one record, oldest first.
    ///
    /// # Errors
    ///
    /// `NotFound` if the record is not visible to the caller.
    pub async fn payments(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
    ) -> Result<Vec<PaymentEvent>, AccountsError> {
        let record = load(self.db.as_ref(), organization_id, direction, id).await?;

        let models = ledger_payments::Entity::find()
            .filter(ledger_payments::Column::RecordId.eq(record.id))
            .order_by_asc(ledger_payments::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(persistence)?;

        Ok(models.into_iter().map(to_event).collect())
    }

    async fn list(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        condition: Condition,
    ) -> Result<Vec<LedgerRecord>, AccountsError> {
        let models = scoped(organization_id, direction)
            .filter(condition)
            .order_by_asc(ledger_records::Column::DueDate)
            .order_by_asc(ledger_records::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(persistence)?;
        Ok(models.into_iter().map(to_record).collect())
    }

    async fn sum_net_amount(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        condition: Condition,
    ) -> Result<Decimal, AccountsError> {
        let total: Option<Option<Decimal>> = scoped(organization_id, direction)
            .select_only()
            .column_as(ledger_records::Column::NetAmount.sum(), "total")
            .filter(condition)
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(persistence)?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Creates a record directly.
    ///
    /// # Errors
    ///
    /// `Validation` for bad input, `Persistence` if the insert fails.
    pub async fn create(
        &self,
        input: NewLedgerRecord,
        created_by: Uuid,
    ) -> Result<LedgerRecord, AccountsError> {
        let record = LedgerRecord::create(input, created_by, Utc::now())?;

        let model = to_active(&record, record.created_at)
            .insert(self.db.as_ref())
            .await
            .map_err(persistence)?;

        info!(
            record_id = %record.id,
            organization_id = %record.organization_id,
            direction = %record.direction,
            net_amount = %record.net_amount,
            created_by = %created_by,
            "Ledger record created"
        );
        Ok(to_record(model))
    }

    /// Edits an unpaid record.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidState` once money was applied, `Validation`,
    /// `ConcurrencyConflict` after retries, `Persistence`.
    pub async fn update(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        update: RecordUpdate,
        updated_by: Uuid,
    ) -> Result<LedgerRecord, AccountsError> {
        self.with_retry(id, "update", || {
            self.try_update(organization_id, direction, id, update.clone(), updated_by)
        })
        .await
    }

    async fn try_update(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        update: RecordUpdate,
        updated_by: Uuid,
    ) -> Result<LedgerRecord, AccountsError> {
        let txn = self.db.begin().await.map_err(persistence)?;
        let mut record = load(&txn, organization_id, direction, id).await?;
        let expected = record.version;

        update.apply_to(&mut record)?;
        write_record(&txn, &mut record, expected, Utc::now()).await?;
        txn.commit().await.map_err(persistence)?;

        info!(
            record_id = %id,
            direction = %direction,
            net_amount = %record.net_amount,
            updated_by = %updated_by,
            "Ledger record updated"
        );
        Ok(record)
    }

    /// Deletes a pending record with no payments.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidState`, `ConcurrencyConflict` after retries, `Persistence`.
    pub async fn delete(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        deleted_by: Uuid,
    ) -> Result<(), AccountsError> {
        self.with_retry(id, "delete", || {
            self.try_delete(organization_id, direction, id, deleted_by)
        })
        .await
    }

    async fn try_delete(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        deleted_by: Uuid,
    ) -> Result<(), AccountsError> {
        let txn = self.db.begin().await.map_err(persistence)?;
        let record = load(&txn, organization_id, direction, id).await?;
        StatusMachine::ensure_deletable(&record)?;

        let result = ledger_records::Entity::delete_many()
            .filter(ledger_records::Column::Id.eq(id))
            .filter(ledger_records::Column::Version.eq(record.version))
            .exec(&txn)
            .await
            .map_err(persistence)?;
        if result.rows_affected == 0 {
            return Err(AccountsError::ConcurrencyConflict(id));
        }
        txn.commit().await.map_err(persistence)?;

        info!(record_id = %id, direction = %direction, deleted_by = %deleted_by, "Ledger record deleted");
        Ok(())
    }

    /// Approves a gated record.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Forbidden` below the approver role, `InvalidState`,
    /// `ConcurrencyConflict` after retries, `Persistence`.
    pub async fn approve(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        approver: Uuid,
        role: UserRole,
        notes: Option<String>,
    ) -> Result<LedgerRecord, AccountsError> {
        self.with_retry(id, "approve", || {
            self.try_approve(organization_id, direction, id, approver, role, notes.clone())
        })
        .await
    }

    async fn try_approve(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        approver: Uuid,
        role: UserRole,
        notes: Option<String>,
    ) -> Result<LedgerRecord, AccountsError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(persistence)?;
        let mut record = load(&txn, organization_id, direction, id).await?;
        let expected = record.version;

        ApprovalGate::approve(&record, approver, role, notes, now)?.apply_to(&mut record);
        write_record(&txn, &mut record, expected, now).await?;
        txn.commit().await.map_err(persistence)?;

        info!(
            record_id = %id,
            direction = %direction,
            approved_by = %approver,
            role = role.as_str(),
            "Ledger record approved"
        );
        Ok(record)
    }

    /// Applies a payment and stores its history row in the same transaction.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidState`, `ApprovalRequired`, `Validation` (including
    /// over-payment), `ConcurrencyConflict` after retries, `Persistence`.
    pub async fn apply_payment(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        input: PaymentInput,
    ) -> Result<LedgerRecord, AccountsError> {
        self.with_retry(id, "payment", || {
            self.try_apply_payment(organization_id, direction, id, input.clone())
        })
        .await
    }

    async fn try_apply_payment(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        input: PaymentInput,
    ) -> Result<LedgerRecord, AccountsError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(persistence)?;
        let mut record = load(&txn, organization_id, direction, id).await?;
        let expected = record.version;

        let outcome =
            PaymentProcessor::new(self.policy.payment_tolerance).apply(&record, input, now)?;
        outcome.apply_to(&mut record);
        write_record(&txn, &mut record, expected, now).await?;
        to_payment_active(&outcome.event)
            .insert(&txn)
            .await
            .map_err(persistence)?;
        txn.commit().await.map_err(persistence)?;

        info!(
            record_id = %id,
            direction = %direction,
            from = %outcome.from,
            to = %outcome.to,
            amount = %outcome.event.amount,
            paid_amount = %record.paid_amount,
            settled_by = %outcome.event.created_by,
            "Payment applied"
        );
        Ok(record)
    }

    /// Cancels an open record with nothing paid.
    ///
    /// # Errors
    ///
    /// `NotFound`, `InvalidState`, `ConcurrencyConflict` after retries, `Persistence`.
    pub async fn cancel(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        cancelled_by: Uuid,
        reason: Option<String>,
    ) -> Result<LedgerRecord, AccountsError> {
        self.with_retry(id, "cancel", || {
            self.try_cancel(organization_id, direction, id, cancelled_by, reason.clone())
        })
        .await
    }

    async fn try_cancel(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        cancelled_by: Uuid,
        reason: Option<String>,
    ) -> Result<LedgerRecord, AccountsError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(persistence)?;
        let mut record = load(&txn, organization_id, direction, id).await?;
        let expected = record.version;

        let action = StatusMachine::cancel(&record, cancelled_by, reason, now)?;
        action.apply_to(&mut record);
        write_record(&txn, &mut record, expected, now).await?;
        txn.commit().await.map_err(persistence)?;

        info!(
            record_id = %id,
            direction = %direction,
            from = %action.from,
            to = %record.status,
            cancelled_by = %cancelled_by,
            "Ledger record cancelled"
        );
        Ok(record)
    }

    /// Replaces a record by an installment plan.
    ///
    /// The plan row, every child and the cancellation of the base record are
    /// written in one transaction.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Validation`, `InvalidState`, `ConcurrencyConflict` after
    /// retries, `Persistence`.
    pub async fn generate_installments(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        count: u32,
        interest_rate: Option<Decimal>,
        created_by: Uuid,
    ) -> Result<InstallmentPlan, AccountsError> {
        self.with_retry(id, "installments", || {
            self.try_generate_installments(
                organization_id,
                direction,
                id,
                count,
                interest_rate,
                created_by,
            )
        })
        .await
    }

    async fn try_generate_installments(
        &self,
        organization_id: Uuid,
        direction: LedgerDirection,
        id: Uuid,
        count: u32,
        interest_rate: Option<Decimal>,
        created_by: Uuid,
    ) -> Result<InstallmentPlan, AccountsError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(persistence)?;
        let base = load(&txn, organization_id, direction, id).await?;

        let plan = InstallmentPlanner::generate(&base, count, created_by, interest_rate, now)?;
        let cancel = StatusMachine::cancel(
            &base,
            created_by,
            Some(plan.base_cancellation_reason.clone()),
            now,
        )?;

        installment_plans::ActiveModel {
            id: Set(plan.header.id),
            organization_id: Set(plan.header.organization_id),
            direction: Set(plan.header.direction.into()),
            source_record_id: Set(plan.header.source_record_id),
            installment_count: Set(plan.header.installment_count),
            total_amount: Set(plan.header.total_amount),
            interest_rate: Set(plan.header.interest_rate),
            created_by: Set(plan.header.created_by),
            created_at: Set(plan.header.created_at.into()),
        }
        .insert(&txn)
        .await
        .map_err(persistence)?;

        ledger_records::Entity::insert_many(plan.children.iter().map(|c| to_active(c, now)))
            .exec(&txn)
            .await
            .map_err(persistence)?;

        let mut cancelled = base.clone();
        cancel.apply_to(&mut cancelled);
        write_record(&txn, &mut cancelled, base.version, now).await?;
        txn.commit().await.map_err(persistence)?;

        info!(
            record_id = %id,
            plan_id = %plan.header.id,
            direction = %direction,
            installments = count,
            total_amount = %plan.header.total_amount,
            created_by = %created_by,
            "Installment plan generated"
        );
        Ok(plan)
    }

    /// Moves past-due records to `Overdue` in one set-based update.
    ///
    /// Idempotent: records already overdue, paid or cancelled never match.
    ///
    /// # Errors
    ///
    /// `Persistence` if the update fails.
    pub async fn sweep_overdue(
        &self,
        now: DateTime<Utc>,
        scope: SweepScope,
    ) -> Result<u64, AccountsError> {
        let cutoff = SweepPolicy::cutoff_date(now);
        let result = sweep_statement(&self.policy.sweep, now, scope)
            .exec(self.db.as_ref())
            .await
            .map_err(persistence)?;

        if result.rows_affected > 0 {
            info!(
                transitioned = result.rows_affected,
                cutoff = %cutoff,
                scope = ?scope,
                include_partially_paid = self.policy.sweep.include_partially_paid,
                "Overdue sweep marked records overdue"
            );
        } else {
            debug!(cutoff = %cutoff, scope = ?scope, "Overdue sweep found nothing to do");
        }
        Ok(result.rows_affected)
    }

    async fn with_retry<T, F, Fut>(
        &self,
        id: Uuid,
        operation: &'static str,
        mut attempt: F,
    ) -> Result<T, AccountsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AccountsError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Err(err) if err.is_retryable() && retries < self.policy.max_write_retries => {
                    retries += 1;
                    warn!(
                        record_id = %id,
                        operation,
                        retries,
                        "Ledger record changed concurrently, retrying"
                    );
                }
                Err(err) if err.is_retryable() => {
                    warn!(record_id = %id, operation, retries, "Giving up after concurrent changes");
                    return Err(err);
                }
                result => return result,
            }
        }
    }
}

fn persistence(err: DbErr) -> AccountsError {
    error!(error = %err, "Ledger store operation failed");
    AccountsError::Persistence(err.to_string())
}

fn scoped(organization_id: Uuid, direction: LedgerDirection) -> Select<ledger_records::Entity> {
    ledger_records::Entity::find()
        .filter(ledger_records::Column::OrganizationId.eq(organization_id))
        .filter(ledger_records::Column::Direction.eq(db_enums::LedgerDirection::from(direction)))
}

fn awaiting_approval() -> Condition {
    Condition::all()
        .add(ledger_records::Column::RequiresApproval.eq(true))
        .add(ledger_records::Column::ApprovedBy.is_null())
}

async fn load<C: ConnectionTrait>(
    conn: &C,
    organization_id: Uuid,
    direction: LedgerDirection,
    id: Uuid,
) -> Result<LedgerRecord, AccountsError> {
    scoped(organization_id, direction)
        .filter(ledger_records::Column::Id.eq(id))
        .one(conn)
        .await
        .map_err(persistence)?
        .map(to_record)
        .ok_or(AccountsError::NotFound(id))
}

/// Compare-and-set write of a whole record; bumps `version` on success.
async fn write_record<C: ConnectionTrait>(
    conn: &C,
    record: &mut LedgerRecord,
    expected_version: i64,
    now: DateTime<Utc>,
) -> Result<(), AccountsError> {
    record.version = expected_version + 1;

    let result = ledger_records::Entity::update_many()
        .set(to_active(record, now))
        .filter(ledger_records::Column::Id.eq(record.id))
        .filter(ledger_records::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .map_err(persistence)?;

    if result.rows_affected == 0 {
        record.version = expected_version;
        return Err(AccountsError::ConcurrencyConflict(record.id));
    }
    Ok(())
}

fn to_active(record: &LedgerRecord, updated_at: DateTime<Utc>) -> ledger_records::ActiveModel {
    let approval = record.approval.as_ref();
    let installment = record.installment.as_ref();
    let cancellation = record.cancellation.as_ref();

    ledger_records::ActiveModel {
        id: Set(record.id),
        organization_id: Set(record.organization_id),
        direction: Set(record.direction.into()),
        counterparty_id: Set(record.counterparty_id),
        invoice_number: Set(record.invoice_number.clone()),
        description: Set(record.description.clone()),
        original_amount: Set(record.amounts.original),
        discount_amount: Set(record.amounts.discount),
        interest_amount: Set(record.amounts.interest),
        fine_amount: Set(record.amounts.fine),
        net_amount: Set(record.net_amount),
        issue_date: Set(record.issue_date),
        due_date: Set(record.due_date),
        payment_date: Set(record.payment_date),
        paid_amount: Set(record.paid_amount),
        adjustment_interest: Set(record.adjustments.interest),
        adjustment_fine: Set(record.adjustments.fine),
        adjustment_discount: Set(record.adjustments.discount),
        payment_method: Set(record.payment_method.map(Into::into)),
        bank_slip_number: Set(record.payment_details.bank_slip_number().map(str::to_string)),
        pix_key: Set(record.payment_details.pix_key().map(str::to_string)),
        proof_reference: Set(record.proof_reference.clone()),
        status: Set(record.status.into()),
        requires_approval: Set(record.requires_approval),
        approved_by: Set(approval.map(|a| a.approved_by)),
        approval_date: Set(approval.map(|a| a.approval_date.fixed_offset())),
        approval_notes: Set(approval.and_then(|a| a.approval_notes.clone())),
        category_id: Set(record.category_id),
        cost_center_id: Set(record.cost_center_id),
        parent_id: Set(installment.map(|l| l.plan_id)),
        installment_number: Set(installment.map(|l| l.number)),
        installment_count: Set(installment.map(|l| l.count)),
        created_by: Set(record.created_by),
        settled_by: Set(record.settled_by),
        cancelled_by: Set(cancellation.map(|c| c.cancelled_by)),
        cancelled_at: Set(cancellation.map(|c| c.cancelled_at.fixed_offset())),
        cancellation_reason: Set(cancellation.and_then(|c| c.reason.clone())),
        version: Set(record.version),
        created_at: Set(record.created_at.fixed_offset()),
        updated_at: Set(updated_at.fixed_offset()),
    }
}

fn to_record(model: ledger_records::Model) -> LedgerRecord {
    let ledger_records::Model {
        id,
        organization_id,
        direction,
        counterparty_id,
        invoice_number,
        description,
        original_amount,
        discount_amount,
        interest_amount,
        fine_amount,
        net_amount,
        issue_date,
        due_date,
        payment_date,
        paid_amount,
        adjustment_interest,
        adjustment_fine,
        adjustment_discount,
        payment_method,
        bank_slip_number,
        pix_key,
        proof_reference,
        status,
        requires_approval,
        approved_by,
        approval_date,
        approval_notes,
        category_id,
        cost_center_id,
        parent_id,
        installment_number,
        installment_count,
        created_by,
        settled_by,
        cancelled_by,
        cancelled_at,
        cancellation_reason,
        version,
        created_at,
        updated_at,
    } = model;

    let updated_at = updated_at.with_timezone(&Utc);

    LedgerRecord {
        id,
        organization_id,
        direction: direction.into(),
        counterparty_id,
        invoice_number,
        description,
        amounts: AmountBreakdown {
            original: original_amount,
            discount: discount_amount,
            interest: interest_amount,
            fine: fine_amount,
        },
        net_amount,
        issue_date,
        due_date,
        payment_date,
        paid_amount,
        adjustments: Adjustments {
            interest: adjustment_interest,
            fine: adjustment_fine,
            discount: adjustment_discount,
        },
        payment_method: payment_method.map(Into::into),
        payment_details: details(bank_slip_number, pix_key),
        proof_reference,
        status: status.into(),
        requires_approval,
        approval: approved_by.map(|approved_by| Approval {
            approved_by,
            approval_date: approval_date.map_or(updated_at, |d| d.with_timezone(&Utc)),
            approval_notes,
        }),
        category_id,
        cost_center_id,
        installment: match (parent_id, installment_number, installment_count) {
            (Some(plan_id), Some(number), Some(count)) => Some(InstallmentLink {
                plan_id,
                number,
                count,
            }),
            _ => None,
        },
        created_by,
        created_at: created_at.with_timezone(&Utc),
        settled_by,
        cancellation: cancelled_by.map(|cancelled_by| Cancellation {
            cancelled_by,
            cancelled_at: cancelled_at.map_or(updated_at, |d| d.with_timezone(&Utc)),
            reason: cancellation_reason,
        }),
        version,
    }
}

fn details(bank_slip_number: Option<String>, pix_key: Option<String>) -> PaymentDetails {
    match (bank_slip_number, pix_key) {
        (Some(number), _) => PaymentDetails::BankSlip { number },
        (None, Some(key)) => PaymentDetails::Pix { key },
        (None, None) => PaymentDetails::None,
    }
}

fn to_payment_active(event: &PaymentEvent) -> ledger_payments::ActiveModel {
    ledger_payments::ActiveModel {
        id: Set(event.id),
        record_id: Set(event.record_id),
        amount: Set(event.amount),
        payment_date: Set(event.payment_date),
        method: Set(event.method.into()),
        bank_slip_number: Set(event.details.bank_slip_number().map(str::to_string)),
        pix_key: Set(event.details.pix_key().map(str::to_string)),
        proof_reference: Set(event.proof_reference.clone()),
        adjustment_interest: Set(event.adjustments.interest),
        adjustment_fine: Set(event.adjustments.fine),
        adjustment_discount: Set(event.adjustments.discount),
        effective_due_amount: Set(event.effective_due_amount),
        resulting_status: Set(event.resulting_status.into()),
        created_by: Set(event.created_by),
        created_at: Set(event.created_at.fixed_offset()),
    }
}

fn to_event(model: ledger_payments::Model) -> PaymentEvent {
    PaymentEvent {
        id: model.id,
        record_id: model.record_id,
        amount: model.amount,
        payment_date: model.payment_date,
        method: model.method.into(),
        details: details(model.bank_slip_number, model.pix_key),
        proof_reference: model.proof_reference,
        adjustments: Adjustments {
            interest: model.adjustment_interest,
            fine: model.adjustment_fine,
            discount: model.adjustment_discount,
        },
        effective_due_amount: model.effective_due_amount,
        resulting_status: model.resulting_status.into(),
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// The set-based overdue transition: candidates due before the cutoff move
/// to `overdue` and bump their version, so in-flight compare-and-set writers
/// lose.
fn sweep_statement(
    policy: &SweepPolicy,
    now: DateTime<Utc>,
    scope: SweepScope,
) -> UpdateMany<ledger_records::Entity> {
    use ledger_records::Column;

    let candidates: Vec<db_enums::AccountStatus> = policy
        .candidate_statuses()
        .into_iter()
        .map(Into::into)
        .collect();

    let query = ledger_records::Entity::update_many()
        .col_expr(
            Column::Status,
            Expr::value(db_enums::AccountStatus::Overdue.to_value()),
        )
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .col_expr(Column::UpdatedAt, Expr::value(now.fixed_offset()))
        .filter(Column::Status.is_in(candidates))
        .filter(Column::DueDate.lt(SweepPolicy::cutoff_date(now)));

    match scope {
        SweepScope::All => query,
        SweepScope::Collection {
            organization_id,
            direction,
        } => query
            .filter(Column::OrganizationId.eq(organization_id))
            .filter(Column::Direction.eq(db_enums::LedgerDirection::from(direction))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledgerly_core::accounts::PaymentMethod;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait, Transaction};

    fn sweep_sql(policy: SweepPolicy, scope: SweepScope) -> String {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 6, 0, 0).unwrap();
        sweep_statement(&policy, now, scope)
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    fn sample_model() -> ledger_records::Model {
        let now = Utc::now().fixed_offset();
        ledger_records::Model {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            direction: db_enums::LedgerDirection::Receivable,
            counterparty_id: Uuid::new_v4(),
            invoice_number: "INV-9".to_string(),
            description: None,
            original_amount: dec!(100.00),
            discount_amount: dec!(10.00),
            interest_amount: dec!(0),
            fine_amount: dec!(0),
            net_amount: dec!(90.00),
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            payment_date: Some(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()),
            paid_amount: dec!(40.00),
            adjustment_interest: dec!(2.00),
            adjustment_fine: dec!(0),
            adjustment_discount: dec!(0),
            payment_method: Some(db_enums::PaymentMethod::Pix),
            bank_slip_number: None,
            pix_key: Some("key@bank".to_string()),
            proof_reference: None,
            status: db_enums::AccountStatus::PartiallyPaid,
            requires_approval: true,
            approved_by: Some(Uuid::new_v4()),
            approval_date: Some(now),
            approval_notes: Some("ok".to_string()),
            category_id: None,
            cost_center_id: None,
            parent_id: Some(Uuid::new_v4()),
            installment_number: Some(1),
            installment_count: Some(2),
            created_by: Uuid::new_v4(),
            settled_by: Some(Uuid::new_v4()),
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            version: 4,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_model_to_record() {
        let model = sample_model();
        let record = to_record(model.clone());

        assert_eq!(record.direction, LedgerDirection::Receivable);
        assert_eq!(record.status, AccountStatus::PartiallyPaid);
        assert_eq!(record.payment_method, Some(PaymentMethod::Pix));
        assert_eq!(record.payment_details.pix_key(), Some("key@bank"));
        assert_eq!(record.adjusted_due_amount(), dec!(92.00));
        assert_eq!(record.approval.unwrap().approved_by, model.approved_by.unwrap());
        assert_eq!(record.installment.unwrap().plan_id, model.parent_id.unwrap());
        assert!(record.cancellation.is_none());
        assert_eq!(record.version, 4);
    }

    #[test]
    fn test_record_round_trips_through_active_model() {
        let model = sample_model();
        let record = to_record(model.clone());
        let active = to_active(&record, record.created_at);

        assert_eq!(active.pix_key, Set(model.pix_key.clone()));
        assert_eq!(active.parent_id, Set(model.parent_id));
        assert_eq!(active.net_amount, Set(model.net_amount));
        assert_eq!(active.version, Set(4));
    }

    #[test]
    fn test_payment_event_conversion() {
        let event = PaymentEvent {
            id: Uuid::new_v4(),
            record_id: Uuid::new_v4(),
            amount: dec!(25.00),
            payment_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            method: PaymentMethod::BankSlip,
            details: PaymentDetails::BankSlip {
                number: "34191".to_string(),
            },
            proof_reference: Some("r-1".to_string()),
            adjustments: Adjustments::default(),
            effective_due_amount: dec!(25.00),
            resulting_status: AccountStatus::Paid,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
        };
        let active = to_payment_active(&event);
        assert_eq!(active.bank_slip_number, Set(Some("34191".to_string())));
        assert_eq!(active.pix_key, Set(None));
        assert_eq!(active.resulting_status, Set(db_enums::AccountStatus::Paid));
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!(LedgerSortField::parse("NET_AMOUNT"), Some(LedgerSortField::NetAmount));
        assert_eq!(LedgerSortField::parse("amount"), None);
        assert_eq!(LedgerSort::default().order(), Order::Asc);
    }

    #[test]
    fn test_policy_from_config() {
        let config = LedgerConfig {
            sweep_include_partially_paid: true,
            max_write_retries: 7,
            ..LedgerConfig::default()
        };
        let policy = LedgerPolicy::from(&config);
        assert!(policy.sweep.include_partially_paid);
        assert_eq!(policy.max_write_retries, 7);
        assert_eq!(policy.payment_tolerance, dec!(0.01));
    }

    #[test]
    fn test_sweep_statement_moves_past_due_pending() {
        let sql = sweep_sql(SweepPolicy::default(), SweepScope::All);

        assert!(sql.starts_with(r#"UPDATE "ledger_records" SET "status" = 'overdue'"#), "{sql}");
        assert!(sql.contains(r#""version" = "version" + 1"#), "{sql}");
        assert!(sql.contains(r#""status" IN ('pending')"#), "{sql}");
        assert!(sql.contains(r#""due_date" < '2025-02-01'"#), "{sql}");
        assert!(!sql.contains("organization_id"), "{sql}");
    }

    #[test]
    fn test_sweep_statement_never_matches_swept_or_closed() {
        let sql = sweep_sql(SweepPolicy::new(true), SweepScope::All);
        let filter = &sql[sql.find("WHERE").unwrap()..];

        assert!(filter.contains(r#""status" IN ('pending', 'partially_paid')"#), "{sql}");
        for closed in ["'overdue'", "'paid'", "'cancelled'"] {
            assert!(!filter.contains(closed), "{sql}");
        }
    }

    #[test]
    fn test_sweep_statement_scoped_to_collection() {
        let organization_id = Uuid::new_v4();
        let sql = sweep_sql(
            SweepPolicy::default(),
            SweepScope::Collection {
                organization_id,
                direction: LedgerDirection::Receivable,
            },
        );
        assert!(sql.contains(&format!(r#""organization_id" = '{organization_id}'"#)), "{sql}");
        assert!(sql.contains(r#""direction" = 'receivable'"#), "{sql}");
    }

    #[tokio::test]
    async fn test_past_due_record_swept_once() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 6, 0, 0).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();
        let repo = LedgerRepository::new(db);

        assert_eq!(repo.sweep_overdue(now, SweepScope::All).await.unwrap(), 1);
        assert_eq!(repo.sweep_overdue(now, SweepScope::All).await.unwrap(), 0);

        let statement = sweep_statement(&SweepPolicy::default(), now, SweepScope::All)
            .build(DatabaseBackend::Postgres);
        assert_eq!(
            Arc::try_unwrap(repo.db).unwrap().into_transaction_log(),
            vec![Transaction::one(statement.clone()), Transaction::one(statement)]
        );
    }

    #[tokio::test]
    async fn test_sweep_failure_is_persistence_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_errors([DbErr::Custom("connection reset".to_string())])
            .into_connection();
        let repo = LedgerRepository::new(db);

        let result = repo.sweep_overdue(Utc::now(), SweepScope::All).await;
        assert!(matches!(result, Err(AccountsError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_due_soon_window_out_of_range() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let repo = LedgerRepository::new(db);

        let result = repo
            .list_due_soon(Uuid::new_v4(), LedgerDirection::Payable, NaiveDate::MAX, 1)
            .await;
        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }
}
