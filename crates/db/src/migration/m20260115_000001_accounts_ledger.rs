//! Accounts ledger migration.
//!
//! Creates the installment plan table and the single `ledger_records` table
//! shared by payables and receivables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INSTALLMENT_PLANS_SQL).await?;
        db.execute_unprepared(LEDGER_RECORDS_SQL).await?;
        db.execute_unprepared(LEDGER_RECORDS_INDEXES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS ledger_records CASCADE;")
            .await?;
        db.execute_unprepared("DROP TABLE IF EXISTS installment_plans CASCADE;")
            .await?;
        Ok(())
    }
}

const INSTALLMENT_PLANS_SQL: &str = r"
CREATE TABLE installment_plans (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    direction VARCHAR(16) NOT NULL,
    source_record_id UUID NOT NULL,
    installment_count INTEGER NOT NULL,
    total_amount NUMERIC(19, 2) NOT NULL,
    interest_rate NUMERIC(10, 6),
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_plan_direction CHECK (direction IN ('payable', 'receivable')),
    CONSTRAINT chk_plan_count CHECK (installment_count BETWEEN 2 AND 360),
    CONSTRAINT chk_plan_rate CHECK (interest_rate IS NULL OR interest_rate >= 0)
);

CREATE INDEX idx_installment_plans_source ON installment_plans(source_record_id);
";

const LEDGER_RECORDS_SQL: &str = r"
CREATE TABLE ledger_records (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    direction VARCHAR(16) NOT NULL,
    counterparty_id UUID NOT NULL,
    invoice_number VARCHAR(100) NOT NULL,
    description TEXT,

    original_amount NUMERIC(19, 2) NOT NULL,
    discount_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    interest_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    fine_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    net_amount NUMERIC(19, 2) NOT NULL,

    issue_date DATE NOT NULL,
    due_date DATE NOT NULL,
    payment_date DATE,
    paid_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,

    -- Running totals of payment-time adjustments
    adjustment_interest NUMERIC(19, 2) NOT NULL DEFAULT 0,
    adjustment_fine NUMERIC(19, 2) NOT NULL DEFAULT 0,
    adjustment_discount NUMERIC(19, 2) NOT NULL DEFAULT 0,

    payment_method VARCHAR(16),
    bank_slip_number VARCHAR(100),
    pix_key VARCHAR(150),
    proof_reference TEXT,

    status VARCHAR(16) NOT NULL DEFAULT 'pending',

    requires_approval BOOLEAN NOT NULL DEFAULT false,
    approved_by UUID,
    approval_date TIMESTAMPTZ,
    approval_notes TEXT,

    category_id UUID,
    cost_center_id UUID,

    parent_id UUID REFERENCES installment_plans(id) ON DELETE RESTRICT,
    installment_number INTEGER,
    installment_count INTEGER,

    created_by UUID NOT NULL,
    settled_by UUID,
    cancelled_by UUID,
    cancelled_at TIMESTAMPTZ,
    cancellation_reason TEXT,

    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_direction CHECK (direction IN ('payable', 'receivable')),
    CONSTRAINT chk_status CHECK (
        status IN ('pending', 'partially_paid', 'paid', 'overdue', 'cancelled')
    ),
    CONSTRAINT chk_payment_method CHECK (
        payment_method IS NULL OR payment_method IN (
            'cash', 'bank_transfer', 'bank_slip', 'pix',
            'credit_card', 'debit_card', 'check', 'other'
        )
    ),
    CONSTRAINT chk_amounts_non_negative CHECK (
        original_amount > 0
        AND discount_amount >= 0
        AND interest_amount >= 0
        AND fine_amount >= 0
        AND paid_amount >= 0
    ),
    CONSTRAINT chk_net_amount CHECK (
        net_amount >= 0
        AND net_amount = original_amount - discount_amount + interest_amount + fine_amount
    ),
    CONSTRAINT chk_due_after_issue CHECK (due_date >= issue_date),
    CONSTRAINT chk_paid_has_date CHECK (status <> 'paid' OR payment_date IS NOT NULL),
    CONSTRAINT chk_installment_link CHECK (
        (parent_id IS NULL AND installment_number IS NULL AND installment_count IS NULL)
        OR (parent_id IS NOT NULL AND installment_number BETWEEN 1 AND installment_count)
    ),
    CONSTRAINT chk_payment_details CHECK (
        (bank_slip_number IS NULL OR payment_method = 'bank_slip')
        AND (pix_key IS NULL OR payment_method = 'pix')
    )
);
";

const LEDGER_RECORDS_INDEXES_SQL: &str = r"
-- Listing and search by organization and direction
CREATE INDEX idx_ledger_records_org_direction
    ON ledger_records(organization_id, direction, due_date);

-- Overdue sweep candidates
CREATE INDEX idx_ledger_records_sweep
    ON ledger_records(due_date)
    WHERE status IN ('pending', 'partially_paid');

-- Totals by counterparty
CREATE INDEX idx_ledger_records_counterparty
    ON ledger_records(organization_id, direction, counterparty_id);

-- Installment siblings
CREATE INDEX idx_ledger_records_parent
    ON ledger_records(parent_id, installment_number)
    WHERE parent_id IS NOT NULL;

-- Approval queue
CREATE INDEX idx_ledger_records_pending_approval
    ON ledger_records(organization_id, direction)
    WHERE requires_approval AND approved_by IS NULL;
";
