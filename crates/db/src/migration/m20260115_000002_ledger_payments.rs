//! Payment history migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(LEDGER_PAYMENTS_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TABLE IF EXISTS ledger_payments CASCADE;")
            .await?;
        Ok(())
    }
}

const LEDGER_PAYMENTS_SQL: &str = r"
CREATE TABLE ledger_payments (
    id UUID PRIMARY KEY,
    record_id UUID NOT NULL REFERENCES ledger_records(id) ON DELETE CASCADE,
    amount NUMERIC(19, 2) NOT NULL,
    payment_date DATE NOT NULL,
    method VARCHAR(16) NOT NULL,
    bank_slip_number VARCHAR(100),
    pix_key VARCHAR(150),
    proof_reference TEXT,
    adjustment_interest NUMERIC(19, 2) NOT NULL DEFAULT 0,
    adjustment_fine NUMERIC(19, 2) NOT NULL DEFAULT 0,
    adjustment_discount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    effective_due_amount NUMERIC(19, 2) NOT NULL,
    resulting_status VARCHAR(16) NOT NULL,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_amount CHECK (amount > 0),
    CONSTRAINT chk_resulting_status CHECK (resulting_status IN ('partially_paid', 'paid'))
);

CREATE INDEX idx_ledger_payments_record ON ledger_payments(record_id, created_at);
";
