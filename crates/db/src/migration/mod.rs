//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration.

pub use sea_orm_migration::prelude::*;

mod m20260115_000001_accounts_ledger;
mod m20260115_000002_ledger_payments;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260115_000001_accounts_ledger::Migration),
            Box::new(m20260115_000002_ledger_payments::Migration),
        ]
    }
}
