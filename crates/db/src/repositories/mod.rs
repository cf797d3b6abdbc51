//! Repository abstractions for data access.
//!
//! Repositories hide the `SeaORM` details from the rest of the application.

pub mod ledger;

pub use ledger::{
    LedgerFilter, LedgerPolicy, LedgerRepository, LedgerSort, LedgerSortField, SweepScope,
};
