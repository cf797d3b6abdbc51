//! Core business logic for Ledgerly.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Every rule of the accounts payable / accounts receivable lifecycle lives here,
//! expressed once and parameterized by [`accounts::LedgerDirection`].
//!
//! # Modules
//!
//! - `accounts` - Ledger records, payments, installments, approval and overdue sweep

pub mod accounts;
