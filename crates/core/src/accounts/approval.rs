//! Approval gate for ledger records.
//!
//! A record created with `requires_approval` cannot receive money until an
//! approver signs it off. Approval never changes the record's status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::error::AccountsError;
use crate::accounts::types::{Approval, LedgerRecord};

/// User role in the organization hierarchy.
///
/// Roles are ordered from lowest to highest privilege.
/// Higher roles can perform all actions of lower roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Read-only access.
    Viewer = 0,
    /// Can create, edit, settle and cancel records.
    Submitter = 1,
    /// Can approve gated records.
    Approver = 2,
    /// Can approve and settle records.
    Accountant = 3,
    /// Full access except ownership transfer.
    Admin = 4,
    /// Full access including ownership transfer.
    Owner = 5,
}

impl UserRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "submitter" => Some(Self::Submitter),
            "approver" => Some(Self::Approver),
            "accountant" => Some(Self::Accountant),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Submitter => "submitter",
            Self::Approver => "approver",
            Self::Accountant => "accountant",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Returns true if this role may approve gated records.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        *self >= Self::Approver
    }

    /// Returns true if this role may change ledger records.
    #[must_use]
    pub fn can_write(&self) -> bool {
        *self >= Self::Submitter
    }

    /// Rejects read-only roles before a write.
    ///
    /// # Errors
    ///
    /// `Forbidden` naming `action` when the role cannot write.
    pub fn ensure_can_write(self, action: &str) -> Result<(), AccountsError> {
        if self.can_write() {
            Ok(())
        } else {
            Err(AccountsError::Forbidden {
                role: self.as_str().to_string(),
                action: action.to_string(),
            })
        }
    }
}

/// Sign-off decided by [`ApprovalGate::approve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalAction {
    /// The approval data to store.
    pub approval: Approval,
}

impl ApprovalAction {
    /// Applies the sign-off to a record snapshot.
    pub fn apply_to(&self, record: &mut LedgerRecord) {
        record.approval = Some(self.approval.clone());
    }
}

/// Stateless approval rules.
pub struct ApprovalGate;

impl ApprovalGate {
    /// Approve a gated record.
    ///
    /// # Arguments
    /// * `record` - Current snapshot of the record
    /// * `approver` - The acting user
    /// * `role` - The acting user's role
    /// * `notes` - Optional approval notes
    /// * `now` - Approval timestamp
    ///
    /// # Errors
    /// * `Forbidden` if the role is below approver
    /// * `InvalidState` if the record is closed, not gated, or already approved
    pub fn approve(
        record: &LedgerRecord,
        approver: Uuid,
        role: UserRole,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalAction, AccountsError> {
        if !role.can_approve() {
            return Err(AccountsError::Forbidden {
                role: role.as_str().to_string(),
                action: "approve ledger records".to_string(),
            });
        }
        if record.status.is_terminal() {
            return Err(AccountsError::invalid_state(
                record.status,
                "closed records cannot be approved",
            ));
        }
        if !record.requires_approval {
            return Err(AccountsError::invalid_state(
                record.status,
                "record does not require approval",
            ));
        }
        if let Some(existing) = &record.approval {
            return Err(AccountsError::invalid_state(
                record.status,
                format!("record was already approved by {}", existing.approved_by),
            ));
        }

        Ok(ApprovalAction {
            approval: Approval {
                approved_by: approver,
                approval_date: now,
                approval_notes: notes.filter(|n| !n.trim().is_empty()),
            },
        })
    }

    /// Fails when the record is gated and still unapproved.
    ///
    /// # Errors
    ///
    /// `ApprovalRequired` carrying the record id.
    pub fn ensure_payable(record: &LedgerRecord) -> Result<(), AccountsError> {
        if record.awaits_approval() {
            Err(AccountsError::ApprovalRequired(record.id))
        } else {
            Ok(())
        }
    }
}
