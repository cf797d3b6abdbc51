//! Overdue sweep policy.
//!
//! The store runs the sweep as one set-based update; this module decides
//! which statuses are candidates and what "past due" means.

use chrono::{DateTime, NaiveDate, Utc};

use crate::accounts::types::AccountStatus;

/// Which records the sweeper moves to `Overdue`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Also sweep past-due `PartiallyPaid` records.
    pub include_partially_paid: bool,
}

impl SweepPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(include_partially_paid: bool) -> Self {
        Self {
            include_partially_paid,
        }
    }

    /// Statuses eligible for the overdue transition.
    #[must_use]
    pub fn candidate_statuses(&self) -> Vec<AccountStatus> {
        if self.include_partially_paid {
            vec![AccountStatus::Pending, AccountStatus::PartiallyPaid]
        } else {
            vec![AccountStatus::Pending]
        }
    }

    /// Records due strictly before this date are past due.
    #[must_use]
    pub fn cutoff_date(now: DateTime<Utc>) -> NaiveDate {
        now.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_sweeps_pending_only() {
        assert_eq!(SweepPolicy::default().candidate_statuses(), vec![AccountStatus::Pending]);
    }

    #[test]
    fn test_partially_paid_follows_policy() {
        assert!(!SweepPolicy::new(false).candidate_statuses().contains(&AccountStatus::PartiallyPaid));
        assert_eq!(
            SweepPolicy::new(true).candidate_statuses(),
            vec![AccountStatus::Pending, AccountStatus::PartiallyPaid]
        );
    }

    #[test]
    fn test_closed_and_overdue_never_candidates() {
        for policy in [SweepPolicy::new(false), SweepPolicy::new(true)] {
            let candidates = policy.candidate_statuses();
            for status in [AccountStatus::Paid, AccountStatus::Cancelled, AccountStatus::Overdue] {
                assert!(!candidates.contains(&status));
            }
        }
    }

    #[test]
    fn test_cutoff_is_utc_calendar_day() {
        let late = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(
            SweepPolicy::cutoff_date(late),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
        let early = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(
            SweepPolicy::cutoff_date(early),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
    }
}
