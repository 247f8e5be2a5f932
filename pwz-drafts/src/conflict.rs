//! Concurrent-write conflict handling
//!
//! One `ConflictResolver` lives for the duration of a single save. It tracks
//! how many persist attempts lost the compare-and-swap and decides whether
//! to remerge against the fresh document or give up.
//!
//! ```text
//!   Clean --stale client / lost CAS--> Retrying{n} --success--> Clean
//!                                          |
//!                                          +--n reaches bound--> Failed
//! ```

use pwz_common::config::StaleClientPolicy;

use crate::error::DraftError;

/// Default bound on persist attempts for one save
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictState {
    Clean,
    /// `attempt` persist attempts have lost so far
    Retrying { attempt: u32 },
    Failed { attempts: u32 },
}

/// What the caller does after a lost compare-and-swap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reload, merge the same payload again, and retry the write
    Remerge,
    /// Stop and surface `ConflictExceeded`
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct ConflictResolver {
    max_attempts: u32,
    policy: StaleClientPolicy,
    state: ConflictState,
    failed_persists: u32,
}

impl ConflictResolver {
    pub fn new(max_attempts: u32, policy: StaleClientPolicy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            policy,
            state: ConflictState::Clean,
            failed_persists: 0,
        }
    }

    pub fn state(&self) -> ConflictState {
        self.state
    }

    /// Persist attempts made so far, including the one in flight
    pub fn attempts(&self) -> u32 {
        self.failed_persists + 1
    }

    /// The client's expected version differs from the stored one
    ///
    /// A client behind the store is remerged under `remerge` (not counted
    /// against the retry bound) and rejected under `reject`. A client ahead
    /// of the store names a version that never existed and is always
    /// rejected with `VersionConflict`.
    pub fn on_stale_client(&mut self, expected: i64, actual: i64) -> Result<(), DraftError> {
        let conflict = DraftError::VersionConflict {
            expected,
            actual: Some(actual),
        };
        if expected > actual {
            return Err(conflict);
        }
        match self.policy {
            StaleClientPolicy::Reject => Err(conflict),
            StaleClientPolicy::Remerge => {
                if self.state == ConflictState::Clean {
                    self.state = ConflictState::Retrying { attempt: 0 };
                }
                Ok(())
            }
        }
    }

    /// A write lost the compare-and-swap to a concurrent writer
    pub fn on_persist_conflict(&mut self) -> Resolution {
        self.failed_persists += 1;
        if self.failed_persists >= self.max_attempts {
            self.state = ConflictState::Failed {
                attempts: self.failed_persists,
            };
            Resolution::GiveUp
        } else {
            self.state = ConflictState::Retrying {
                attempt: self.failed_persists,
            };
            Resolution::Remerge
        }
    }

    pub fn on_success(&mut self) {
        self.state = ConflictState::Clean;
    }

    /// Error for the `Failed` state
    pub fn exceeded(&self) -> DraftError {
        DraftError::ConflictExceeded {
            attempts: self.failed_persists,
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, StaleClientPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_success() {
        let mut resolver = ConflictResolver::default();
        assert_eq!(resolver.state(), ConflictState::Clean);
        assert_eq!(resolver.attempts(), 1);
        resolver.on_success();
        assert_eq!(resolver.state(), ConflictState::Clean);
    }

    #[test]
    fn test_gives_up_at_bound() {
        let mut resolver = ConflictResolver::new(3, StaleClientPolicy::Remerge);
        assert_eq!(resolver.on_persist_conflict(), Resolution::Remerge);
        assert_eq!(resolver.state(), ConflictState::Retrying { attempt: 1 });
        assert_eq!(resolver.on_persist_conflict(), Resolution::Remerge);
        assert_eq!(resolver.on_persist_conflict(), Resolution::GiveUp);
        assert_eq!(resolver.state(), ConflictState::Failed { attempts: 3 });
        assert_eq!(resolver.exceeded().kind(), "ConflictExceeded");
    }

    #[test]
    fn test_recovers_after_retry() {
        let mut resolver = ConflictResolver::default();
        resolver.on_persist_conflict();
        assert_eq!(resolver.attempts(), 2);
        resolver.on_success();
        assert_eq!(resolver.state(), ConflictState::Clean);
    }

    #[test]
    fn test_stale_client_remerge_does_not_count() {
        let mut resolver = ConflictResolver::new(1, StaleClientPolicy::Remerge);
        resolver.on_stale_client(2, 5).unwrap();
        assert_eq!(resolver.state(), ConflictState::Retrying { attempt: 0 });
        assert_eq!(resolver.attempts(), 1);
    }

    #[test]
    fn test_stale_client_reject() {
        let mut resolver = ConflictResolver::new(3, StaleClientPolicy::Reject);
        let err = resolver.on_stale_client(2, 5).unwrap_err();
        match err {
            DraftError::VersionConflict { expected, actual } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, Some(5));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_client_ahead_of_store_rejected_under_remerge() {
        let mut resolver = ConflictResolver::new(3, StaleClientPolicy::Remerge);
        let err = resolver.on_stale_client(99, 1).unwrap_err();
        assert!(matches!(
            err,
            DraftError::VersionConflict { expected: 99, actual: Some(1) }
        ));
        assert_eq!(resolver.state(), ConflictState::Clean);
    }

    #[test]
    fn test_zero_bound_still_allows_one_attempt() {
        let mut resolver = ConflictResolver::new(0, StaleClientPolicy::Remerge);
        assert_eq!(resolver.on_persist_conflict(), Resolution::GiveUp);
    }
}
