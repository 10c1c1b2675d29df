//! Deploy phase tracking
//!
//! Each deploy walks a linear phase sequence; any failing step exits the
//! sequence with the phase it reached, which ends up in the failure log line.

use std::fmt;

use tracing::info;
use uuid::Uuid;

/// Phases of a backend deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BackendPhase {
    Received,
    SecretChecked,
    FieldsValidated,
    EnvironmentResolved,
    Cloned,
    BranchVerified,
    BackendFolderVerified,
    Swapped,
    EnvRestored,
    DependenciesInstalled,
    ProcessRestarted,
    Done,
}

/// Phases of a frontend deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FrontendPhase {
    Received,
    SecretChecked,
    FieldsValidated,
    FlagChecked,
    EnvironmentResolved,
    Fetched,
    Extracted,
    Swapped,
    Done,
}

/// Tracks the phase a deploy has reached, keyed by a per-request deploy id
#[derive(Debug)]
pub struct PhaseTracker<P> {
    deploy_id: Uuid,
    current: P,
}

impl<P: Copy + Ord + fmt::Debug> PhaseTracker<P> {
    /// Start tracking a new deploy
    pub fn new(initial: P) -> Self {
        let deploy_id = Uuid::new_v4();
        info!(deploy_id = %deploy_id, phase = ?initial, "Deploy received");
        Self { deploy_id, current: initial }
    }

    /// Record that the deploy advanced to a later phase
    pub fn enter(&mut self, phase: P) {
        debug_assert!(phase >= self.current, "deploy phases only move forward");
        self.current = phase;
        info!(deploy_id = %self.deploy_id, phase = ?phase, "Deploy phase");
    }

    /// The phase the deploy has reached
    pub fn current(&self) -> P {
        self.current
    }

    /// The per-request deploy id
    pub fn deploy_id(&self) -> Uuid {
        self.deploy_id
    }
}
