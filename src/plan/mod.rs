//! Action plans - what the copier will do before it does it

mod init;

pub use init::generate_init_plan;

use crate::types::SetupAction;
use std::path::PathBuf;

/// Ordered list of actions plus aggregate statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    /// Actions in execution order
    pub actions: Vec<SetupAction>,

    /// Aggregate statistics about the plan
    pub stats: PlanStats,

    /// Setups that could not be given an identity
    pub collisions: Vec<PathBuf>,
}

impl SyncPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            stats: PlanStats::default(),
            collisions: Vec::new(),
        }
    }

    /// Add an action to the plan and update statistics
    pub fn add_action(&mut self, action: SetupAction) {
        match &action {
            SetupAction::Rename { .. } => self.stats.rename_count += 1,
            SetupAction::Copy { .. } => {
                self.stats.copy_count += 1;
                self.stats.total_bytes += action.transfer_size();
            }
        }

        self.actions.push(action);
    }

    /// Append another plan, keeping its order
    pub fn extend(&mut self, other: SyncPlan) {
        for action in other.actions {
            self.add_action(action);
        }
        self.collisions.extend(other.collisions);
    }

    /// Check if executing the plan would change anything
    pub fn has_executable_actions(&self) -> bool {
        !self.actions.is_empty()
    }
}

impl Default for SyncPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a plan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanStats {
    /// Total bytes the copies will transfer
    pub total_bytes: u64,

    pub rename_count: usize,
    pub copy_count: usize,
}
