use crate::domain::ids::BranchId;
use crate::domain::node::DecisionId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag carried by every in-flight branch fetch.
///
/// A completion is only applied when its ticket still matches the branch's
/// `Loading` state in the current session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub branch_id: BranchId,
    pub session_version: u64,
    /// Per-session attempt counter
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    Unloaded,
    Loading(FetchTicket),
    Loaded { visible: bool },
}

/// Flattened view of `BranchState` for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BranchPhase {
    Unloaded,
    Loading,
    LoadedHidden,
    LoadedVisible,
}

impl BranchState {
    pub fn phase(&self) -> BranchPhase {
        match self {
            BranchState::Unloaded => BranchPhase::Unloaded,
            BranchState::Loading(_) => BranchPhase::Loading,
            BranchState::Loaded { visible: false } => BranchPhase::LoadedHidden,
            BranchState::Loaded { visible: true } => BranchPhase::LoadedVisible,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BranchRecord {
    pub branch_id: BranchId,
    pub decision_id: DecisionId,
    pub label: String,
    pub state: BranchState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LifecycleCounts {
    pub unloaded: usize,
    pub loading: usize,
    pub hidden: usize,
    pub visible: usize,
}

/// Per-branch state machine arena, in discovery order.
///
/// Transitions are crate-private; only the expansion controller drives them.
#[derive(Debug, Default)]
pub struct BranchLifecycle {
    records: Vec<BranchRecord>,
    index: HashMap<BranchId, usize>,
}

impl BranchLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, branch: &str) -> Option<&BranchState> {
        self.record(branch).map(|r| &r.state)
    }

    pub fn record(&self, branch: &str) -> Option<&BranchRecord> {
        self.index.get(branch).map(|&i| &self.records[i])
    }

    pub fn is_visible(&self, branch: &str) -> bool {
        matches!(self.state(branch), Some(BranchState::Loaded { visible: true }))
    }

    pub fn is_loaded(&self, branch: &str) -> bool {
        matches!(self.state(branch), Some(BranchState::Loaded { .. }))
    }

    pub fn records(&self) -> &[BranchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> LifecycleCounts {
        let mut counts = LifecycleCounts::default();
        for r in &self.records {
            match r.state.phase() {
                BranchPhase::Unloaded => counts.unloaded += 1,
                BranchPhase::Loading => counts.loading += 1,
                BranchPhase::LoadedHidden => counts.hidden += 1,
                BranchPhase::LoadedVisible => counts.visible += 1,
            }
        }
        counts
    }

    /// Add a newly observed branch in the `Unloaded` state. Known branches are left alone.
    pub(crate) fn discover(
        &mut self,
        branch: BranchId,
        decision_id: DecisionId,
        label: String,
    ) -> bool {
        if self.index.contains_key(&branch) {
            return false;
        }
        self.index.insert(branch.clone(), self.records.len());
        self.records.push(BranchRecord {
            branch_id: branch,
            decision_id,
            label,
            state: BranchState::Unloaded,
        });
        true
    }

    fn state_mut(&mut self, branch: &str) -> Option<&mut BranchState> {
        let i = *self.index.get(branch)?;
        Some(&mut self.records[i].state)
    }

    /// unloaded -> loading
    pub(crate) fn start_loading(&mut self, ticket: FetchTicket) -> bool {
        match self.state_mut(ticket.branch_id.as_str()) {
            Some(state) if matches!(state, BranchState::Unloaded) => {
                *state = BranchState::Loading(ticket);
                true
            }
            _ => false,
        }
    }

    /// loading -> loaded-visible, only for the matching ticket
    pub(crate) fn finish_loading(&mut self, ticket: &FetchTicket) -> bool {
        match self.state_mut(ticket.branch_id.as_str()) {
            Some(state) if *state == BranchState::Loading(ticket.clone()) => {
                *state = BranchState::Loaded { visible: true };
                true
            }
            _ => false,
        }
    }

    /// loading -> unloaded, only for the matching ticket
    pub(crate) fn abort_loading(&mut self, ticket: &FetchTicket) -> bool {
        match self.state_mut(ticket.branch_id.as_str()) {
            Some(state) if *state == BranchState::Loading(ticket.clone()) => {
                *state = BranchState::Unloaded;
                true
            }
            _ => false,
        }
    }

    /// loaded-hidden <-> loaded-visible
    pub(crate) fn set_visible(&mut self, branch: &str, visible: bool) -> bool {
        match self.state_mut(branch) {
            Some(BranchState::Loaded { visible: v }) => {
                *v = visible;
                true
            }
            _ => false,
        }
    }
}
