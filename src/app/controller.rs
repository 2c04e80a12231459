//! Expansion controller - the only code path that writes branch state.
//!
//! A toggle is split in two synchronous halves around the (asynchronous)
//! fetch: `begin_toggle` decides what the intent means for the branch, and
//! `complete_fetch` applies a fetch result if, and only if, its ticket is
//! still the one the branch is waiting for.

use crate::app::session::Session;
use crate::domain::graph::{BranchExpansion, BranchPayload};
use crate::domain::ids::BranchId;
use crate::domain::lifecycle::{BranchState, FetchTicket};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("no call-flow session is active")]
    NoSession,

    #[error("unknown branch: {0}")]
    UnknownBranch(BranchId),
}

/// What a toggle intent did to the branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleStep {
    /// loaded-hidden -> loaded-visible
    Shown,
    /// loaded-visible -> loaded-hidden
    Hidden,
    /// A fetch is already in flight; the intent was absorbed
    Coalesced,
    /// unloaded -> loading; the caller must run the fetch for this ticket
    Fetch(FetchTicket),
}

/// Result of applying a fetch completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Payload cached, branch visible. Carries the nested branches it introduced.
    Loaded { discovered: Vec<BranchId> },
    /// Branch reverted to unloaded
    Failed(String),
    /// Ticket no longer current; nothing changed
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkToggle {
    pub shown: Vec<BranchId>,
    pub fetches: Vec<FetchTicket>,
}

pub struct ExpansionController;

impl ExpansionController {
    pub fn begin_toggle(session: &mut Session, branch: &str) -> Result<ToggleStep, ExpansionError> {
        let state = session
            .lifecycle
            .state(branch)
            .cloned()
            .ok_or_else(|| ExpansionError::UnknownBranch(branch.into()))?;

        let step = match state {
            BranchState::Unloaded => {
                debug_assert!(
                    !session.cache.contains(branch),
                    "unloaded branch {branch} already cached"
                );
                session.errors.remove(branch);
                let ticket = FetchTicket {
                    branch_id: branch.into(),
                    session_version: session.version(),
                    seq: session.next_seq(),
                };
                session.lifecycle.start_loading(ticket.clone());
                ToggleStep::Fetch(ticket)
            }
            BranchState::Loading(_) => ToggleStep::Coalesced,
            BranchState::Loaded { visible } => {
                session.lifecycle.set_visible(branch, !visible);
                if visible {
                    ToggleStep::Hidden
                } else {
                    ToggleStep::Shown
                }
            }
        };

        debug!(branch, version = session.version(), ?step, "toggle");
        Ok(step)
    }

    pub fn complete_fetch(
        session: &mut Session,
        ticket: &FetchTicket,
        result: anyhow::Result<BranchExpansion>,
    ) -> Completion {
        let current = session.version() == ticket.session_version
            && session.lifecycle.state(ticket.branch_id.as_str())
                == Some(&BranchState::Loading(ticket.clone()));
        if !current {
            debug!(branch = %ticket.branch_id, seq = ticket.seq, "discarding stale completion");
            return Completion::Stale;
        }

        match result.and_then(|expansion| accept_expansion(session, ticket, expansion)) {
            Ok(discovered) => {
                session.lifecycle.finish_loading(ticket);
                session.errors.remove(ticket.branch_id.as_str());
                debug!(
                    branch = %ticket.branch_id,
                    nested = discovered.len(),
                    "branch loaded"
                );
                Completion::Loaded { discovered }
            }
            Err(e) => {
                let msg = format!("{e:#}");
                warn!(branch = %ticket.branch_id, error = %msg, "branch expansion failed");
                session.lifecycle.abort_loading(ticket);
                session
                    .errors
                    .insert(ticket.branch_id.clone(), msg.clone());
                Completion::Failed(msg)
            }
        }
    }

    /// Show every branch of every rendered decision, one level deep.
    pub fn expand_all(session: &mut Session) -> BulkToggle {
        let targets: Vec<BranchId> = session
            .compose()
            .decision_nodes
            .into_iter()
            .flat_map(|d| d.branches)
            .filter(|b| !b.is_expanded && !b.is_loading)
            .map(|b| b.branch_id)
            .collect();

        let mut bulk = BulkToggle::default();
        for branch in targets {
            match Self::begin_toggle(session, branch.as_str()) {
                Ok(ToggleStep::Shown) => bulk.shown.push(branch),
                Ok(ToggleStep::Fetch(ticket)) => bulk.fetches.push(ticket),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "expand_all skipped branch"),
            }
        }
        bulk
    }

    /// Hide every visible branch. Cache entries are kept.
    pub fn collapse_all(session: &mut Session) -> Vec<BranchId> {
        let visible: Vec<BranchId> = session
            .lifecycle
            .records()
            .iter()
            .filter(|r| matches!(r.state, BranchState::Loaded { visible: true }))
            .map(|r| r.branch_id.clone())
            .collect();
        for branch in &visible {
            session.lifecycle.set_visible(branch.as_str(), false);
        }
        visible
    }
}

/// Validate and store a fetched payload. Leaves lifecycle transitions to the caller.
fn accept_expansion(
    session: &mut Session,
    ticket: &FetchTicket,
    expansion: BranchExpansion,
) -> anyhow::Result<Vec<BranchId>> {
    if expansion.expanded_branch_id != ticket.branch_id {
        anyhow::bail!(
            "analyzer answered for branch {} instead of {}",
            expansion.expanded_branch_id,
            ticket.branch_id
        );
    }

    let payload = BranchPayload::from(expansion);
    let fresh = session.ids.register_decisions(&payload.decision_nodes)?;

    let collisions = session.ids.observe_payload(&payload);
    for c in &collisions {
        warn!(
            branch = %ticket.branch_id,
            id = %c.id,
            first = ?c.first,
            second = ?c.second,
            "id collision in branch payload; keeping first entity"
        );
    }
    session.collisions.extend(collisions);

    for decision in &payload.decision_nodes {
        for branch in &decision.branches {
            if fresh.contains(&branch.branch_id) {
                session.lifecycle.discover(
                    branch.branch_id.clone(),
                    decision.id.clone(),
                    branch.label.clone(),
                );
            }
        }
    }

    if let Err(e) = session.cache.put(ticket.branch_id.clone(), payload) {
        debug_assert!(false, "{e}");
        warn!(error = %e, "cache refused payload");
    }
    Ok(fresh)
}
