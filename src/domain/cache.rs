use crate::domain::error::CacheError;
use crate::domain::graph::BranchPayload;
use crate::domain::ids::BranchId;
use std::collections::HashMap;
use std::sync::Arc;

/// Append-only store of fetched branch payloads for one session.
///
/// Entries are never replaced or evicted; the whole cache is dropped with its
/// session.
#[derive(Debug, Default)]
pub struct BranchCache {
    entries: HashMap<BranchId, Arc<BranchPayload>>,
}

impl BranchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, branch: &str) -> Option<&Arc<BranchPayload>> {
        self.entries.get(branch)
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.entries.contains_key(branch)
    }

    /// Store a payload. A second fetch for a cached branch is a logic error.
    pub fn put(&mut self, branch: BranchId, payload: BranchPayload) -> Result<(), CacheError> {
        if self.entries.contains_key(&branch) {
            return Err(CacheError::AlreadyCached(branch));
        }
        self.entries.insert(branch, Arc::new(payload));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn branch_ids(&self) -> impl Iterator<Item = &BranchId> {
        self.entries.keys()
    }
}
