use crate::domain::ids::BranchId;
use crate::domain::node::DecisionId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("branch {0} is already cached")]
    AlreadyCached(BranchId),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("branch {branch} is claimed by decision {owner} and decision {other}")]
    DuplicateBranchId {
        branch: BranchId,
        owner: DecisionId,
        other: DecisionId,
    },
}
