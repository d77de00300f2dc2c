//! Domain-level errors and structural warnings (no external dependencies)

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::entities::CategoryId;

/// Domain errors represent hierarchy rule violations.
///
/// The read side never raises these for malformed data; they surface only
/// when a write would break the hierarchy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("category cannot be its own parent: {0}")]
    SelfParent(CategoryId),

    #[error("moving {category} under {new_parent} would create a cycle")]
    CycleIntroduced {
        category: CategoryId,
        new_parent: CategoryId,
    },

    #[error("invalid category id: {0:?}")]
    InvalidId(String),

    #[error("category title must not be empty: {0}")]
    EmptyTitle(CategoryId),
}

/// Non-fatal inconsistency found while reading a snapshot.
///
/// Reported next to a best-effort result, never aborts the computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// `parent_id` names a record that is not in the snapshot
    DanglingParent {
        category: CategoryId,
        parent: CategoryId,
    },
    /// Following parents from `category` leads back to it
    Cycle {
        category: CategoryId,
        chain: Vec<CategoryId>,
    },
    /// `parent_id == id`
    SelfParent { category: CategoryId },
    /// Same id appears more than once; later records were dropped
    DuplicateId { category: CategoryId },
}

impl StructuralWarning {
    /// Category the warning is about.
    pub fn category(&self) -> &str {
        match self {
            StructuralWarning::DanglingParent { category, .. }
            | StructuralWarning::Cycle { category, .. }
            | StructuralWarning::SelfParent { category }
            | StructuralWarning::DuplicateId { category } => category,
        }
    }
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralWarning::DanglingParent { category, parent } => {
                write!(f, "{category}: parent {parent} does not exist, treated as root")
            }
            StructuralWarning::Cycle { category, chain } => {
                write!(
                    f,
                    "{category}: parent cycle {} -> {category}, treated as root",
                    chain.join(" -> ")
                )
            }
            StructuralWarning::SelfParent { category } => {
                write!(f, "{category}: is its own parent, treated as root")
            }
            StructuralWarning::DuplicateId { category } => {
                write!(f, "{category}: duplicate id, later records ignored")
            }
        }
    }
}
