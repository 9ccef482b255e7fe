// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Error types shared by every idspace crate.

Errors are transport-agnostic; adapters map them to HTTP status codes or
reconciliation conditions using [`IdError::kind`].
*/

use thiserror::Error;

/// Coarse classification of an [`IdError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any mutation (400 in HTTP)
    Validation,
    /// Collides with existing allocations (409 in HTTP)
    Conflict,
    /// Operation called in the wrong lifecycle state (412 in HTTP)
    Precondition,
    /// No free id left in the target table (507 in HTTP)
    Exhaustion,
    /// Durable store failure; cache and store may have diverged (500 in HTTP)
    Storage,
}

/// Errors raised by allocation, validation and storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Claim is syntactically invalid
    #[error("Invalid claim: {0}")]
    InvalidClaim(String),

    /// Index definition is invalid
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// Claim has both an id and a range, or an unknown type
    #[error("Invalid claim type for claim '{0}'")]
    InvalidClaimType(String),

    /// Requested id/block belongs to another owner
    #[error("Id {id} already claimed by '{owner}'")]
    AlreadyClaimed { id: String, owner: String },

    /// Range claim intersects existing parent or child allocations
    #[error("Range {range} overlaps existing allocation: {detail}")]
    Overlap { range: String, detail: String },

    /// Claim resolved into the reserved min/max span of its index
    #[error("Claim '{claim}' falls inside reserved range '{reserved}'")]
    Reserved { claim: String, reserved: String },

    /// More than one slot matches an owner selector
    #[error("Multiple entries owned by claim '{claim}': {ids}")]
    MultipleOwnerEntries { claim: String, ids: String },

    /// Parent lookup failed
    #[error("No parent found for claim '{claim}' (selector: {selector})")]
    NoParent { claim: String, selector: String },

    /// Parent lookup resolved to a non-range entry
    #[error("Parent of claim '{claim}' must be a range, found '{parent}'")]
    ParentNotRange { claim: String, parent: String },

    /// Parent lookup resolved to more than one range
    #[error("Ambiguous parent for claim '{claim}': {parents}")]
    MultipleParents { claim: String, parents: String },

    /// Range table does not exist in the cache
    #[error("Range table '{0}' not found")]
    RangeTableNotFound(String),

    /// No free id left
    #[error("No free id available in {0}")]
    Exhausted(String),

    /// Lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already present
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Claim/Release before CreateIndex finished
    #[error("Cache not initialized for index '{0}'")]
    CacheNotInitialized(String),

    /// Durable store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl IdError {
    /// Classify the error for adapters and retry policies
    pub fn kind(&self) -> ErrorKind {
        match self {
            IdError::InvalidClaim(_) | IdError::InvalidIndex(_) | IdError::InvalidClaimType(_) => {
                ErrorKind::Validation
            }
            IdError::AlreadyClaimed { .. }
            | IdError::Overlap { .. }
            | IdError::Reserved { .. }
            | IdError::MultipleOwnerEntries { .. }
            | IdError::NoParent { .. }
            | IdError::ParentNotRange { .. }
            | IdError::MultipleParents { .. }
            | IdError::AlreadyExists(_) => ErrorKind::Conflict,
            IdError::CacheNotInitialized(_)
            | IdError::RangeTableNotFound(_)
            | IdError::NotFound(_) => ErrorKind::Precondition,
            IdError::Exhausted(_) => ErrorKind::Exhaustion,
            IdError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<serde_json::Error> for IdError {
    fn from(err: serde_json::Error) -> Self {
        IdError::Storage(format!("serialization failed: {}", err))
    }
}

impl From<std::io::Error> for IdError {
    fn from(err: std::io::Error) -> Self {
        IdError::Storage(err.to_string())
    }
}

/// Result type for idspace operations
pub type IdResult<T> = Result<T, IdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(IdError::InvalidClaim("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(
            IdError::Overlap { range: "1-2".into(), detail: "child".into() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(IdError::CacheNotInitialized("ns/a".into()).kind(), ErrorKind::Precondition);
        assert_eq!(IdError::Exhausted("tree".into()).kind(), ErrorKind::Exhaustion);
        assert_eq!(IdError::Storage("disk".into()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let err: IdError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, IdError::Storage(_)));
    }
}
