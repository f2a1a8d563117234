use crate::owner::OwnerRef;
use crate::store::StoreError;

/// Domain errors of the versioning core.
///
/// Store failures are wrapped transparently; everything else carries the
/// owner it concerns so callers can log a usable reference.
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// A revert target that does not exist in the owner's sequence.
    /// Surfaced to the caller, never retried.
    #[error("version {target} not found for {owner}")]
    NotFound { owner: OwnerRef, target: String },

    /// Version-number assignment failed even after recomputing the
    /// sequence tail. Two conflicts in a row mean a writer is racing
    /// persistently or the store is misbehaving.
    #[error("version number assignment failed for {owner}: {detail}")]
    Sequence { owner: OwnerRef, detail: String },

    /// A stored sequence violates the contiguous 1..N numbering invariant.
    #[error("version history for {owner} is corrupt: {detail}")]
    Corrupt { owner: OwnerRef, detail: String },

    /// Records of two unrelated owners were compared. Indicates a
    /// programming error in the caller.
    #[error("cannot compare versions of {left} and {right}")]
    Incomparable { left: OwnerRef, right: OwnerRef },

    /// A failure in the backing store, surfaced unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VersionError {
    pub(crate) fn not_found(owner: &OwnerRef, target: impl Into<String>) -> Self {
        Self::NotFound {
            owner: owner.clone(),
            target: target.into(),
        }
    }
}
