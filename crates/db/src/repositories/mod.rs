//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! against the version history tables.

pub mod entity_state_repo;
pub mod version_repo;

pub use entity_state_repo::EntityStateRepo;
pub use version_repo::VersionRepo;
