//! Row models for the version history tables.
//!
//! Each submodule contains a `FromRow` + `Serialize` struct matching the
//! database row, plus its conversion into the `retrace-core` domain type.

pub mod entity_state;
pub mod version;

pub use entity_state::EntityStateRow;
pub use version::VersionRow;
