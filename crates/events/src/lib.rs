//! Retrace event bus infrastructure.
//!
//! In-process notifications for version-history activity:
//!
//! - [`HistoryBus`] — publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`HistoryEvent`] — the canonical event envelope, built from a
//!   [`retrace_core::VersionRecord`] via
//!   [`HistoryEvent::version_recorded`] and
//!   [`HistoryEvent::entity_reverted`].
//!
//! The core engine stays synchronous about its own writes; hosts that want
//! to observe history wire a bus next to the store and publish after each
//! successful operation.

pub mod bus;

pub use bus::{HistoryBus, HistoryEvent, ENTITY_REVERTED, VERSION_RECORDED};
