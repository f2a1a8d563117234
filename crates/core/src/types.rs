/// All database-backed identifiers are 64-bit integers (PostgreSQL BIGSERIAL).
pub type DbId = i64;

/// All timestamps are UTC. They are audit metadata only; history ordering
/// is always by version number.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// The attribute state of a versioned entity.
///
/// A `BTreeMap` keeps iteration deterministic, which keeps diffs and their
/// serialized form stable across runs.
pub type AttributeMap = std::collections::BTreeMap<String, serde_json::Value>;
