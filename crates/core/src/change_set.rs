//! Attribute-level diffs between two entity states.
//!
//! A [`ChangeSet`] is an immutable mapping from field name to an
//! `(old, new)` value pair. It serializes as a JSON object keyed by field
//! name, which is the shape stored in the `change_set` JSONB column.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::AttributeMap;

/// Which side of a [`ChangeSet`] to write when applying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Write `new` values (replay history forward).
    Forward,
    /// Write `old` values (unwind history).
    Backward,
}

/// One attribute transition.
///
/// `Value::Null` on either side means the attribute is absent in that
/// state; applying a null side removes the attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub old: Value,
    pub new: Value,
}

/// An immutable field-level diff between two states of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<String, Change>,
}

impl ChangeSet {
    /// Diff two states.
    ///
    /// Records an entry for every attribute present in either state whose
    /// value differs; unchanged attributes are omitted. The result is a
    /// mapping, so it carries no field order beyond the key sort.
    pub fn diff(old_state: &AttributeMap, new_state: &AttributeMap) -> Self {
        let fields: BTreeSet<&String> = old_state.keys().chain(new_state.keys()).collect();
        let mut changes = BTreeMap::new();
        for field in fields {
            let old = old_state.get(field).cloned().unwrap_or(Value::Null);
            let new = new_state.get(field).cloned().unwrap_or(Value::Null);
            if old != new {
                changes.insert(field.clone(), Change { old, new });
            }
        }
        Self { changes }
    }

    /// Apply this diff to `state`, producing a new state.
    ///
    /// Attributes not mentioned by the diff pass through unmodified. Pure:
    /// the input state is untouched.
    pub fn apply(&self, state: &AttributeMap, direction: Direction) -> AttributeMap {
        let mut next = state.clone();
        for (field, change) in &self.changes {
            let value = match direction {
                Direction::Forward => &change.new,
                Direction::Backward => &change.old,
            };
            if value.is_null() {
                next.remove(field);
            } else {
                next.insert(field.clone(), value.clone());
            }
        }
        next
    }

    /// Compose this diff with one recorded after it.
    ///
    /// The result keeps the earliest `old` and the latest `new` per field;
    /// entries whose value ends up back where it started are dropped.
    pub fn merge(&self, later: &ChangeSet) -> ChangeSet {
        let mut changes = self.changes.clone();
        for (field, change) in &later.changes {
            match changes.entry(field.clone()) {
                Entry::Occupied(mut entry) => {
                    if entry.get().old == change.new {
                        entry.remove();
                    } else {
                        entry.get_mut().new = change.new.clone();
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(change.clone());
                }
            }
        }
        ChangeSet { changes }
    }

    /// Swap the old and new side of every entry.
    pub fn invert(&self) -> ChangeSet {
        let changes = self
            .changes
            .iter()
            .map(|(field, change)| {
                (
                    field.clone(),
                    Change {
                        old: change.new.clone(),
                        new: change.old.clone(),
                    },
                )
            })
            .collect();
        ChangeSet { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The transition recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Change> {
        self.changes.get(field)
    }

    /// Names of all changed fields, sorted.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }
}
