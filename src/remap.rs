//! Relation reference rewriting.
//!
//! [`resolve_relations`] walks an arbitrary JSON value and rewrites numeric
//! fields whose names belong to a known relation group (see
//! [`RelationGroup::of_field`]) from the old ID space to the new one, using a
//! read-only view of the [`IdMap`]. The input is never mutated; the function
//! returns a fresh structure.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::idmap::IdMap;
use crate::models::RelationGroup;

/// What to do with a qualifying reference whose old ID has no map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Keep the original numeric value unchanged (tolerate partial data).
    Keep,
    /// Fail the document with an error naming the field and the missing ID.
    Fail,
}

/// Deep-copies `value`, translating every qualifying relation reference.
///
/// Arrays recurse element-wise and objects per key; scalars pass through.
/// A key/value pair qualifies when the key names a known relation group and
/// the value is a plain integer. Non-qualifying numeric fields (a price, a
/// year) are never touched, and unknown keys never error.
pub fn resolve_relations(value: &Value, map: &IdMap, mode: ResolveMode) -> Result<Value> {
    match value {
        Value::Array(items) => {
            let resolved: Result<Vec<Value>> = items
                .iter()
                .map(|item| resolve_relations(item, map, mode))
                .collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(fields) => {
            let mut out = serde_json::Map::with_capacity(fields.len());
            for (key, field) in fields {
                let resolved = match (RelationGroup::of_field(key), field.as_i64()) {
                    (Some(group), Some(old_id)) => match map.get(group.map_key(), old_id) {
                        Some(new_id) => Value::from(new_id),
                        None => match mode {
                            ResolveMode::Keep => field.clone(),
                            ResolveMode::Fail => bail!(
                                "unmapped {} reference in field '{}': {}",
                                group.map_key(),
                                key,
                                old_id
                            ),
                        },
                    },
                    // Relation-named fields holding nested values recurse like
                    // any other field.
                    _ => resolve_relations(field, map, mode)?,
                };
                out.insert(key.clone(), resolved);
            }
            Ok(Value::Object(out))
        }
        scalar => Ok(scalar.clone()),
    }
}
