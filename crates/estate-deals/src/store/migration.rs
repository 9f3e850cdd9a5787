use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::backend::StorageError;
use super::collection::Collection;
use super::Snapshot;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Bring a raw persisted document up to [`CURRENT_SCHEMA_VERSION`].
///
/// Version 0 is the unversioned layout of the legacy client: one top-level key per
/// collection (`comparisonItems`, `mortgageApplications`, ...) holding records with
/// camelCase field names.
pub fn upgrade(raw: Value) -> Result<(Snapshot, bool), StorageError> {
    let version = raw
        .get("schema_version")
        .and_then(Value::as_u64)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
        .unwrap_or(0);

    match version {
        0 => Ok((from_legacy(raw), true)),
        CURRENT_SCHEMA_VERSION => Ok((serde_json::from_value(raw)?, false)),
        found => Err(StorageError::UnsupportedSchema {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        }),
    }
}

fn from_legacy(raw: Value) -> Snapshot {
    let Value::Object(mut root) = raw else {
        return Snapshot::empty();
    };

    let mut collections = BTreeMap::new();
    for collection in Collection::ordered() {
        let records = root
            .remove(collection.legacy_key())
            .or_else(|| root.remove(collection.key()));
        if let Some(Value::Array(records)) = records {
            collections.insert(
                collection,
                records.into_iter().map(snake_case_keys).collect(),
            );
        }
    }

    Snapshot {
        schema_version: CURRENT_SCHEMA_VERSION,
        collections,
    }
}

fn snake_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (to_snake_case(&key), snake_case_keys(inner)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_keys).collect()),
        other => other,
    }
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (index, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
