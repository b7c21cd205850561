//! PATCH semantics for repository documents.
//!
//! An array body is a JSON Patch (RFC 6902) restricted to the `add`,
//! `replace` and `remove` operations used on Nudr_DR resources; an object
//! body is a JSON Merge Patch (RFC 7386).

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors from applying a patch document.
#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("patch body must be a JSON object or an array of patch items")]
    InvalidBody,

    #[error("invalid patch item: {0}")]
    InvalidItem(String),

    #[error("unsupported patch operation: {0}")]
    UnsupportedOp(String),

    #[error("patch path does not exist: {0}")]
    PathNotFound(String),
}

/// One RFC 6902 operation (3GPP `PatchItem`).
#[derive(Debug, Deserialize)]
struct PatchItem {
    op: String,
    path: String,
    #[serde(default)]
    value: Option<Value>,
}

/// Apply `patch` to `target` in place.
pub fn apply(target: &mut Value, patch: &Value) -> Result<(), PatchError> {
    match patch {
        Value::Array(items) => {
            for item in items {
                let item: PatchItem = serde_json::from_value(item.clone())
                    .map_err(|e| PatchError::InvalidItem(e.to_string()))?;
                apply_item(target, item)?;
            }
            Ok(())
        }
        Value::Object(_) => {
            merge(target, patch);
            Ok(())
        }
        _ => Err(PatchError::InvalidBody),
    }
}

fn apply_item(target: &mut Value, item: PatchItem) -> Result<(), PatchError> {
    match item.op.as_str() {
        "replace" => {
            let value = item
                .value
                .ok_or_else(|| PatchError::InvalidItem("replace without value".into()))?;
            let slot = target
                .pointer_mut(&item.path)
                .ok_or(PatchError::PathNotFound(item.path))?;
            *slot = value;
            Ok(())
        }
        "add" => {
            let value = item
                .value
                .ok_or_else(|| PatchError::InvalidItem("add without value".into()))?;
            let (parent, key) = split_pointer(&item.path)?;
            match target.pointer_mut(parent) {
                Some(Value::Object(map)) => {
                    map.insert(key, value);
                    Ok(())
                }
                Some(Value::Array(arr)) if key == "-" => {
                    arr.push(value);
                    Ok(())
                }
                Some(Value::Array(arr)) => {
                    let idx: usize = key
                        .parse()
                        .map_err(|_| PatchError::PathNotFound(item.path.clone()))?;
                    if idx > arr.len() {
                        return Err(PatchError::PathNotFound(item.path));
                    }
                    arr.insert(idx, value);
                    Ok(())
                }
                _ => Err(PatchError::PathNotFound(item.path)),
            }
        }
        "remove" => {
            let (parent, key) = split_pointer(&item.path)?;
            let removed = match target.pointer_mut(parent) {
                Some(Value::Object(map)) => map.remove(&key).is_some(),
                Some(Value::Array(arr)) => match key.parse::<usize>() {
                    Ok(idx) if idx < arr.len() => {
                        arr.remove(idx);
                        true
                    }
                    _ => false,
                },
                _ => false,
            };
            if removed {
                Ok(())
            } else {
                Err(PatchError::PathNotFound(item.path))
            }
        }
        other => Err(PatchError::UnsupportedOp(other.to_owned())),
    }
}

/// Split a JSON pointer into its parent pointer and unescaped last token.
fn split_pointer(path: &str) -> Result<(&str, String), PatchError> {
    let idx = path
        .rfind('/')
        .ok_or_else(|| PatchError::InvalidItem(format!("invalid JSON pointer: {path}")))?;
    let key = path[idx + 1..].replace("~1", "/").replace("~0", "~");
    Ok((&path[..idx], key))
}

fn merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
