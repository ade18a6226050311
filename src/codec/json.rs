use std::path::Path;

use anyhow::{bail, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::{RawRecord, NAME_ALIASES, TEMPLATE_NAMES};
use crate::storage::users::User;

#[derive(Debug, Serialize)]
struct ExportEnvelope<'a> {
    exported_at: String,
    total: usize,
    users: &'a [User],
}

pub fn encode(users: &[User]) -> Result<Vec<u8>> {
    let envelope = ExportEnvelope {
        exported_at: Utc::now().to_rfc3339(),
        total: users.len(),
        users,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Accepts either a bare array of records or an object wrapping one in a
/// `users` key. Each element must carry a non-empty name under one of the
/// accepted aliases; whitespace-only names survive parsing and fail
/// per-record validation later.
pub fn parse(path: &Path) -> Result<Vec<RawRecord>> {
    let data = std::fs::read(path)?;
    let value: Value = serde_json::from_slice(&data)?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("users").and_then(Value::as_array) {
            Some(items) => items,
            None => bail!("expected a JSON array of users or an object with a 'users' array"),
        },
        _ => bail!("expected a JSON array of users or an object with a 'users' array"),
    };

    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let position = i + 1;
        let name = NAME_ALIASES
            .iter()
            .find_map(|key| item.get(key).and_then(Value::as_str))
            .filter(|name| !name.is_empty());
        match name {
            Some(name) => records.push(RawRecord {
                position,
                name: name.to_string(),
            }),
            None => bail!("element {} has no usable name field", position),
        }
    }
    Ok(records)
}

pub fn encode_template() -> Result<Vec<u8>> {
    let users: Vec<Value> = TEMPLATE_NAMES
        .iter()
        .map(|name| serde_json::json!({ "name": name }))
        .collect();
    Ok(serde_json::to_vec_pretty(&serde_json::json!({ "users": users }))?)
}
