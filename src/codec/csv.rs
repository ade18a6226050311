use std::path::Path;

use anyhow::{anyhow, bail, Result};

use super::{alias_matches, RawRecord, NAME_ALIASES, TEMPLATE_NAMES};
use crate::storage::users::User;

/// UTF-8 byte-order mark, prepended to exports so spreadsheet tools pick
/// the right encoding.
const BOM: &[u8] = b"\xef\xbb\xbf";

pub fn encode(users: &[User]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(BOM);
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(["id", "name", "created_at", "updated_at"])?;
        for user in users {
            writer.write_record(&[
                user.id.to_string(),
                user.name.clone(),
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ])?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// First record is the header; the name column is located by alias.
/// Quoted fields, embedded commas and doubled-quote escapes are handled
/// by the reader. An empty name cell is a parse error naming the line.
pub fn parse(path: &Path) -> Result<Vec<RawRecord>> {
    let data = std::fs::read(path)?;
    let data = data.strip_prefix(BOM).unwrap_or(&data);

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(alias_matches)
        .ok_or_else(|| {
            anyhow!(
                "no name column found in header (expected one of: {})",
                NAME_ALIASES.join(", ")
            )
        })?;

    let mut records = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // header occupies line 1
        let line = i + 2;
        let name = record.get(name_idx).unwrap_or("");
        if name.is_empty() {
            bail!("row {}: empty name", line);
        }
        records.push(RawRecord {
            position: i + 1,
            name: name.to_string(),
        });
    }
    Ok(records)
}

pub fn encode_template() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.extend_from_slice(BOM);
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(["name"])?;
        for name in TEMPLATE_NAMES {
            writer.write_record([name])?;
        }
        writer.flush()?;
    }
    Ok(buf)
}
