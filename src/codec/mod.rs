//! Encoding and parsing of the three supported file formats. Export
//! encodes an in-memory record set into bytes; import parses an uploaded
//! file into raw candidate records before any background work starts.

use std::path::Path;

use anyhow::Result;

use crate::storage::users::User;
use crate::tasks::types::TaskFormat;

pub mod csv;
pub mod json;
pub mod xlsx;

/// Header names accepted as the user name column/key, matched
/// case-insensitively.
pub(crate) const NAME_ALIASES: &[&str] = &["name", "username", "user_name", "full_name", "fullname"];

/// Sample rows used for import templates.
pub(crate) const TEMPLATE_NAMES: [&str; 3] = ["Alice Example", "Bob Sample", "Carol Demo"];

/// One candidate record pulled out of an uploaded file. `position` is the
/// 1-based record number used in per-record error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub position: usize,
    pub name: String,
}

pub(crate) fn alias_matches(header: &str) -> bool {
    NAME_ALIASES.contains(&header.trim().to_ascii_lowercase().as_str())
}

/// Parses the whole file up front. A malformed file or a missing name
/// column fails here, before any task state exists.
pub fn parse_file(path: &Path, format: TaskFormat) -> Result<Vec<RawRecord>> {
    match format {
        TaskFormat::Json => json::parse(path),
        TaskFormat::Csv => csv::parse(path),
        TaskFormat::Xlsx => xlsx::parse(path),
    }
}

/// Pre-validation pass for the import endpoint: same parse, count only.
pub fn count_records(path: &Path, format: TaskFormat) -> Result<usize> {
    Ok(parse_file(path, format)?.len())
}

pub fn encode_users(users: &[User], format: TaskFormat) -> Result<Vec<u8>> {
    match format {
        TaskFormat::Json => json::encode(users),
        TaskFormat::Csv => csv::encode(users),
        TaskFormat::Xlsx => xlsx::encode(users),
    }
}

/// A freshly generated 3-row sample file for the import template
/// endpoint.
pub fn encode_template(format: TaskFormat) -> Result<Vec<u8>> {
    match format {
        TaskFormat::Json => json::encode_template(),
        TaskFormat::Csv => csv::encode_template(),
        TaskFormat::Xlsx => xlsx::encode_template(),
    }
}
