use std::path::Path;

use anyhow::{anyhow, bail, Result};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};

use super::{alias_matches, RawRecord, NAME_ALIASES, TEMPLATE_NAMES};
use crate::storage::users::User;

const SHEET_NAME: &str = "Users";

pub fn encode(users: &[User]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    let headers = ["id", "name", "created_at", "updated_at"];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_with_format(0, col as u16, *header, &bold)?;
    }
    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(2, 24)?;
    sheet.set_column_width(3, 24)?;

    for (i, user) in users.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write(row, 0, user.id)?;
        sheet.write(row, 1, user.name.as_str())?;
        sheet.write(row, 2, user.created_at.to_rfc3339())?;
        sheet.write(row, 3, user.updated_at.to_rfc3339())?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Reads the first sheet as tabular rows; works for both .xlsx and .xls
/// uploads. The name column is located in the header row by alias.
pub fn parse(path: &Path) -> Result<Vec<RawRecord>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("workbook has no sheets"))??;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| anyhow!("sheet is empty"))?;
    let name_idx = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if alias_matches(s)))
        .ok_or_else(|| {
            anyhow!(
                "no name column found in header row (expected one of: {})",
                NAME_ALIASES.join(", ")
            )
        })?;

    let mut records = Vec::new();
    for (i, row) in rows.enumerate() {
        let position = i + 1;
        let name = match row.get(name_idx) {
            Some(Data::String(s)) if !s.is_empty() => s.clone(),
            Some(Data::Int(v)) => v.to_string(),
            Some(Data::Float(v)) => v.to_string(),
            _ => bail!("row {}: empty name", position + 1),
        };
        records.push(RawRecord { position, name });
    }
    Ok(records)
}

pub fn encode_template() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    sheet.write_with_format(0, 0, "name", &bold)?;
    sheet.set_column_width(0, 30)?;
    for (i, name) in TEMPLATE_NAMES.iter().enumerate() {
        sheet.write(i as u32 + 1, 0, *name)?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        std::fs::write(file.path(), bytes).unwrap();
        file
    }

    #[test]
    fn export_parses_back() {
        let now = Utc::now();
        let users = vec![
            User {
                id: 1,
                name: "Ann".to_string(),
                created_at: now,
                updated_at: now,
            },
            User {
                id: 2,
                name: "Ben".to_string(),
                created_at: now,
                updated_at: now,
            },
        ];
        let file = write_temp(&encode(&users).unwrap());
        let records = parse(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Ann");
        assert_eq!(records[1].position, 2);
    }

    #[test]
    fn empty_export_has_header_sheet_only() {
        let file = write_temp(&encode(&[]).unwrap());
        let records = parse(file.path()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn template_round_trips() {
        let file = write_temp(&encode_template().unwrap());
        let records = parse(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "Alice Example");
    }

    #[test]
    fn missing_name_column_is_rejected() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write(0, 0, "email").unwrap();
        sheet.write(1, 0, "a@example.com").unwrap();
        let file = write_temp(&workbook.save_to_buffer().unwrap());
        let err = parse(file.path()).unwrap_err();
        assert!(err.to_string().contains("no name column"));
    }
}
