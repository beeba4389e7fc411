//! Spreadsheet test data
//!
//! The fixture workbook holds one creature per row: column A is the numeric
//! id, column B the name. The first row is a header and is always skipped.
//! Rows with a missing or unusable id or name are dropped.

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// One validated row of the fixture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u32,
    pub name: String,
}

impl Record {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }
}

/// Load records from the first sheet of the workbook at `path`
pub fn load(path: &Path) -> E2eResult<Vec<Record>> {
    let fail = |reason: String| E2eError::FixtureLoad {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| fail(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| fail("workbook has no sheets".to_string()))?
        .map_err(|e| fail(e.to_string()))?;

    let records = records_from_rows(range.rows());
    debug!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

/// Convert raw sheet rows (header first) into records
pub fn records_from_rows<'a, I>(rows: I) -> Vec<Record>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    rows.into_iter().skip(1).filter_map(record_from_row).collect()
}

fn record_from_row(row: &[Data]) -> Option<Record> {
    let [id_cell, name_cell, ..] = row else {
        return None;
    };
    Some(Record {
        id: cell_to_id(id_cell)?,
        name: cell_to_name(name_cell)?,
    })
}

fn cell_to_id(cell: &Data) -> Option<u32> {
    let id = match cell {
        Data::Int(i) => u32::try_from(*i).ok(),
        Data::Float(f) if f.fract() == 0.0 && *f >= 1.0 && *f <= u32::MAX as f64 => Some(*f as u32),
        Data::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

fn cell_to_name(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        other => {
            let name = other.to_string().trim().to_string();
            (!name.is_empty()).then_some(name)
        }
    }
}

/// Names shared by more than one record, compared case-insensitively.
///
/// Downloaded images are keyed by name, so duplicates would overwrite each
/// other.
pub fn duplicate_names(records: &[Record]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = Vec::new();
    for record in records {
        let count = seen.entry(record.name.to_lowercase()).or_default();
        *count += 1;
        if *count == 2 {
            duplicates.push(record.name.clone());
        }
    }
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn load_rows(rows: Vec<Vec<Data>>) -> Vec<Record> {
        records_from_rows(rows.iter().map(|r| r.as_slice()))
    }

    #[test]
    fn test_drops_header_and_incomplete_rows() {
        let records = load_rows(vec![
            vec![s("Id"), s("Name")],
            vec![Data::Float(1.0), s("Bulbasaur")],
            vec![Data::Empty, s("Ivysaur")],
            vec![Data::Int(3), s("Venusaur")],
        ]);
        assert_eq!(
            records,
            vec![Record::new(1, "Bulbasaur"), Record::new(3, "Venusaur")]
        );
    }

    #[test]
    fn test_header_dropped_even_when_numeric() {
        let records = load_rows(vec![
            vec![Data::Int(25), s("Pikachu")],
            vec![Data::Int(1), s("Bulbasaur")],
        ]);
        assert_eq!(records, vec![Record::new(1, "Bulbasaur")]);
    }

    #[test]
    fn test_coerces_and_trims() {
        let records = load_rows(vec![
            vec![s("Id"), s("Name")],
            vec![s(" 25 "), s("  Pikachu \n")],
            vec![Data::Float(150.0), s("Mewtwo"), s("extra column")],
        ]);
        assert_eq!(
            records,
            vec![Record::new(25, "Pikachu"), Record::new(150, "Mewtwo")]
        );
    }

    #[test]
    fn test_rejects_unusable_cells() {
        let records = load_rows(vec![
            vec![s("Id"), s("Name")],
            vec![Data::Int(4)],
            vec![Data::Int(0), s("Zero")],
            vec![Data::Float(2.5), s("Fractional")],
            vec![s("seven"), s("Wordy")],
            vec![Data::Int(5), s("   ")],
            vec![Data::Int(6), Data::Empty],
            vec![],
            vec![Data::Int(7), s("Squirtle")],
        ]);
        assert_eq!(records, vec![Record::new(7, "Squirtle")]);
    }

    #[test]
    fn test_preserves_row_order() {
        let records = load_rows(vec![
            vec![s("Id"), s("Name")],
            vec![Data::Int(9), s("Blastoise")],
            vec![Data::Int(2), s("Ivysaur")],
            vec![Data::Int(5), s("Charmeleon")],
        ]);
        let ids: Vec<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![9, 2, 5]);
    }

    #[test]
    fn test_duplicate_names_case_insensitive() {
        let records = vec![
            Record::new(25, "Pikachu"),
            Record::new(26, "Raichu"),
            Record::new(125, "pikachu"),
            Record::new(225, "PIKACHU"),
        ];
        assert_eq!(duplicate_names(&records), vec!["pikachu".to_string()]);
        assert!(duplicate_names(&records[..2]).is_empty());
    }

    #[test]
    fn test_missing_file_is_fixture_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("missing.xlsx")).unwrap_err();
        assert!(matches!(err, E2eError::FixtureLoad { .. }));
        assert!(err.to_string().contains("missing.xlsx"));
    }
}
