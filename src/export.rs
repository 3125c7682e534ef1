// Spreadsheet export - plain format conversion, one row per record
//
// Canonical columns come first under their upstream captions, then the union
// of passthrough columns in sorted order so every record lines up against the
// same header regardless of which extras it happens to carry.

use crate::record::{display_value, Record, CANONICAL_EXPORT_COLUMNS};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Write the given records to a CSV file. Returns the number of data rows
/// written.
pub fn export_csv(records: &[Record], path: &Path) -> Result<usize> {
    let extra_columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.extra.keys().map(String::as_str))
        .collect();

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;

    let header: Vec<&str> = CANONICAL_EXPORT_COLUMNS
        .iter()
        .copied()
        .chain(extra_columns.iter().copied())
        .collect();
    writer.write_record(&header)?;

    for record in records {
        let mut row = record.canonical_values();
        for column in &extra_columns {
            row.push(
                record
                    .extra
                    .get(*column)
                    .map(display_value)
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }

    writer.flush().context("Failed to flush export file")?;
    Ok(records.len())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn record(id: i64, region: &str, extra: &[(&str, serde_json::Value)]) -> Record {
        Record {
            id,
            process_number: format!("{}/2024", id),
            entity: "INSTITUTO ALFA".to_string(),
            region: region.to_string(),
            year: "2024".to_string(),
            status: "SIM".to_string(),
            transfer_value: 100.0 * id as f64,
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn test_export_writes_all_rows_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");

        let records = vec![
            record(1, "SP", &[("CNPJ", json!("111"))]),
            record(2, "RJ", &[("EQUIPE", json!("EQUIPE 7"))]),
        ];
        let written = export_csv(&records, &path).unwrap();
        assert_eq!(written, 2);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "id");
        assert_eq!(&headers[3], "UF");
        // Extras appended in sorted order after the canonical block.
        assert_eq!(&headers[7], "CNPJ");
        assert_eq!(&headers[8], "EQUIPE");

        let rows: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "SP");
        assert_eq!(&rows[0][7], "111");
        assert_eq!(&rows[0][8], ""); // record 1 has no EQUIPE column
        assert_eq!(&rows[1][8], "EQUIPE 7");
    }

    #[test]
    fn test_export_empty_collection_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        let written = export_csv(&[], &path).unwrap();
        assert_eq!(written, 0);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), 7);
        assert_eq!(reader.records().count(), 0);
    }
}
