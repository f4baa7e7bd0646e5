use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::workbook::layout::catalog;
use crate::workbook::{Workbook, WorkbookError};

#[derive(Error, Debug)]
pub enum CatalogImportError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("File has no '{0}' column")]
    MissingSerialColumn(&'static str),

    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows: usize,
    /// Rows whose serial cell is blank. They are stored but never match.
    pub blank_serials: usize,
    /// Expected catalog columns the file does not carry.
    pub missing_columns: Vec<String>,
}

/// Overwrites the catalog sheet with a CSV file's header and rows.
///
/// Cells are trimmed. Fully blank lines are dropped. The file must carry a
/// `Serial` column; other missing catalog columns are reported in the
/// summary, and scans will fail with a schema error until they are added.
pub fn import_csv(
    workbook: &dyn Workbook,
    sheet: &str,
    path: &Path,
) -> Result<ImportSummary, CatalogImportError> {
    let file = std::fs::File::open(path).map_err(|source| CatalogImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let serial_index = headers
        .iter()
        .position(|h| h == catalog::SERIAL)
        .ok_or(CatalogImportError::MissingSerialColumn(catalog::SERIAL))?;

    let mut rows = Vec::new();
    let mut blank_serials = 0;
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.get(serial_index).map_or(true, |s| s.is_empty()) {
            blank_serials += 1;
        }
        rows.push(row);
    }

    let missing_columns: Vec<String> = catalog::HEADERS
        .iter()
        .filter(|h| !headers.iter().any(|present| present == *h))
        .map(|h| h.to_string())
        .collect();
    if !missing_columns.is_empty() {
        warn!(
            "Catalog file {} lacks columns: {}",
            path.display(),
            missing_columns.join(", ")
        );
    }

    let summary = ImportSummary {
        rows: rows.len(),
        blank_serials,
        missing_columns,
    };
    workbook.replace_rows(sheet, headers, rows)?;
    info!(
        "Imported {} catalog rows into '{}' from {}",
        summary.rows,
        sheet,
        path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogIndex;
    use crate::workbook::MemoryWorkbook;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_import_replaces_catalog() {
        let wb = MemoryWorkbook::new().with_sheet("paco", &["Serial"], &[&["OLD"]]);
        let file = csv_file(
            "Serial,Maquina,Posto,Coordenada,Modelo,OT,Semiacabado,Pagoda\n\
             \x20X1 ,M1,P1,C1,MD,OT1,V1,PG1\n\
             ,,,,,,,\n\
             X2,M2,P2,C2,MD,OT2,V2,PG2\n",
        );

        let summary = import_csv(&wb, "paco", file.path()).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.blank_serials, 0);
        assert!(summary.missing_columns.is_empty());

        let snap = wb.snapshot("paco").unwrap().unwrap();
        let index = CatalogIndex::from_snapshot(&snap).unwrap();
        assert!(index.get("OLD").is_none());
        assert_eq!(index.get("x1").unwrap().machine, "M1");
        assert_eq!(index.get("X2").unwrap().variant, "V2");
    }

    #[test]
    fn test_import_reports_missing_columns() {
        let wb = MemoryWorkbook::new();
        let file = csv_file("Serial,OT\nA,1\n,2\n");
        let summary = import_csv(&wb, "paco", file.path()).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.blank_serials, 1);
        assert_eq!(summary.missing_columns.len(), 6);
        assert!(wb.has_sheet("paco").unwrap());
    }

    #[test]
    fn test_import_requires_serial_column() {
        let wb = MemoryWorkbook::new().with_sheet("paco", &["Serial"], &[&["KEEP"]]);
        let file = csv_file("Codigo,OT\nA,1\n");
        let err = import_csv(&wb, "paco", file.path()).unwrap_err();
        assert!(matches!(err, CatalogImportError::MissingSerialColumn("Serial")));
        let snap = wb.snapshot("paco").unwrap().unwrap();
        assert_eq!(snap.cell(2, 0), "KEEP");
    }

    #[test]
    fn test_import_missing_file() {
        let wb = MemoryWorkbook::new();
        let err = import_csv(&wb, "paco", Path::new("/nonexistent/catalog.csv")).unwrap_err();
        assert!(matches!(err, CatalogImportError::Open { .. }));
    }
}
