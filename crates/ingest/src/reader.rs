//! Reading tables from delimited text and spreadsheet workbooks.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;

use crate::{IngestError, IngestResult, Table};

/// Maximum file size accepted for a tabular source (16 MiB).
pub const MAX_TABLE_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Physical format of a tabular source, derived from its file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with the given field separator.
    Delimited(u8),
    /// Excel/OpenDocument workbook; the first worksheet is read.
    Workbook,
}

impl SourceFormat {
    /// Detects the format from the extension of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::UnsupportedFormat`] for unknown or missing extensions.
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(Self::Delimited(b',')),
            "tsv" | "tab" => Ok(Self::Delimited(b'\t')),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            _ => Err(IngestError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Reads the table stored at `path`, choosing the reader from the file extension.
///
/// # Errors
///
/// Returns [`IngestError`] if the file is missing, too large, of an unsupported format, or
/// cannot be parsed at all. Individual unreadable rows do not fail the call; they are
/// recorded on the returned table as rejected rows.
pub fn read_table(path: &Path) -> IngestResult<Table> {
    let format = SourceFormat::from_path(path)?;
    check_file_size(path)?;

    let table = match format {
        SourceFormat::Delimited(delimiter) => {
            let file = File::open(path).map_err(|e| io_error(path, e))?;
            read_delimited(file, delimiter)?
        }
        SourceFormat::Workbook => read_workbook(path)?,
    };

    tracing::debug!(
        path = %path.display(),
        columns = table.headers().len(),
        rows = table.len(),
        rejected = table.rejected().len(),
        "table read"
    );
    Ok(table)
}

/// Reads delimited text with a header row.
///
/// Records with the wrong number of fields or invalid UTF-8 are rejected individually.
///
/// # Errors
///
/// Returns [`IngestError::NoHeader`] if there is no header row and [`IngestError::Csv`] for
/// errors that stop the reader (I/O failures).
pub fn read_delimited<R: Read>(reader: R, delimiter: u8) -> IngestResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::NoHeader);
    }

    let mut table = Table::new(headers.iter());
    for result in reader.records() {
        match result {
            Ok(record) => table.push_cells(record.iter().map(Some)),
            Err(err) => match err.kind() {
                csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. } => {
                    tracing::warn!(error = %err, "rejecting unreadable row");
                    table.push_rejected(err.to_string());
                }
                _ => return Err(err.into()),
            },
        }
    }

    Ok(table)
}

fn read_workbook(path: &Path) -> IngestResult<Table> {
    let workbook_error = |message: String| IngestError::Workbook {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| workbook_error(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| workbook_error("workbook has no worksheets".into()))?
        .map_err(|e| workbook_error(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(IngestError::NoHeader)?;
    let headers: Vec<String> = header
        .iter()
        .map(|c| cell_text(c).unwrap_or_default())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::NoHeader);
    }

    let mut table = Table::new(&headers);
    for row in rows {
        table.push_cells(row.iter().map(cell_text));
    }
    Ok(table)
}

/// Renders a workbook cell as text; empty and error cells are absent.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|ndt| {
            if ndt.num_seconds_from_midnight() == 0 {
                ndt.date().format("%Y-%m-%d").to_string()
            } else {
                ndt.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
        }),
    }
}

fn check_file_size(path: &Path) -> IngestResult<()> {
    let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;
    if metadata.len() > MAX_TABLE_FILE_SIZE {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: MAX_TABLE_FILE_SIZE,
        });
    }
    Ok(())
}

fn io_error(path: &Path, e: std::io::Error) -> IngestError {
    if e.kind() == std::io::ErrorKind::NotFound {
        IngestError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};
    use std::fs;
    use tempfile::TempDir;

    fn excel_date(serial: f64) -> Data {
        Data::DateTime(ExcelDateTime::new(serial, ExcelDateTimeType::DateTime, false))
    }

    #[test]
    fn numeric_cells_render_without_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(44054006.0)).as_deref(), Some("44054006"));
        assert_eq!(cell_text(&Data::Float(7.25)).as_deref(), Some("7.25"));
        assert_eq!(cell_text(&Data::Int(73211009)).as_deref(), Some("73211009"));
        assert_eq!(cell_text(&Data::Bool(true)).as_deref(), Some("true"));
    }

    #[test]
    fn date_cells_render_as_iso_text() {
        assert_eq!(cell_text(&excel_date(45292.0)).as_deref(), Some("2024-01-01"));
        assert_eq!(
            cell_text(&excel_date(45292.5)).as_deref(),
            Some("2024-01-01T12:00:00")
        );
        assert_eq!(
            cell_text(&Data::DateTimeIso("2024-01-01T08:30:00".into())).as_deref(),
            Some("2024-01-01T08:30:00")
        );
    }

    #[test]
    fn empty_and_error_cells_are_absent() {
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Error(CellErrorType::Div0)), None);
        assert_eq!(cell_text(&Data::String("E11".into())).as_deref(), Some("E11"));
    }

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a/mapping 4.xlsx")).expect("xlsx"),
            SourceFormat::Workbook
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("codes.CSV")).expect("csv"),
            SourceFormat::Delimited(b',')
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("codes.tsv")).expect("tsv"),
            SourceFormat::Delimited(b'\t')
        );
        match SourceFormat::from_path(Path::new("codes.json")) {
            Err(IngestError::UnsupportedFormat { extension, .. }) => assert_eq!(extension, "json"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn reads_csv_with_quoted_fields_and_blanks() {
        let data = "Disease,ICD 11,Ayurveda Code\n\"Fever, acute\",MG26,\nDiabetes, 5A11 ,AY01\n";
        let table = read_delimited(data.as_bytes(), b',').expect("read csv");

        assert_eq!(table.headers(), &["disease", "icd_11", "ayurveda_code"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].cell(0), Some("Fever, acute"));
        assert_eq!(table.rows()[0].cell(2), None);
        assert_eq!(table.rows()[1].cell(1), Some("5A11"));
    }

    #[test]
    fn rejects_ragged_rows_and_keeps_going() {
        let data = "a,b\n1,2\n3\n5,6\n";
        let table = read_delimited(data.as_bytes(), b',').expect("read csv");

        assert_eq!(table.len(), 2);
        assert_eq!(table.rejected().len(), 1);
        assert_eq!(table.rejected()[0].index, 2);
        assert_eq!(table.rows()[1].index(), 3);
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = read_delimited("".as_bytes(), b',').expect_err("no header");
        assert!(matches!(err, IngestError::NoHeader));
    }

    #[test]
    fn read_table_reports_missing_file() {
        let tmp = TempDir::new().expect("tempdir");
        let err = read_table(&tmp.path().join("absent.csv")).expect_err("missing file");
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }

    #[test]
    fn read_table_reads_tsv_from_disk() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("rows.tsv");
        fs::write(&path, "first name\tgender\nAsha\tFemale\n").expect("write tsv");

        let table = read_table(&path).expect("read tsv");
        assert_eq!(table.headers(), &["first_name", "gender"]);
        assert_eq!(table.rows()[0].cell(1), Some("Female"));
    }

    #[test]
    fn invalid_workbook_is_an_error_not_a_panic() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("broken.xlsx");
        fs::write(&path, b"not a zip archive").expect("write file");

        let err = read_table(&path).expect_err("broken workbook");
        assert!(matches!(err, IngestError::Workbook { .. }));
    }
}
