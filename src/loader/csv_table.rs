//! CSV loading
//!
//! Reads CSV files into named in-memory tables. The table name is the file
//! name up to its first `.`, so `orders.csv` and `orders.2023.csv` both load
//! as `orders`. Column types are inferred per column: a column whose every
//! non-empty cell is a whole number becomes `Integer`, one whose cells are all
//! numeric becomes `Float`, anything else stays `Text`. A whole number too
//! large for `i64` keeps its column `Text`. Empty cells are NULL.

use crate::database::value::CellValue;
use crate::error::{LoaderError, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Loaded tables keyed by name
pub type CsvTables = BTreeMap<String, CsvTable>;

/// One CSV file held in memory
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTable {
    /// Table name, derived from the file name
    pub name: String,
    /// Header row, in file order
    pub columns: Vec<String>,
    /// Data rows; each has exactly `columns.len()` cells
    pub rows: Vec<Vec<CellValue>>,
}

impl CsvTable {
    /// Create an empty table
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// Check that `name` can be spliced into SQL as a bare identifier
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(LoaderError::InvalidIdentifier(name.to_string()))
    }
}

/// Table name for a CSV file: the file name up to its first `.`
pub fn table_name_for(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    file_name.split('.').next().map(str::to_string)
}

// "007" would lose its zeros as a number, so it stays text.
fn has_leading_zero(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.")
}

fn is_whole_number(cell: &str) -> bool {
    let digits = cell.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(cell);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind = ColumnKind::Integer;

    for cell in cells.filter(|c| !c.is_empty()) {
        if has_leading_zero(cell) {
            return ColumnKind::Text;
        }
        if is_whole_number(cell) {
            // Past i64 a float would round the value.
            if cell.parse::<i64>().is_err() {
                return ColumnKind::Text;
            }
            if kind == ColumnKind::Integer {
                continue;
            }
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => kind = ColumnKind::Float,
            _ => return ColumnKind::Text,
        }
    }

    kind
}

fn convert(cell: &str, kind: ColumnKind) -> CellValue {
    if cell.is_empty() {
        return CellValue::Null;
    }
    match kind {
        ColumnKind::Integer => cell
            .parse()
            .map(CellValue::Integer)
            .unwrap_or_else(|_| CellValue::from(cell)),
        ColumnKind::Float => cell
            .parse()
            .map(CellValue::Float)
            .unwrap_or_else(|_| CellValue::from(cell)),
        ColumnKind::Text => CellValue::from(cell),
    }
}

/// Load a CSV file into an in-memory table
pub fn load_csv(path: &Path) -> Result<CsvTable> {
    let name = table_name_for(path)
        .ok_or_else(|| LoaderError::InvalidIdentifier(path.display().to_string()))?;
    validate_identifier(&name)?;

    let csv_error = |source: csv::Error| LoaderError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(BufReader::new(file));

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    for column in &columns {
        validate_identifier(column)?;
    }

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record.map_err(csv_error)?);
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|idx| infer_kind(records.iter().map(|r| r.get(idx).unwrap_or(""))))
        .collect();
    debug!(table = %name, ?kinds, "inferred column types");

    let mut table = CsvTable::new(name, columns);
    table.rows = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&kinds)
                .map(|(cell, kind)| convert(cell, *kind))
                .collect()
        })
        .collect();

    Ok(table)
}

/// Load every `.csv` file in `dir`
///
/// Other files are logged and skipped. Two files mapping to the same table
/// name resolve to the one that sorts last.
pub fn load_directory(dir: &Path) -> Result<CsvTables> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    paths.sort();

    let mut tables = CsvTables::new();
    for path in paths {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Loading csv file: {}", file_name);

        if !path.is_file() || !file_name.ends_with(".csv") {
            debug!("Skipping {}: not a .csv file", file_name);
            continue;
        }

        let table = load_csv(&path)?;
        tables.insert(table.name.clone(), table);
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_for() {
        assert_eq!(
            table_name_for(Path::new("tables/orders.csv")).as_deref(),
            Some("orders")
        );
        assert_eq!(
            table_name_for(Path::new("orders.2023.csv")).as_deref(),
            Some("orders")
        );
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("items_in_orders").is_ok());
        assert!(validate_identifier("_x1").is_ok());
        assert!(validate_identifier("1abc").is_err());
        assert!(validate_identifier("drop table; --").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(infer_kind(["1", "", "-3"].into_iter()), ColumnKind::Integer);
        assert_eq!(infer_kind(["1", "2.50"].into_iter()), ColumnKind::Float);
        assert_eq!(infer_kind(["E01", "3"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["2023-01-05"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["007", "8"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["0", "0.5"].into_iter()), ColumnKind::Float);
        assert_eq!(infer_kind(["NaN"].into_iter()), ColumnKind::Text);
        assert_eq!(infer_kind(["1.5", "2"].into_iter()), ColumnKind::Float);
    }

    #[test]
    fn test_integer_overflow_stays_text() {
        let cells = ["1", "12345678901234567891"];
        assert_eq!(infer_kind(cells.into_iter()), ColumnKind::Text);
        assert_eq!(
            convert("12345678901234567891", ColumnKind::Text),
            CellValue::from("12345678901234567891")
        );
    }

    fn write(dir: &Path, file: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(file);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_ragged_row_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "orders.csv", "CID,OrderID\nC1,O1\nC2\n");

        let err = load_csv(&path).unwrap_err();
        assert!(matches!(err, LoaderError::Csv { ref path, .. } if path.ends_with("orders.csv")));
        assert!(err.to_string().contains("orders.csv"));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_directory(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, LoaderError::Io(_)));
    }

    #[test]
    fn test_bad_identifiers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let path = write(dir.path(), "orders.csv", "CID,Order ID\nC1,O1\n");
        let err = load_csv(&path).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidIdentifier(ref s) if s == "Order ID"));

        let path = write(dir.path(), "2023-orders.csv", "CID\nC1\n");
        let err = load_csv(&path).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidIdentifier(ref s) if s == "2023-orders"));
    }

    #[test]
    fn test_load_csv_types_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "employees.csv", "EID,Name,salary\nE01,Ann,100\nE02,,\n");

        let table = load_csv(&path).unwrap();
        assert_eq!(table.name, "employees");
        assert_eq!(
            table.rows[0],
            vec![CellValue::from("E01"), CellValue::from("Ann"), CellValue::Integer(100)]
        );
        assert_eq!(
            table.rows[1],
            vec![CellValue::from("E02"), CellValue::Null, CellValue::Null]
        );
    }

    #[test]
    fn test_convert_empty_is_null() {
        assert_eq!(convert("", ColumnKind::Text), CellValue::Null);
        assert_eq!(convert("12", ColumnKind::Integer), CellValue::Integer(12));
        assert_eq!(convert("12", ColumnKind::Float), CellValue::Float(12.0));
    }
}
