//! Cell values bound into parameterized statements

/// A single typed cell, as inferred from CSV input
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell
    Null,
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Anything else, bound as text and left for the database to convert
    Text(String),
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}
