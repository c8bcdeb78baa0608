use serde::{Deserialize, Serialize};

/// The kind of value a column of an attendance export holds, guessed from
/// its first data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Number,
    Currency,
    Email,
}

/// Inferred schema of a single attendance column.
///
/// A `Vec<ColumnCheck>` describes the whole export; it decides how cells are
/// emitted when the table is converted to JSON (numbers stay numbers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnCheck {
    /// Normalized header title.
    pub title: String,
    pub kind: ColumnKind,
    /// Value of the first data row, if the export has one.
    pub first_row: Option<String>,
}
