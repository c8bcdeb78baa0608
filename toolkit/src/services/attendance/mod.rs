//! Attendance exports: CSV intake and the printable sign-in sheet.
//!
//! The CSV comes from the attendance form's response spreadsheet. Its
//! delimiter is sniffed from the header line, cells are normalized and every
//! row is checked against the header width before anything is converted.

mod intake;
mod sheet;

pub use intake::{detect_delimiter, AttendanceList};
pub use sheet::{sheet_file_name, write_attendance_sheet};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("attendance export has no header row")]
    MissingHeader,
    #[error("header column {0} is empty")]
    EmptyHeader(usize),
    #[error("header '{0}' appears more than once")]
    DuplicateHeader(String),
    #[error("line {line} has {found} cells, header has {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to render attendance sheet: {0}")]
    Pdf(#[from] genpdf::error::Error),
}
