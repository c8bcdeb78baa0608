use super::AttendanceError;
use common::model::attendance::{ColumnCheck, ColumnKind};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// An attendance export held in memory.
///
/// Every row has exactly one cell per header: short rows are padded with
/// empty cells when read, long rows are rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceList {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    columns: Vec<ColumnCheck>,
}

impl AttendanceList {
    pub fn from_path(path: &Path) -> Result<Self, AttendanceError> {
        let text = fs::read_to_string(path)?;
        Self::from_csv_str(&text)
    }

    /// Parses CSV text. The delimiter is the most frequent of `, ; \t |` in
    /// the header line.
    pub fn from_csv_str(text: &str) -> Result<Self, AttendanceError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let header_line = text
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(AttendanceError::MissingHeader)?;
        let delimiter = detect_delimiter(header_line);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = normalize_headers(reader.headers()?)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(AttendanceError::RaggedRow {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            let mut row: Vec<String> = record.iter().map(normalize_cell).collect();
            if row.iter().all(String::is_empty) {
                continue;
            }
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        let columns = infer_column_checks(&headers, rows.first().map(Vec::as_slice));
        Ok(AttendanceList {
            headers,
            rows,
            columns,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn columns(&self) -> &[ColumnCheck] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One `header -> cell` map per row.
    pub fn to_records(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// JSON array with one object per row. Cells of `Number` columns that
    /// parse are emitted as JSON numbers, empty non-text cells as `null`.
    pub fn to_json(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, cell)| (column.title.clone(), json_cell(column.kind, cell)))
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(rows)
    }
}

fn json_cell(kind: ColumnKind, cell: &str) -> Value {
    if cell.is_empty() && kind != ColumnKind::Text {
        return Value::Null;
    }
    if kind == ColumnKind::Number {
        if let Ok(int) = cell.parse::<i64>() {
            return Value::Number(int.into());
        }
        if let Some(number) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    Value::String(cell.to_string())
}

/// Most frequent candidate delimiter in `header_line`, comma on ties.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = header_line.matches(',').count();
    for &candidate in &DELIMITERS[1..] {
        let count = header_line.matches(candidate as char).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    // strip one pair of outer single or double quotes left by the export
    let s = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_string()
}

fn normalize_headers(record: &csv::StringRecord) -> Result<Vec<String>, AttendanceError> {
    let mut seen = HashSet::new();
    let mut headers = Vec::with_capacity(record.len());
    for (index, cell) in record.iter().enumerate() {
        let title = normalize_cell(cell);
        if title.is_empty() {
            return Err(AttendanceError::EmptyHeader(index + 1));
        }
        if !seen.insert(title.clone()) {
            return Err(AttendanceError::DuplicateHeader(title));
        }
        headers.push(title);
    }
    if headers.is_empty() {
        return Err(AttendanceError::MissingHeader);
    }
    Ok(headers)
}

fn infer_column_checks(headers: &[String], first_row: Option<&[String]>) -> Vec<ColumnCheck> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, title)| {
            let first = first_row.and_then(|row| row.get(idx)).cloned();
            let kind = first.as_deref().map(infer_kind).unwrap_or(ColumnKind::Text);
            ColumnCheck {
                title: title.clone(),
                kind,
                first_row: first,
            }
        })
        .collect()
}

fn infer_kind(value: &str) -> ColumnKind {
    if value.contains('@') && value.contains('.') {
        ColumnKind::Email
    } else if value.chars().any(|ch| CURRENCY_SYMBOLS.contains(&ch)) {
        ColumnKind::Currency
    } else if !value.is_empty() && value.parse::<f64>().is_ok() {
        ColumnKind::Number
    } else {
        ColumnKind::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EXPORT: &str = "\
Timestamp,Full Name,Email Address,Classes Attended,Fee
2025-01-06 19:20,Eleni Papadopoulos,eleni@example.org,12,$15
2025-01-06 19:22,\"Nikos, Jr.\",nikos@example.org,3,
";

    #[test]
    fn reads_headers_rows_and_kinds() {
        let list = AttendanceList::from_csv_str(EXPORT).unwrap();

        assert_eq!(
            list.headers(),
            ["Timestamp", "Full Name", "Email Address", "Classes Attended", "Fee"]
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list.rows()[1][1], "Nikos, Jr.");

        let kinds: Vec<ColumnKind> = list.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            [
                ColumnKind::Text,
                ColumnKind::Text,
                ColumnKind::Email,
                ColumnKind::Number,
                ColumnKind::Currency
            ]
        );
        assert_eq!(list.columns()[3].first_row.as_deref(), Some("12"));
    }

    #[test]
    fn json_keeps_numbers_numeric() {
        let list = AttendanceList::from_csv_str(EXPORT).unwrap();

        assert_eq!(
            list.to_json(),
            json!([
                {
                    "Timestamp": "2025-01-06 19:20",
                    "Full Name": "Eleni Papadopoulos",
                    "Email Address": "eleni@example.org",
                    "Classes Attended": 12,
                    "Fee": "$15"
                },
                {
                    "Timestamp": "2025-01-06 19:22",
                    "Full Name": "Nikos, Jr.",
                    "Email Address": "nikos@example.org",
                    "Classes Attended": 3,
                    "Fee": null
                }
            ])
        );
    }

    #[test]
    fn records_map_headers_to_cells() {
        let list = AttendanceList::from_csv_str(EXPORT).unwrap();
        let records = list.to_records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Full Name"], "Eleni Papadopoulos");
        assert_eq!(records[1]["Fee"], "");
    }

    #[test]
    fn detects_semicolon_and_tab_delimiters() {
        assert_eq!(detect_delimiter("name;email;present"), b';');
        assert_eq!(detect_delimiter("name\temail\tpresent"), b'\t');
        assert_eq!(detect_delimiter("name"), b',');

        let list = AttendanceList::from_csv_str("name;present\nEleni;yes\n").unwrap();
        assert_eq!(list.rows(), [vec!["Eleni".to_string(), "yes".to_string()]]);
    }

    #[test]
    fn short_rows_are_padded_and_blank_rows_skipped() {
        let list = AttendanceList::from_csv_str("name,present,notes\nEleni,yes\n,,\n").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.rows()[0], ["Eleni", "yes", ""]);
    }

    #[test]
    fn long_rows_are_rejected() {
        let err = AttendanceList::from_csv_str("name,present\nEleni,yes,extra\n").unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::RaggedRow {
                line: 2,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn header_problems_are_reported() {
        assert!(matches!(
            AttendanceList::from_csv_str(""),
            Err(AttendanceError::MissingHeader)
        ));
        assert!(matches!(
            AttendanceList::from_csv_str("name,,present\n"),
            Err(AttendanceError::EmptyHeader(2))
        ));
        assert!(matches!(
            AttendanceList::from_csv_str("name,name\n"),
            Err(AttendanceError::DuplicateHeader(title)) if title == "name"
        ));
    }

    #[test]
    fn cells_are_normalized() {
        assert_eq!(normalize_cell("  'Eleni'  "), "Eleni");
        assert_eq!(normalize_cell("Agia\u{00A0}Sofia "), "Agia Sofia");
    }
}
