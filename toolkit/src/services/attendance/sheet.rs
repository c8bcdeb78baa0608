use super::{AttendanceError, AttendanceList};
use genpdf::elements::{Break, FrameCellDecorator, Paragraph, TableLayout};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Document, SimplePageDecorator};
use log::info;
use std::path::{Path, PathBuf};

const FONT_SIZE_PT: u8 = 9;
const MARGIN_MM: f64 = 10.0;
const MIN_COLUMN_WEIGHT: usize = 4;
const MAX_COLUMN_WEIGHT: usize = 30;

/// `attendance_<session>.pdf`, with everything but ASCII alphanumerics and
/// `-` in the session name replaced by `_`.
pub fn sheet_file_name(session: &str) -> String {
    let slug: String = session
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "attendance.pdf".to_string()
    } else {
        format!("attendance_{}.pdf", slug)
    }
}

/// Renders `list` as a one-table PDF titled after `session` and writes it to
/// `out_dir`. Fonts are loaded from `fonts_dir` (Arial, then
/// LiberationSans).
pub fn write_attendance_sheet(
    list: &AttendanceList,
    session: &str,
    fonts_dir: &Path,
    out_dir: &Path,
) -> Result<PathBuf, AttendanceError> {
    let mut doc = configure_document(fonts_dir, session)?;

    doc.push(Paragraph::new(StyledString::new(
        sheet_title(session),
        Style::new().bold().with_font_size(14),
    )));
    doc.push(Paragraph::new(format!("{} attendees", list.len())));
    doc.push(Break::new(1));

    let mut table = TableLayout::new(column_weights(list));
    table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let mut header = table.row();
    for title in list.headers() {
        header.push_element(Paragraph::new(StyledString::new(
            title.as_str(),
            Style::new().bold(),
        )));
    }
    header.push()?;

    for row in list.rows() {
        let mut line = table.row();
        for cell in row {
            line.push_element(Paragraph::new(cell.as_str()));
        }
        line.push()?;
    }
    doc.push(table);

    let path = out_dir.join(sheet_file_name(session));
    doc.render_to_file(&path)?;
    info!("Attendance sheet written to {}", path.display());
    Ok(path)
}

fn sheet_title(session: &str) -> String {
    let session = session.trim();
    if session.is_empty() {
        "Odyssey Attendance".to_string()
    } else {
        format!("Odyssey Attendance: {}", session)
    }
}

fn load_font(fonts_dir: &Path) -> Result<FontFamily<FontData>, AttendanceError> {
    if let Ok(family) = genpdf::fonts::from_files(fonts_dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(fonts_dir, "LiberationSans", None).map_err(Into::into)
}

fn configure_document(fonts_dir: &Path, session: &str) -> Result<Document, AttendanceError> {
    let mut doc = Document::new(load_font(fonts_dir)?);
    doc.set_title(sheet_title(session));
    doc.set_font_size(FONT_SIZE_PT);
    doc.set_line_spacing(1.0);

    let mut decorator = SimplePageDecorator::new();
    decorator.set_margins(MARGIN_MM);
    doc.set_page_decorator(decorator);
    Ok(doc)
}

/// Relative column widths: the longest cell (header included) of each
/// column, clamped so one long free-text answer cannot squeeze the rest.
fn column_weights(list: &AttendanceList) -> Vec<usize> {
    list.headers()
        .iter()
        .enumerate()
        .map(|(idx, title)| {
            list.rows()
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(title.chars().count()))
                .max()
                .unwrap_or(MIN_COLUMN_WEIGHT)
                .clamp(MIN_COLUMN_WEIGHT, MAX_COLUMN_WEIGHT)
        })
        .collect()
}
