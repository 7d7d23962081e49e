//! XLSX serialization of report sheets
//!
//! Produces a single-worksheet workbook:
//!
//! ```text
//! Sheet: Relatório de desempenho
//! | Placa   | Motorista  | Distância percorrida (km) | Horas de uso |
//! |---------|------------|---------------------------|--------------|
//! | AB123CD | Ana Souza  | 1520.4                    | 41:10:05     |
//! | EF456GH | --         | 0                         | 00:00:00     |
//! ```
//!
//! The header row is bold white on blue with a thin border; every cell is
//! centered and every row shares the grid's row height. Numeric values are
//! written as numbers so they stay usable in formulas.

use fleetreport_core::{ReportError, Result, SheetGrid, SheetWriter, Value};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

/// MIME type of the produced workbook
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Excel limit on worksheet name length
const MAX_SHEET_NAME: usize = 31;

/// XLSX sheet writer
#[derive(Clone, Debug)]
pub struct XlsxSheetWriter {
    /// Header background color (RGB)
    pub header_color: u32,
    /// Header font color (RGB)
    pub header_font_color: u32,
}

impl Default for XlsxSheetWriter {
    fn default() -> Self {
        Self {
            header_color: 0x115EDB,
            header_font_color: 0xFFFFFF,
        }
    }
}

impl XlsxSheetWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set header background color
    pub fn header_color(mut self, rgb: u32) -> Self {
        self.header_color = rgb;
        self
    }

    /// Generate workbook bytes
    pub fn render_to_bytes(&self, grid: &SheetGrid) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let formats = self.create_formats();

        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&grid.title)).map_err(render_error)?;

        self.write_header(sheet, grid, &formats)?;
        self.write_rows(sheet, grid, &formats)?;

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| ReportError::Render(format!("Failed to create Excel: {e}")))?;
        debug!(rows = grid.rows.len(), bytes = buffer.len(), "workbook saved");

        Ok(buffer)
    }

    fn create_formats(&self) -> SheetFormats {
        let header = Format::new()
            .set_bold()
            .set_font_color(self.header_font_color)
            .set_background_color(self.header_color)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(0x000000);

        let cell = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        SheetFormats { header, cell }
    }

    fn write_header(&self, sheet: &mut Worksheet, grid: &SheetGrid, formats: &SheetFormats) -> Result<()> {
        for (col, (label, width)) in grid.header.iter().zip(&grid.widths).enumerate() {
            let col = column_index(col)?;
            sheet.set_column_width(col, *width).map_err(render_error)?;
            sheet
                .write_string_with_format(0, col, label, &formats.header)
                .map_err(render_error)?;
        }
        sheet.set_row_height(0, grid.row_height).map_err(render_error)?;
        Ok(())
    }

    fn write_rows(&self, sheet: &mut Worksheet, grid: &SheetGrid, formats: &SheetFormats) -> Result<()> {
        for (index, cells) in grid.rows.iter().enumerate() {
            let row = u32::try_from(index + 1)
                .map_err(|_| ReportError::Render(format!("Row {index} exceeds the sheet limit")))?;
            sheet.set_row_height(row, grid.row_height).map_err(render_error)?;

            for (col, value) in cells.iter().enumerate() {
                let col = column_index(col)?;
                let written = match value {
                    Value::Integer(i) => sheet.write_number_with_format(row, col, *i as f64, &formats.cell),
                    Value::Decimal(d) => sheet.write_number_with_format(row, col, *d, &formats.cell),
                    Value::Text(s) => sheet.write_string_with_format(row, col, s, &formats.cell),
                };
                written.map_err(render_error)?;
            }
        }
        Ok(())
    }
}

impl SheetWriter for XlsxSheetWriter {
    fn content_type(&self) -> &'static str {
        XLSX_CONTENT_TYPE
    }

    fn write(&self, grid: &SheetGrid) -> Result<Vec<u8>> {
        if grid.header.is_empty() {
            return Err(ReportError::Render("No columns to render".into()));
        }
        self.render_to_bytes(grid)
    }
}

/// Reusable cell formats
struct SheetFormats {
    header: Format,
    cell: Format,
}

fn render_error(e: rust_xlsxwriter::XlsxError) -> ReportError {
    ReportError::Render(e.to_string())
}

fn column_index(col: usize) -> Result<u16> {
    u16::try_from(col).map_err(|_| ReportError::Render(format!("Column {col} exceeds the sheet limit")))
}

/// Worksheet-safe version of a title: forbidden characters replaced,
/// surrounding apostrophes dropped, at most 31 characters
pub fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let trimmed: String = cleaned
        .trim_matches('\'')
        .trim()
        .chars()
        .take(MAX_SHEET_NAME)
        .collect();
    let trimmed = trimmed.trim_end_matches('\'').to_string();

    if trimmed.is_empty() {
        "Sheet1".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> SheetGrid {
        SheetGrid {
            title: "Performance report".into(),
            header: vec!["Plate".into(), "Distance".into(), "Usage".into()],
            widths: vec![15.0, 20.0, 20.0],
            rows: vec![
                vec![Value::from("AB123CD"), Value::from(1520.4), Value::from("41:10:05")],
                vec![Value::from("EF456GH"), Value::from(0), Value::from("--")],
            ],
            row_height: 24.0,
        }
    }

    #[test]
    fn writer_defaults() {
        let writer = XlsxSheetWriter::new();
        assert_eq!(writer.header_color, 0x115EDB);
        assert_eq!(writer.content_type(), XLSX_CONTENT_TYPE);
    }

    #[test]
    fn produces_valid_output() {
        let bytes = XlsxSheetWriter::new().write(&grid()).unwrap();
        // XLSX files start with PK (ZIP header)
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn header_only_sheet_is_valid() {
        let mut grid = grid();
        grid.rows.clear();
        let bytes = XlsxSheetWriter::new().write(&grid).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn no_columns_fails() {
        let grid = SheetGrid {
            title: "Empty".into(),
            header: vec![],
            widths: vec![],
            rows: vec![],
            row_height: 24.0,
        };
        assert!(XlsxSheetWriter::new().write(&grid).is_err());
    }

    #[test]
    fn custom_header_color() {
        let writer = XlsxSheetWriter::new().header_color(0x4472C4);
        assert_eq!(writer.header_color, 0x4472C4);
        assert!(writer.write(&grid()).is_ok());
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("Relatório de desempenho"), "Relatório de desempenho");
        assert_eq!(sheet_name("Q1: fleet [north]"), "Q1_ fleet _north_");
        assert_eq!(sheet_name("'quoted'"), "quoted");
        assert_eq!(sheet_name(""), "Sheet1");
        assert_eq!(
            sheet_name("Reporte de desempeño de la flota completa").chars().count(),
            31
        );
    }
}
