//! Sheet layout
//!
//! Turns the enriched scope dataset into an in-memory grid: one header
//! row plus one row per scope, one column per descriptor, in declaration
//! order. Serialization to a file format is left to a [`crate::SheetWriter`].
//!
//! ## Cell fallback rules
//!
//! | column kind | field present | field absent |
//! |-------------|---------------|--------------|
//! | simple | value, formatted if a formatter is declared | `defaultValue`, else `--` |
//! | template | placeholder replaced by the value | placeholder left as literal text |

use crate::fields::FieldRef;
use crate::{ColumnDescriptor, FormatterRegistry, Messages, Result, ScopeDataSet, ScopeRecord, Value};

/// Width used when a column declares none
pub const DEFAULT_COLUMN_WIDTH: f64 = 20.0;

/// Height of every row, header included, in points
pub const ROW_HEIGHT: f64 = 24.0;

/// Cell text for an absent simple field without a default
pub const MISSING_VALUE: &str = "--";

/// Rendered report sheet
#[derive(Clone, Debug, PartialEq)]
pub struct SheetGrid {
    pub title: String,
    pub header: Vec<String>,
    pub widths: Vec<f64>,
    pub rows: Vec<Vec<Value>>,
    pub row_height: f64,
}

impl SheetGrid {
    pub fn column_count(&self) -> usize {
        self.header.len()
    }
}

/// Lays out a scope dataset according to column descriptors
pub struct SheetRenderer<'a> {
    messages: &'a Messages,
    formatters: &'a FormatterRegistry,
}

impl<'a> SheetRenderer<'a> {
    pub fn new(messages: &'a Messages, formatters: &'a FormatterRegistry) -> Self {
        Self {
            messages,
            formatters,
        }
    }

    pub fn render(&self, columns: &[ColumnDescriptor], data: &ScopeDataSet) -> Result<SheetGrid> {
        let fields: Vec<FieldRef> = columns.iter().map(ColumnDescriptor::field_ref).collect();

        let rows = data
            .iter()
            .map(|(_, record)| {
                columns
                    .iter()
                    .zip(&fields)
                    .map(|(column, field)| self.cell(column, field, record))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SheetGrid {
            title: self.messages.report_title().to_string(),
            header: columns.iter().map(|c| self.header_label(c)).collect(),
            widths: columns
                .iter()
                .map(|c| c.width.unwrap_or(DEFAULT_COLUMN_WIDTH))
                .collect(),
            rows,
            row_height: ROW_HEIGHT,
        })
    }

    /// Explicit label, else the localized name of the field
    pub fn header_label(&self, column: &ColumnDescriptor) -> String {
        column
            .label
            .clone()
            .unwrap_or_else(|| self.messages.column_label(&column.data_field))
    }

    fn cell(&self, column: &ColumnDescriptor, field: &FieldRef, record: &ScopeRecord) -> Result<Value> {
        match field {
            FieldRef::Template { .. } => Ok(Value::Text(field.substitute(record).unwrap_or_default())),
            FieldRef::Simple(id) => match (record.get(id), column.formatter.as_deref()) {
                (Some(value), Some(formatter)) => {
                    self.formatters.apply(formatter, value).map(Value::Text)
                }
                (Some(value), None) => Ok(value.clone()),
                (None, _) => Ok(column
                    .default_value
                    .clone()
                    .unwrap_or_else(|| Value::from(MISSING_VALUE))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReportError;
    use pretty_assertions::assert_eq;

    fn render(columns: &[ColumnDescriptor], data: &ScopeDataSet) -> Result<SheetGrid> {
        let messages = Messages::for_language("en");
        let formatters = FormatterRegistry::new();
        SheetRenderer::new(&messages, &formatters).render(columns, data)
    }

    fn dataset() -> ScopeDataSet {
        [
            (
                1,
                ScopeRecord::new()
                    .with("domain", "D1")
                    .with("name", "Truck")
                    .with("travelDistance", 42)
                    .with("travelTime", 3665),
            ),
            (2, ScopeRecord::new().with("domain", "D2")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn rows_follow_dataset_and_column_order() {
        let columns = vec![
            ColumnDescriptor::new("travelDistance").default_value("n/a"),
            ColumnDescriptor::new("domain"),
        ];
        let grid = render(&columns, &dataset()).unwrap();

        assert_eq!(
            grid.rows,
            vec![
                vec![Value::from(42), Value::from("D1")],
                vec![Value::from("n/a"), Value::from("D2")],
            ]
        );
    }

    #[test]
    fn missing_simple_field_without_default_is_dash() {
        let grid = render(&[ColumnDescriptor::new("name")], &dataset()).unwrap();
        assert_eq!(grid.rows[1], vec![Value::from("--")]);
    }

    #[test]
    fn template_keeps_unresolved_placeholders() {
        let columns = vec![ColumnDescriptor::new("{domain} {name}").default_value("ignored")];
        let grid = render(&columns, &dataset()).unwrap();

        assert_eq!(grid.rows[0], vec![Value::from("D1 Truck")]);
        assert_eq!(grid.rows[1], vec![Value::from("D2 {name}")]);
    }

    #[test]
    fn formatter_applies_to_present_values_only() {
        let columns = vec![ColumnDescriptor::new("travelTime")
            .formatter("time")
            .default_value("00:00:00")];
        let grid = render(&columns, &dataset()).unwrap();

        assert_eq!(grid.rows[0], vec![Value::from("01:01:05")]);
        assert_eq!(grid.rows[1], vec![Value::from("00:00:00")]);
    }

    #[test]
    fn formatter_failure_aborts_rendering() {
        let columns = vec![ColumnDescriptor::new("domain").formatter("time")];
        let err = render(&columns, &dataset()).unwrap_err();
        assert!(matches!(err, ReportError::Formatter { .. }));
    }

    #[test]
    fn unregistered_formatter_aborts_rendering() {
        let columns = vec![ColumnDescriptor::new("domain").formatter("money")];
        assert!(render(&columns, &dataset()).unwrap_err().is_configuration());
    }

    #[test]
    fn header_uses_label_then_localized_name() {
        let columns = vec![
            ColumnDescriptor::new("domain").label("Plate number"),
            ColumnDescriptor::new("travelDistance"),
            ColumnDescriptor::new("fuelUsed"),
        ];
        let grid = render(&columns, &ScopeDataSet::new()).unwrap();

        assert_eq!(
            grid.header,
            vec!["Plate number", "Distance traveled (km)", "column.fuel_used"]
        );
        assert_eq!(grid.title, "Performance report");
    }

    #[test]
    fn widths_default_when_unset() {
        let columns = vec![ColumnDescriptor::new("domain").width(15.0), ColumnDescriptor::new("name")];
        let grid = render(&columns, &dataset()).unwrap();

        assert_eq!(grid.widths, vec![15.0, DEFAULT_COLUMN_WIDTH]);
        assert_eq!(grid.row_height, ROW_HEIGHT);
    }

    #[test]
    fn empty_dataset_renders_header_only() {
        let grid = render(&[ColumnDescriptor::new("domain")], &ScopeDataSet::new()).unwrap();
        assert_eq!(grid.column_count(), 1);
        assert!(grid.rows.is_empty());
    }
}
