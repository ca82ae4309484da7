use std::fmt;

use serde_json::Value;

use super::format::{MISSING, format_value};
use crate::types::{QueryColumn, QueryResponse};

pub const NO_COLUMNS_MESSAGE: &str = "No columns returned.";
pub const NO_ROWS_MESSAGE: &str = "Query executed successfully but no rows were returned.";

/// Query output ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultTable {
    NoColumns,
    Empty { headers: Vec<String> },
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
}

impl ResultTable {
    /// Text shown in place of the grid, if there is no grid.
    #[must_use]
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::NoColumns => Some(NO_COLUMNS_MESSAGE),
            Self::Empty { .. } => Some(NO_ROWS_MESSAGE),
            Self::Rows { .. } => None,
        }
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        match self {
            Self::NoColumns => &[],
            Self::Empty { headers } | Self::Rows { headers, .. } => headers,
        }
    }
}

impl From<&QueryResponse> for ResultTable {
    fn from(response: &QueryResponse) -> Self {
        normalize(&response.columns, &response.rows)
    }
}

/// Aligned plain-text grid, or the empty-state message.
impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (headers, rows) = match self {
            Self::Rows { headers, rows } => (headers, rows),
            other => return write!(f, "{}", other.message().unwrap_or_default()),
        };

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "{}", padded.join("  ").trim_end())
        };

        line(f, headers.as_slice())?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        line(f, rule.as_slice())?;
        for row in rows {
            line(f, row.as_slice())?;
        }
        Ok(())
    }
}

/// Header names for a result set.
///
/// Declared columns win, with `column_<n>` (1-based) standing in for missing
/// names. Without declarations the first row decides: object keys in order,
/// positional names for arrays, a single `value` column for scalars.
#[must_use]
pub fn headers(columns: &[QueryColumn], rows: &[Value]) -> Vec<String> {
    if !columns.is_empty() {
        return columns
            .iter()
            .enumerate()
            .map(|(i, column)| column.name.clone().unwrap_or_else(|| positional(i)))
            .collect();
    }

    match rows.first() {
        None => Vec::new(),
        Some(Value::Array(cells)) => (0..cells.len()).map(positional).collect(),
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(_) => vec!["value".to_string()],
    }
}

/// Turns raw columns and rows into display strings.
///
/// Every row comes out with exactly one cell per header: array rows are
/// matched by position, object rows by header name, scalars fill the first
/// cell. Cells with no counterpart render as the missing marker.
#[must_use]
pub fn normalize(columns: &[QueryColumn], rows: &[Value]) -> ResultTable {
    let headers = headers(columns, rows);
    if headers.is_empty() {
        return ResultTable::NoColumns;
    }
    if rows.is_empty() {
        return ResultTable::Empty { headers };
    }

    let rows = rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = match row {
                Value::Array(values) => values.iter().map(format_value).collect(),
                Value::Object(map) => headers
                    .iter()
                    .map(|h| map.get(h).map_or_else(|| MISSING.to_string(), format_value))
                    .collect(),
                scalar => vec![format_value(scalar)],
            };
            cells.resize(headers.len(), MISSING.to_string());
            cells
        })
        .collect();

    ResultTable::Rows { headers, rows }
}

fn positional(index: usize) -> String {
    format!("column_{}", index + 1)
}
