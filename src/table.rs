//! Plain-text table rendering for previews and validation reports.

use std::borrow::Cow;

use itertools::Itertools;

use crate::{frame::Table, validate::ValidationReport};

const COLUMN_GAP: &str = "  ";
const MAX_CELL_WIDTH: usize = 48;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| cell_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).clamp(3, MAX_CELL_WIDTH);
    }

    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    std::iter::once(format_row(headers, &widths))
        .chain(std::iter::once(format_row(&separator, &widths)))
        .chain(rows.iter().map(|row| format_row(row, &widths)))
        .map(|line| line + "\n")
        .collect()
}

/// Renders the first `limit` rows of a table.
pub fn render_frame(table: &Table, limit: usize) -> String {
    let headers = table
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    render_table(&headers, &table.display_rows(limit))
}

pub fn render_report(report: &ValidationReport) -> String {
    let (headers, rows) = report.to_rows();
    render_table(&headers, &rows)
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let cell = fit_cell(&sanitize_cell(value), *width);
            let padding = width.saturating_sub(cell_width(&cell));
            format!("{cell}{}", " ".repeat(padding))
        })
        .join(COLUMN_GAP)
        .trim_end()
        .to_string()
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}

fn fit_cell(value: &str, width: usize) -> String {
    if cell_width(value) <= width {
        return value.to_string();
    }
    let mut truncated = value.chars().take(width.saturating_sub(1)).collect::<String>();
    truncated.push('…');
    truncated
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::Value,
        frame::{Column, Table},
    };

    #[test]
    fn render_table_aligns_columns() {
        let headers = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            vec!["1".to_string(), "Alice".to_string()],
            vec!["2".to_string(), "Bob".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines, vec!["id   name", "---  -----", "1    Alice", "2    Bob"]);
    }

    #[test]
    fn render_table_flattens_control_characters_and_truncates() {
        let headers = vec!["review".to_string()];
        let long = "x".repeat(MAX_CELL_WIDTH + 10);
        let rows = vec![vec!["line1\nline2".to_string()], vec![long]];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[2], "line1 line2");
        assert_eq!(lines[3].chars().count(), MAX_CELL_WIDTH);
        assert!(lines[3].ends_with('…'));
    }

    #[test]
    fn render_frame_limits_rows_and_blanks_nulls() {
        let table = Table::new(vec![
            Column::new("id", vec![Some(Value::Integer(1)), Some(Value::Integer(2))]),
            Column::new("note", vec![None, Some(Value::String("ok".to_string()))]),
        ])
        .unwrap();
        let rendered = render_frame(&table, 1);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines, vec!["id   note", "---  ----", "1"]);
    }
}
