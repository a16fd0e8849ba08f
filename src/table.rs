use std::borrow::Cow;
use std::fmt::Write as _;

use crate::data::{ColumnKind, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Renders left-aligned cells under a dashed header rule.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let alignments = vec![Align::Left; headers.len()];
    render_aligned(headers, rows, &alignments)
}

pub fn render_aligned(headers: &[String], rows: &[Vec<String>], alignments: &[Align]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let header_alignments = vec![Align::Left; column_count];
    let _ = writeln!(output, "{}", format_row(headers, &widths, &header_alignments));

    let separator_cells = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(
        output,
        "{}",
        format_row(&separator_cells, &widths, &header_alignments)
    );

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, alignments));
    }

    output
}

/// Renders up to `limit` rows of a table (0 for all), numbers right-aligned.
pub fn render_data(table: &Table, limit: usize) -> String {
    let alignments = table
        .columns()
        .iter()
        .map(|column| match column.kind {
            ColumnKind::Numeric => Align::Right,
            ColumnKind::Text | ColumnKind::Categorical => Align::Left,
        })
        .collect::<Vec<_>>();
    render_aligned(&table.headers(), &table.display_rows(limit), &alignments)
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], alignments: &[Align]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        let Some(width) = widths.get(idx).copied() else {
            break;
        };
        let sanitized = sanitize_cell(value);
        let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
        let cell = match alignments.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => format!("{sanitized}{padding}"),
            Align::Right => format!("{padding}{sanitized}"),
        };
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
