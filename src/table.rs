use std::borrow::Cow;
use std::fmt::Write as _;

use itertools::Itertools;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![1usize; column_count];
    for line in std::iter::once(headers).chain(rows.iter().map(Vec::as_slice)) {
        for (idx, cell) in line.iter().enumerate() {
            widths[idx] = widths[idx].max(flatten_cell(cell).chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(3))).collect_vec();
    let _ = writeln!(output, "{}", format_line(&rule, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Synthetic names for header-less input: `column_1`, `column_2`, ...
pub fn generated_headers(count: usize) -> Vec<String> {
    (1..=count).map(|idx| format!("column_{idx}")).collect()
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let cell = cells.get(idx).map(|c| flatten_cell(c)).unwrap_or_default();
            format!("{cell:<width$}")
        })
        .join("  ");
    line.trim_end().to_string()
}

fn flatten_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
