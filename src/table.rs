use std::fmt::Write as _;

/// Cells wider than this are cut and marked with an ellipsis.
pub const MAX_CELL_WIDTH: usize = 40;

/// Renders rows as an aligned plain-text table with a dashed rule under the
/// header. Columns that hold only numbers are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cells = rows
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|idx| clip(row.get(idx).map(String::as_str).unwrap_or("")))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    let header_cells = headers.iter().map(|h| clip(h)).collect::<Vec<_>>();

    let widths = (0..headers.len())
        .map(|idx| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(header_cells[idx].chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect::<Vec<_>>();
    let numeric = (0..headers.len())
        .map(|idx| {
            let mut values = cells.iter().map(|row| row[idx].as_str()).filter(|v| !v.is_empty());
            let mut any = false;
            let all = values.all(|v| {
                any = true;
                is_numeric(v)
            });
            any && all
        })
        .collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", join_line(&header_cells, &widths, &vec![false; widths.len()]));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", join_line(&rule, &widths, &numeric));
    for row in &cells {
        let _ = writeln!(output, "{}", join_line(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn join_line(cells: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .zip(right_align)
        .map(|((cell, width), right)| {
            if *right {
                format!("{cell:>w$}", w = *width)
            } else {
                format!("{cell:<w$}", w = *width)
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn clip(value: &str) -> String {
    let flattened = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect::<String>();
    if flattened.chars().count() <= MAX_CELL_WIDTH {
        flattened
    } else {
        let mut clipped = flattened.chars().take(MAX_CELL_WIDTH - 1).collect::<String>();
        clipped.push('…');
        clipped
    }
}

fn is_numeric(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}
