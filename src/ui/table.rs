//! Plain-text table for query results.

use crate::domain::{QueryView, Record};

const HEADERS: [&str; 9] = [
    "value",
    "price",
    "expected_price",
    "ram",
    "is_ecc",
    "ssd",
    "hdd",
    "cpu",
    "cpu_score",
];

/// Columns left-aligned; everything else is numeric and right-aligned.
const TEXT_COLUMNS: [&str; 2] = ["cpu", "description"];

#[derive(Clone, Copy, Debug, Default)]
pub struct TableOptions {
    pub descriptions: bool,
    /// Leading index column, like a dataframe print.
    pub index: bool,
}

pub fn render(view: &QueryView, options: TableOptions) -> String {
    let mut headers: Vec<&str> = Vec::new();
    if options.index {
        headers.push("");
    }
    headers.extend(HEADERS);
    if options.descriptions {
        headers.push("description");
    }

    let rows: Vec<Vec<String>> = view
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mut cells = Vec::with_capacity(headers.len());
            if options.index {
                cells.push(index.to_string());
            }
            cells.extend(record_cells(record));
            if options.descriptions {
                cells.push(record.description.clone());
            }
            cells
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            rows.iter()
                .map(|row| row[col].chars().count())
                .fold(header.chars().count(), usize::max)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, headers.iter().map(|h| h.to_string()), &headers, &widths);
    let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    out.push_str(&"=".repeat(total));
    out.push('\n');
    for row in rows {
        push_line(&mut out, row.into_iter(), &headers, &widths);
    }
    if view.is_empty() {
        out.push_str("(no matching listings)\n");
    }
    out
}

fn push_line(
    out: &mut String,
    cells: impl Iterator<Item = String>,
    headers: &[&str],
    widths: &[usize],
) {
    let line: Vec<String> = cells
        .zip(headers.iter().zip(widths))
        .map(|(cell, (header, &width))| {
            if TEXT_COLUMNS.contains(header) {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn record_cells(record: &Record) -> Vec<String> {
    vec![
        format_value(record),
        format!("{:.2}", record.price),
        format!("{:.2}", record.expected_price),
        record.ram_gb.to_string(),
        record.is_ecc.to_string(),
        format_gb(record.ssd_gb),
        format_gb(record.hdd_gb),
        record.cpu_id.clone(),
        format!("{:.0}", record.cpu_benchmark),
    ]
}

fn format_value(record: &Record) -> String {
    if !record.scored || !record.value.is_finite() {
        "-".to_string()
    } else {
        format!("{:.3}", record.value)
    }
}

fn format_gb(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, value: f64, scored: bool) -> Record {
        Record {
            id,
            value,
            price: 40.0,
            expected_price: value * 40.0,
            ram_gb: 64,
            is_ecc: 1,
            ssd_gb: 960.0,
            hdd_gb: 0.0,
            cpu_id: "AMD Ryzen 7 3700X".into(),
            cpu_benchmark: 24000.0,
            scored,
            description: "2x SSD U.2 NVMe 960 GB".into(),
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let view = QueryView::new(vec![record(1, 1.25, true), record(2, 0.5, false)]);
        let text = render(&view, TableOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("value"));
        assert!(lines[0].ends_with("cpu_score"));
        assert!(lines[2].contains("1.250"));
        assert!(lines[2].contains("AMD Ryzen 7 3700X"));
        assert!(lines[3].trim_start().starts_with('-'));
    }

    #[test]
    fn optional_columns() {
        let view = QueryView::new(vec![record(1, 1.0, true)]);
        let text = render(
            &view,
            TableOptions {
                descriptions: true,
                index: true,
            },
        );
        assert!(text.lines().next().unwrap().ends_with("description"));
        assert!(text.contains("2x SSD U.2 NVMe 960 GB"));
        assert!(text.lines().nth(2).unwrap().starts_with('0'));
    }

    #[test]
    fn empty_view_says_so() {
        let text = render(&QueryView::default(), TableOptions::default());
        assert!(text.ends_with("(no matching listings)\n"));
    }
}
