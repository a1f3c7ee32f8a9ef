//! Plain-text rendering of a result page, used by the command-line tool.

use crate::measure::TextMetrics;
use crate::result::ResultRow;

#[derive(Default)]
pub struct TableRenderer {
    metrics: TextMetrics,
}

impl TableRenderer {
    pub fn new(metrics: TextMetrics) -> Self {
        Self { metrics }
    }

    /// Render `rows` under `columns` as a pipe table. Missing cells are blank.
    pub fn render(&self, columns: &[String], rows: &[ResultRow]) -> String {
        if columns.is_empty() {
            return "(no columns)\n".to_string();
        }

        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| row.get(col).map(ToString::to_string).unwrap_or_default())
                    .collect()
            })
            .collect();
        let widths = self.metrics.column_widths(columns, &cells);

        let mut out = String::new();
        self.render_line(&mut out, columns, &widths);
        self.render_rule(&mut out, &widths);
        for row in &cells {
            self.render_line(&mut out, row, &widths);
        }
        out
    }

    /// Footer line for a paged view, pages counted from 1.
    pub fn footer(&self, page: usize, page_count: usize, total_rows: usize) -> String {
        format!("page {}/{} ({} rows)\n", page + 1, page_count.max(1), total_rows)
    }

    fn render_line(&self, out: &mut String, cells: &[String], widths: &[usize]) {
        let pad = " ".repeat(self.metrics.padding);
        out.push('|');
        for (cell, width) in cells.iter().zip(widths) {
            out.push_str(&pad);
            out.push_str(&self.metrics.pad(&self.metrics.fit(cell), *width));
            out.push_str(&pad);
            out.push('|');
        }
        out.push('\n');
    }

    fn render_rule(&self, out: &mut String, widths: &[usize]) {
        out.push('|');
        for width in widths {
            out.push_str(&"-".repeat(width + self.metrics.padding * 2));
            out.push('|');
        }
        out.push('\n');
    }
}
