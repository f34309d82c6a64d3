use crate::app::{GRID_HEADERS, GridRow};
use crate::db::SnippetRecord;

const ELLIPSIS: char = '…';
const NEWLINE_MARK: &str = " ↵ ";
const MIN_TEXT_COLUMN: usize = 8;

/// Renders the history grid as a fixed-width text table no wider than
/// `max_width` (best effort for very narrow terminals).
pub fn render_grid(rows: &[GridRow], max_width: usize) -> String {
    if rows.is_empty() {
        return "No stored snippets yet.".to_string();
    }

    let flattened = rows
        .iter()
        .map(|row| row.cells().map(flatten_cell))
        .collect::<Vec<_>>();

    let widths = column_widths(&flattened, max_width);
    let separator = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(&GRID_HEADERS.map(str::to_string), &widths));
    lines.push(separator);
    lines.extend(flattened.iter().map(|cells| format_line(cells, &widths)));

    lines.join("\n")
}

/// Grid for stored records read straight from the store, without a
/// controller in between.
pub fn render_records(records: &[SnippetRecord], max_width: usize) -> String {
    let rows = records.iter().map(GridRow::from).collect::<Vec<_>>();
    render_grid(&rows, max_width)
}

pub fn render_output(output: &str) -> String {
    if output.is_empty() {
        return String::new();
    }

    let width = output
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(20, 100);
    let rule = "─".repeat(width);

    format!("{rule}\n{}\n{rule}", output.trim_end())
}

pub fn flatten_cell(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join(NEWLINE_MARK)
}

pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let mut truncated = value.chars().take(width - 1).collect::<String>();
    truncated.push(ELLIPSIS);
    truncated
}

// ID and timestamp keep their natural width; task and code split whatever
// is left, task getting at most a third.
fn column_widths(rows: &[[String; 4]], max_width: usize) -> [usize; 4] {
    let natural = |index: usize| {
        rows.iter()
            .map(|cells| cells[index].chars().count())
            .chain(std::iter::once(GRID_HEADERS[index].chars().count()))
            .max()
            .unwrap_or(0)
    };

    let id = natural(0);
    let timestamp = natural(3);
    let chrome = 3 * 3;
    let remaining = max_width
        .saturating_sub(id + timestamp + chrome)
        .max(MIN_TEXT_COLUMN * 2);

    let task = natural(1).min((remaining / 3).max(MIN_TEXT_COLUMN));
    let code = natural(2).min(remaining - task).max(MIN_TEXT_COLUMN.min(natural(2)));

    [id, task, code, timestamp]
}

fn format_line(cells: &[String; 4], widths: &[usize; 4]) -> String {
    cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| {
            let text = truncate(cell, *width);
            let padding = width.saturating_sub(text.chars().count());
            format!("{text}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
