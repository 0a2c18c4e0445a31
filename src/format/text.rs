//! Plain-text tables for the listing commands.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Gap between table columns.
const COLUMN_GAP: &str = "  ";

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    if let Ok(columns) = std::env::var("COLUMNS") {
        if let Ok(value) = columns.trim().parse::<usize>() {
            if value > 0 {
                return value;
            }
        }
    }
    80
}

/// Truncate text to fit within `max_len` visible columns.
///
/// Handles wide characters (emojis, CJK) correctly using `unicode-width`.
#[must_use]
pub fn truncate_cell(text: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    if visible_len(text) <= max_len {
        return text.to_string();
    }

    let (target_len, ellipsis) = if max_len <= 3 {
        (max_len, "")
    } else {
        (max_len - 3, "...")
    };

    let mut w = 0;
    let mut s = String::new();
    for c in text.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if w + cw > target_len {
            break;
        }
        w += cw;
        s.push(c);
    }
    s.push_str(ellipsis);
    s
}

fn visible_len(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(visible_len(text));
    format!("{text}{}", " ".repeat(fill))
}

/// Render left-aligned columns. The last column absorbs whatever width is
/// left in `max_width` and is truncated to it.
#[must_use]
pub fn render_table(headers: &[&str], rows: &[Vec<String>], max_width: usize) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| visible_len(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(visible_len(cell));
        }
    }

    let last = widths.len().saturating_sub(1);
    let fixed: usize = widths
        .iter()
        .take(last)
        .map(|w| w + COLUMN_GAP.len())
        .sum();
    let last_width = max_width.saturating_sub(fixed).max(8);

    let render_line = |cells: Vec<&str>| -> String {
        let mut line = String::new();
        for (i, cell) in cells.into_iter().enumerate() {
            if i == last {
                line.push_str(&truncate_cell(cell, last_width));
            } else {
                line.push_str(&pad(cell, widths[i]));
                line.push_str(COLUMN_GAP);
            }
        }
        line.trim_end().to_string()
    };

    let mut output = String::new();
    output.push_str(&render_line(headers.to_vec()));
    output.push('\n');
    for row in rows {
        output.push_str(&render_line(row.iter().map(String::as_str).collect()));
        output.push('\n');
    }
    output
}
