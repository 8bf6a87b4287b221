/// Console formatting module - Pure rendering concerns
///
/// This module handles all console output formatting including:
/// - Table layout and borders
/// - Color terminal output
/// - Text truncation and padding
///
/// It accepts prepared data from the view and report modules and renders it
/// to the console.
///
/// ## Output Flexibility
///
/// This module supports writing to any `std::io::Write` destination:
/// - Console (stdout/stderr) with optional colors
/// - String buffers (for tests)
/// - Files

use crate::report::{TypeAggregate, TypeShare, to_fixed};
use crate::types::{AggregateStat, DatasetInfo};
use crate::view::PageView;
use std::io::{self, Write};
use std::sync::OnceLock;
use term::color::Color;
use terminal_size::{Width, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Narrowest a data column is squeezed to
const MIN_COLUMN_WIDTH: usize = 6;

/// Writer for table output - configurable for color/plain text
pub struct TableWriter<W: Write> {
    writer: W,
    use_colors: bool,
    width: usize,
}

impl<W: Write> TableWriter<W> {
    /// Create a new table writer sized to the console
    pub fn new(writer: W, use_colors: bool) -> Self {
        Self { writer, use_colors, width: console_width() }
    }

    /// Create a table writer with an explicit total width
    pub fn with_width(writer: W, use_colors: bool, width: usize) -> Self {
        Self { writer, use_colors, width }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write formatted text, optionally with color
    fn write_colored(&mut self, text: &str, color: Color) -> io::Result<()> {
        if self.use_colors {
            if let Some(ref mut t) = term::stdout() {
                let _ = t.fg(color);
                let _ = t.write_all(text.as_bytes());
                let _ = t.reset();
                Ok(())
            } else {
                write!(self.writer, "{}", text)
            }
        } else {
            write!(self.writer, "{}", text)
        }
    }

    /// Write a newline
    fn writeln(&mut self) -> io::Result<()> {
        writeln!(self.writer)
    }

    fn write_border(&mut self, widths: &[usize], left: &str, mid: &str, right: &str) -> io::Result<()> {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        writeln!(self.writer, "{}{}{}", left, segments.join(mid), right)
    }

    fn write_cells(&mut self, cells: &[String], widths: &[usize], color: Option<Color>) -> io::Result<()> {
        let padded: Vec<String> = cells.iter().zip(widths).map(|(c, w)| truncate_with_padding(c, *w)).collect();
        let line = format!("│ {} │", padded.join(" │ "));
        match color {
            Some(color) => {
                self.write_colored(&line, color)?;
                self.writeln()
            }
            None => writeln!(self.writer, "{}", line),
        }
    }

    /// Write a boxed table with a header row
    pub fn write_table(&mut self, headers: &[String], rows: &[Vec<String>]) -> io::Result<()> {
        let headers: Vec<String> = headers.iter().map(|h| single_line(h)).collect();
        let rows: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(|c| single_line(c)).collect()).collect();
        let (headers, rows) = (headers.as_slice(), rows.as_slice());
        let widths = fit_column_widths(&natural_widths(headers, rows), self.width);
        self.write_border(&widths, "┌", "┬", "┐")?;
        self.write_cells(headers, &widths, Some(term::color::BRIGHT_CYAN))?;
        self.write_border(&widths, "├", "┼", "┤")?;
        for row in rows {
            self.write_cells(row, &widths, None)?;
        }
        self.write_border(&widths, "└", "┴", "┘")
    }

    /// Write one page of the table view with its status lines
    pub fn write_page(&mut self, page: &PageView<'_>) -> io::Result<()> {
        if page.columns.is_empty() {
            writeln!(self.writer, "No data found")?;
            return Ok(());
        }

        let headers: Vec<String> = page
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| match page.sort {
                Some((sorted, order)) if sorted == idx => format!("{} {}", single_line(name), order.arrow()),
                _ => single_line(name),
            })
            .collect();

        let rows: Vec<Vec<String>> = page
            .rows
            .iter()
            .map(|row| {
                (0..page.columns.len()).map(|i| row.get(i).map(|c| single_line(&c.to_string())).unwrap_or_default()).collect()
            })
            .collect();

        let widths = fit_column_widths(&natural_widths(&headers, &rows), self.width);
        self.write_border(&widths, "┌", "┬", "┐")?;
        self.write_cells(&headers, &widths, Some(term::color::BRIGHT_CYAN))?;
        self.write_border(&widths, "├", "┼", "┤")?;

        if rows.is_empty() {
            let inner = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
            let message = truncate_with_padding("No data found", inner);
            writeln!(self.writer, "│ {} │", message)?;
        } else {
            for row in &rows {
                self.write_cells(row, &widths, None)?;
            }
        }
        self.write_border(&widths, "└", "┴", "┘")?;

        writeln!(self.writer, "{}", format_page_status(page))
    }

    /// Write a highlighted title line
    pub fn write_heading(&mut self, text: &str) -> io::Result<()> {
        self.write_colored(text, term::color::BRIGHT_WHITE)?;
        self.writeln()
    }

    /// Write the min/max/avg card table
    pub fn write_stat_cards(&mut self, cards: &[AggregateStat]) -> io::Result<()> {
        let headers = ["Metric", "Min", "Max", "Avg"].map(String::from);
        let rows: Vec<Vec<String>> = cards
            .iter()
            .map(|c| {
                vec![
                    format!("{} ({})", c.label, c.unit),
                    to_fixed(c.min, 2),
                    to_fixed(c.max, 2),
                    to_fixed(c.avg, 2),
                ]
            })
            .collect();
        self.write_table(&headers, &rows)
    }

    /// Write per-type averages with each type's share of the rows
    pub fn write_type_summary(&mut self, aggregates: &[TypeAggregate], shares: &[TypeShare]) -> io::Result<()> {
        let total: usize = shares.iter().map(|s| s.value).sum();
        let headers =
            ["Type", "Count", "Share", "Avg Flowrate", "Avg Pressure", "Avg Temperature"].map(String::from);
        let rows: Vec<Vec<String>> = aggregates
            .iter()
            .map(|a| {
                let count = shares.iter().find(|s| s.name == a.equipment_type).map(|s| s.value).unwrap_or(a.count);
                let share = if total == 0 { 0.0 } else { count as f64 * 100.0 / total as f64 };
                vec![
                    a.equipment_type.clone(),
                    count.to_string(),
                    format!("{}%", to_fixed(share, 1)),
                    to_fixed(a.avg_flowrate, 2),
                    to_fixed(a.avg_pressure, 2),
                    to_fixed(a.avg_temperature, 2),
                ]
            })
            .collect();
        self.write_table(&headers, &rows)
    }

    /// Write the uploaded dataset list
    pub fn write_dataset_list(&mut self, datasets: &[DatasetInfo]) -> io::Result<()> {
        if datasets.is_empty() {
            return writeln!(self.writer, "No datasets uploaded yet");
        }
        let headers = ["ID", "File", "Status", "Rows", "Uploaded", "By"].map(String::from);
        let rows: Vec<Vec<String>> = datasets
            .iter()
            .map(|d| {
                vec![
                    d.id.to_string(),
                    d.file_name.clone(),
                    d.status.clone(),
                    d.row_count.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                    d.uploaded_at.clone(),
                    d.uploaded_by_username.clone(),
                ]
            })
            .collect();
        self.write_table(&headers, &rows)
    }
}

/// "Showing X of Y records" and the page indicator
pub fn format_page_status(page: &PageView<'_>) -> String {
    let mut status = format!("Showing {} of {} records", page.rows.len(), page.total_count);
    if page.total_count != page.dataset_count {
        status.push_str(&format!(" (filtered from {})", page.dataset_count));
    }
    if page.total_pages > 0 {
        status.push_str(&format!("\nPage {} of {}", page.page, page.total_pages));
    }
    status
}

//
// Table Layout and Widths
//

/// Widest display width per column over the header and all rows
pub fn natural_widths(headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }
    widths
}

/// Shrink the widest columns until the table fits in `total_width`.
///
/// Borders take `3 * columns + 1` characters. Columns never go below
/// `MIN_COLUMN_WIDTH` (or their natural width, if smaller), so a table with
/// many columns may still overflow a narrow console.
pub fn fit_column_widths(natural: &[usize], total_width: usize) -> Vec<usize> {
    let mut widths = natural.to_vec();
    let borders = 3 * widths.len() + 1;
    let available = total_width.saturating_sub(borders);

    while widths.iter().sum::<usize>() > available {
        let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|&(i, w)| (*w, std::cmp::Reverse(i))) else {
            break;
        };
        if widest <= MIN_COLUMN_WIDTH {
            break;
        }
        widths[idx] -= 1;
    }
    widths
}

/// Console width override set from the command line
static CONSOLE_WIDTH: OnceLock<usize> = OnceLock::new();

/// Fix the console width instead of asking the terminal
pub fn set_console_width(width: usize) {
    let _ = CONSOLE_WIDTH.set(width); // Ignore error if already set
}

/// Console width: the override, else the terminal's, else 120
pub fn console_width() -> usize {
    if let Some(w) = CONSOLE_WIDTH.get() {
        return *w;
    }
    if let Some((Width(w), _)) = terminal_size() {
        w as usize
    } else {
        120 // Default width
    }
}

//
// Text Formatting Utilities
//

/// Count the display width of a string, accounting for wide Unicode characters
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Put a cell on one line: control characters (line breaks, tabs) become spaces
pub fn single_line(s: &str) -> String {
    s.chars().map(|c| if c.is_control() { ' ' } else { c }).collect()
}

/// Truncate and pad string to exact width
pub fn truncate_with_padding(s: &str, width: usize) -> String {
    let display_w = display_width(s);

    if display_w > width {
        let mut result = String::new();
        let mut current_width = 0;

        // Reserve space for "..."
        let target_width = if width >= 3 { width - 3 } else { width };

        for c in s.chars() {
            let c_width = UnicodeWidthChar::width(c).unwrap_or(1);

            if current_width + c_width > target_width {
                break;
            }

            result.push(c);
            current_width += c_width;
        }

        if width >= 3 {
            result.push_str("...");
            current_width += 3;
        }

        // Pad if needed
        if current_width < width {
            result.push_str(&" ".repeat(width - current_width));
        }

        result
    } else {
        let padding = width - display_w;
        format!("{}{}", s, " ".repeat(padding))
    }
}

/// Print one page of the table view to stdout
pub fn print_page(page: &PageView<'_>) -> io::Result<()> {
    let mut writer = TableWriter::new(io::stdout().lock(), false);
    writer.write_page(page)?;
    writer.writer.flush()
}

#[cfg(test)]
#[path = "console_format_test.rs"]
mod console_format_test;
