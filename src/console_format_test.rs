/// Tests for console formatting module
///
/// These tests ensure console output formatting remains stable:
/// box layout, truncation, sort markers and the page status lines.

#[cfg(test)]
mod tests {
    use crate::console_format::*;
    use crate::prefs::PreferencePublisher;
    use crate::types::{AggregateStat, CellValue, Dataset, SortOrder};
    use crate::view::TableView;

    /// Standard width for tests to ensure reproducible output
    const TEST_CONSOLE_WIDTH: usize = 120;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut TableWriter<Vec<u8>>) -> std::io::Result<()>,
    {
        let mut writer = TableWriter::with_width(Vec::new(), false, TEST_CONSOLE_WIDTH);
        f(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn plant_view(n: usize) -> TableView {
        let columns = vec!["name".to_string(), "type".to_string(), "flow".to_string()];
        let rows = (1..=n)
            .map(|i| vec![CellValue::Text(format!("Unit-{}", i)), CellValue::from("Pump"), CellValue::Number(i as f64)])
            .collect();
        TableView::new(Dataset::from_rows("plant.csv", columns, rows), None, PreferencePublisher::disabled())
    }

    #[test]
    fn test_display_width_ascii() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width(""), 0);
        assert_eq!(display_width("test123"), 7);
    }

    #[test]
    fn test_display_width_unicode() {
        // Unicode box drawing characters
        assert_eq!(display_width("│"), 1);
        assert_eq!(display_width("─"), 1);
        // Wide characters
        assert_eq!(display_width("📦"), 2);
        assert_eq!(display_width("°C"), 2);
    }

    #[test]
    fn test_truncate_with_padding_exact_fit() {
        let result = truncate_with_padding("hello", 5);
        assert_eq!(result, "hello");
        assert_eq!(display_width(&result), 5);
    }

    #[test]
    fn test_truncate_with_padding_needs_padding() {
        let result = truncate_with_padding("hi", 5);
        assert_eq!(result, "hi   ");
    }

    #[test]
    fn test_truncate_with_padding_needs_truncation() {
        let result = truncate_with_padding("Heat Exchanger", 8);
        assert_eq!(result, "Heat ...");
        assert_eq!(display_width(&result), 8);
    }

    #[test]
    fn test_truncate_with_padding_wide_chars() {
        let result = truncate_with_padding("反応器 reactor unit", 10);
        assert_eq!(display_width(&result), 10);
        assert!(result.contains("..."));
    }

    #[test]
    fn test_fit_column_widths_keeps_natural_when_room() {
        assert_eq!(fit_column_widths(&[10, 4, 8], 120), vec![10, 4, 8]);
    }

    #[test]
    fn test_fit_column_widths_shrinks_widest_first() {
        // borders: 3 * 3 + 1 = 10, so 30 leaves 20 for content
        let widths = fit_column_widths(&[30, 4, 8], 30);
        assert_eq!(widths, vec![8, 4, 8]);
        assert_eq!(widths.iter().sum::<usize>(), 20);
    }

    #[test]
    fn test_fit_column_widths_respects_minimum() {
        let widths = fit_column_widths(&[20, 20], 10);
        assert_eq!(widths, vec![6, 6]);
    }

    #[test]
    fn test_write_page_layout() {
        let view = plant_view(3);
        let out = render(|w| w.write_page(&view.visible_page()));
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with('┌') && lines[0].ends_with('┐'));
        assert!(lines[1].contains("name") && lines[1].contains("flow"));
        assert!(lines[2].starts_with('├'));
        assert!(lines[3].contains("Unit-1"));
        assert!(lines[6].starts_with('└'));
        assert_eq!(lines[7], "Showing 3 of 3 records");
        assert_eq!(lines[8], "Page 1 of 1");

        // every box line has the same display width
        let width = display_width(lines[0]);
        for line in &lines[..7] {
            assert_eq!(display_width(line), width, "line: {}", line);
        }
    }

    #[test]
    fn test_write_page_marks_sorted_column() {
        let mut view = plant_view(3);
        view.set_sort("flow", SortOrder::Desc);
        let out = render(|w| w.write_page(&view.visible_page()));
        assert!(out.contains("flow ↓"));
        assert!(!out.contains("name ↓"));
    }

    #[test]
    fn test_write_page_empty_result() {
        let mut view = plant_view(3);
        view.set_search("valve");
        let out = render(|w| w.write_page(&view.visible_page()));
        assert!(out.contains("│ No data found"));
        assert!(out.contains("Showing 0 of 0 records (filtered from 3)"));
        assert!(!out.contains("Page "));
    }

    #[test]
    fn test_write_page_paginated_status() {
        let mut view = plant_view(25);
        view.go_to_page(3);
        let out = render(|w| w.write_page(&view.visible_page()));
        assert!(out.contains("Showing 5 of 25 records"));
        assert!(out.contains("Page 3 of 3"));
    }

    #[test]
    fn test_write_stat_cards() {
        let cards = vec![AggregateStat {
            label: "Pressure".to_string(),
            min: 1.0,
            max: 7.5,
            avg: 4.125,
            unit: "bar".to_string(),
        }];
        let out = render(|w| w.write_stat_cards(&cards));
        assert!(out.contains("Pressure (bar)"));
        assert!(out.contains("7.50"));
        assert!(out.contains("4.13"), "{}", out);
    }

    #[test]
    fn test_write_page_keeps_multiline_cells_on_one_row() {
        let columns = vec!["name".to_string(), "note".to_string()];
        let rows = vec![vec![CellValue::from("Pump-1"), CellValue::from("line one\nline two\tend")]];
        let view = TableView::new(Dataset::from_rows("plant.csv", columns, rows), None, PreferencePublisher::disabled());
        let out = render(|w| w.write_page(&view.visible_page()));

        assert!(out.contains("line one line two end"), "{}", out);
        let box_lines: Vec<&str> = out.lines().filter(|l| l.starts_with('│') || l.starts_with('┌')).collect();
        assert_eq!(box_lines.len(), 3);
        let width = display_width(box_lines[0]);
        assert!(box_lines.iter().all(|l| display_width(l) == width), "{}", out);
    }

    #[test]
    fn test_single_line() {
        assert_eq!(single_line("a\r\nb"), "a  b");
        assert_eq!(single_line("plain"), "plain");
    }

    #[test]
    fn test_write_heading_plain() {
        let out = render(|w| w.write_heading("plant.csv (3 records)"));
        assert_eq!(out, "plant.csv (3 records)\n");
    }
}
