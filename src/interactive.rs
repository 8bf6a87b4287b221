/// Line-driven control of a table view
///
/// Each input line maps to one `ViewCommand`; the view is re-rendered after
/// every command that changes it.
use crate::console_format::TableWriter;
use crate::save::FileSaver;
use crate::types::{Dataset, SortOrder};
use crate::view::TableView;
use log::trace;
use std::io::{self, BufRead, Write};

pub const HELP: &str = "\
Commands:
  search <term>    filter rows (no term clears the filter)
  sort <column>    sort by a column; again to flip the order
  order asc|desc   set the order of the current sort column
  size <n>         rows per page
  page <n>         go to a page
  next, prev       move one page
  export           save the filtered, sorted rows as CSV
  reload           load the rows again, keeping the view settings
  help             show this text
  quit             leave";

#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    Search(String),
    Sort(String),
    Order(SortOrder),
    Size(usize),
    Page(usize),
    Next,
    Prev,
    Export,
    Reload,
    Help,
    Quit,
}

/// Map one input line to a command; blank lines are `None`
pub fn parse_command(line: &str) -> Result<Option<ViewCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "search" | "/" => ViewCommand::Search(rest.to_string()),
        "sort" => {
            if rest.is_empty() {
                return Err("sort needs a column name".to_string());
            }
            ViewCommand::Sort(rest.to_string())
        }
        "order" => ViewCommand::Order(rest.parse()?),
        "size" => ViewCommand::Size(parse_count(rest, "size")?),
        "page" => ViewCommand::Page(parse_count(rest, "page")?),
        "next" | "n" => ViewCommand::Next,
        "prev" | "p" => ViewCommand::Prev,
        "export" => ViewCommand::Export,
        "reload" => ViewCommand::Reload,
        "help" | "?" => ViewCommand::Help,
        "quit" | "exit" | "q" => ViewCommand::Quit,
        other => return Err(format!("Unknown command '{}' (try 'help')", other)),
    };
    trace!("Mapped: {:?} => {:?}", line, command);
    Ok(Some(command))
}

fn parse_count(arg: &str, what: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{} needs a positive number, got '{}'", what, arg)),
    }
}

/// Reloads the dataset a view was opened on
pub type Reloader<'a> = &'a dyn Fn() -> Result<Dataset, String>;

/// Apply a command to the view; returns a message to show, if any
pub fn apply_command(
    view: &mut TableView,
    command: ViewCommand,
    saver: &dyn FileSaver,
    reload: Reloader<'_>,
) -> Result<Option<String>, String> {
    match command {
        ViewCommand::Search(term) => view.set_search(&term),
        ViewCommand::Sort(column) => {
            let idx = view.dataset().column_index(&column).ok_or_else(|| format!("Unknown column '{}'", column))?;
            let name = view.dataset().columns()[idx].clone();
            view.toggle_sort(&name);
        }
        ViewCommand::Order(order) => {
            let column = view
                .preferences()
                .sort_column
                .clone()
                .ok_or_else(|| "No sort column yet; use 'sort <column>' first".to_string())?;
            view.set_sort(&column, order);
        }
        ViewCommand::Size(n) => view.set_items_per_page(n)?,
        ViewCommand::Page(n) => view.go_to_page(n),
        ViewCommand::Next => view.next_page(),
        ViewCommand::Prev => view.prev_page(),
        ViewCommand::Export => {
            let path = view.download_csv(saver).map_err(|e| format!("Export failed: {}", e))?;
            return Ok(Some(format!("Exported to {}", path.display())));
        }
        ViewCommand::Reload => {
            let dataset = reload()?;
            let message = format!("Reloaded {} rows", dataset.len());
            view.replace_dataset(dataset);
            return Ok(Some(message));
        }
        ViewCommand::Help => return Ok(Some(HELP.to_string())),
        ViewCommand::Quit => {}
    }
    Ok(None)
}

/// Read commands from `input` until it ends or the user quits
pub fn run_session<R: BufRead, W: Write>(
    view: &mut TableView,
    input: R,
    output: &mut W,
    width: usize,
    saver: &dyn FileSaver,
    reload: Reloader<'_>,
) -> io::Result<()> {
    writeln!(output, "Type 'help' for commands.")?;
    for line in input.lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Some(ViewCommand::Quit)) => break,
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(output, "error: {}", e)?;
                continue;
            }
        };

        let rerender = !matches!(command, ViewCommand::Help | ViewCommand::Export);
        match apply_command(view, command, saver, reload) {
            Ok(Some(message)) => writeln!(output, "{}", message)?,
            Ok(None) => {}
            Err(e) => {
                writeln!(output, "error: {}", e)?;
                continue;
            }
        }
        if rerender {
            TableWriter::with_width(&mut *output, false, width).write_page(&view.visible_page())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::PreferencePublisher;
    use crate::save::capture::CaptureSaver;
    use crate::types::{CellValue, Dataset};

    fn no_reload() -> Result<Dataset, String> {
        Err("source is gone".to_string())
    }

    fn plant_view() -> TableView {
        let columns = vec!["Equipment Name".to_string(), "Type".to_string(), "Flowrate".to_string()];
        let rows = vec![
            vec![CellValue::from("Pump-1"), CellValue::from("Pump"), CellValue::from("120")],
            vec![CellValue::from("Valve-1"), CellValue::from("Valve"), CellValue::from("60")],
            vec![CellValue::from("Pump-2"), CellValue::from("Pump"), CellValue::from("95")],
        ];
        TableView::new(Dataset::from_rows("plant.csv", columns, rows), None, PreferencePublisher::disabled())
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  ").unwrap(), None);
        assert_eq!(parse_command("search pump 1").unwrap(), Some(ViewCommand::Search("pump 1".to_string())));
        assert_eq!(parse_command("search").unwrap(), Some(ViewCommand::Search(String::new())));
        assert_eq!(parse_command("SORT Flowrate").unwrap(), Some(ViewCommand::Sort("Flowrate".to_string())));
        assert_eq!(parse_command("order desc").unwrap(), Some(ViewCommand::Order(SortOrder::Desc)));
        assert_eq!(parse_command("size 25").unwrap(), Some(ViewCommand::Size(25)));
        assert_eq!(parse_command("q").unwrap(), Some(ViewCommand::Quit));
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(parse_command("size 0").is_err());
        assert!(parse_command("page two").is_err());
        assert!(parse_command("sort").is_err());
        assert!(parse_command("order up").is_err());
        assert!(parse_command("frobnicate").unwrap_err().contains("help"));
    }

    #[test]
    fn test_apply_sort_uses_canonical_column_name() {
        let mut view = plant_view();
        let saver = CaptureSaver::default();
        apply_command(&mut view, ViewCommand::Sort("flowrate".to_string()), &saver, &no_reload).unwrap();
        assert_eq!(view.preferences().sort_column.as_deref(), Some("Flowrate"));

        let err = apply_command(&mut view, ViewCommand::Sort("pressure".to_string()), &saver, &no_reload).unwrap_err();
        assert!(err.contains("Unknown column"));
    }

    #[test]
    fn test_order_needs_a_sort_column() {
        let mut view = plant_view();
        let saver = CaptureSaver::default();
        assert!(apply_command(&mut view, ViewCommand::Order(SortOrder::Desc), &saver, &no_reload).is_err());

        apply_command(&mut view, ViewCommand::Sort("Type".to_string()), &saver, &no_reload).unwrap();
        apply_command(&mut view, ViewCommand::Order(SortOrder::Desc), &saver, &no_reload).unwrap();
        assert_eq!(view.preferences().sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_run_session_renders_and_exports() {
        let mut view = plant_view();
        let saver = CaptureSaver::default();
        let input = "search pump\nsort flowrate\nbogus\nexport\nquit\nsearch valve\n";
        let mut out = Vec::new();
        run_session(&mut view, input.as_bytes(), &mut out, 100, &saver, &no_reload).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Showing 2 of 2 records (filtered from 3)"));
        assert!(text.contains("Flowrate ↑"));
        assert!(text.contains("error: Unknown command 'bogus'"));
        assert!(text.contains("Exported to plant_export.csv"));

        // input after quit is ignored
        assert_eq!(view.preferences().search_term, "pump");

        let saved = saver.saved.lock().unwrap();
        let csv = String::from_utf8(saved[0].0.clone()).unwrap();
        assert_eq!(
            csv,
            "Equipment Name,Type,Flowrate\n\"Pump-2\",\"Pump\",\"95\"\n\"Pump-1\",\"Pump\",\"120\""
        );
    }

    #[test]
    fn test_reload_keeps_settings() {
        let mut view = plant_view();
        let saver = CaptureSaver::default();
        apply_command(&mut view, ViewCommand::Sort("Flowrate".to_string()), &saver, &no_reload).unwrap();

        let err = apply_command(&mut view, ViewCommand::Reload, &saver, &no_reload).unwrap_err();
        assert_eq!(err, "source is gone");
        assert_eq!(view.dataset().len(), 3);

        let smaller = || -> Result<Dataset, String> {
            let columns = vec!["Equipment Name".to_string(), "Flowrate".to_string()];
            let rows = vec![
                vec![CellValue::from("HX-1"), CellValue::from("300")],
                vec![CellValue::from("HX-2"), CellValue::from("30")],
            ];
            Ok(Dataset::from_rows("plant.csv", columns, rows))
        };
        let message = apply_command(&mut view, ViewCommand::Reload, &saver, &smaller).unwrap();
        assert_eq!(message.as_deref(), Some("Reloaded 2 rows"));
        let page = view.visible_page();
        assert_eq!(page.rows[0].get(0).unwrap().to_string(), "HX-2");
    }
}
