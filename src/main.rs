// Copyright 2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod api;
mod cli;
mod config;
mod console_format;
mod dataset;
mod interactive;
mod prefs;
mod report;
mod save;
mod types;
mod ui;
mod view;

use api::ApiClient;
use cli::{Command, DatasetCommand, PrefsCommand, Source, SourceArgs, ViewArgs};
use config::{AppConfig, ENV_PASSWORD, ENV_USERNAME};
use console_format::TableWriter;
use log::{debug, info, warn};
use prefs::{LocalPreferenceStore, PreferencePublisher, PreferenceStore, RemotePreferenceStore};
use save::{DirectorySaver, FileSaver};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use types::*;
use view::TableView;

fn main() {
    env_logger::init();

    // Parse CLI arguments
    let args = cli::CliArgs::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        ui::print_error(&e);
        std::process::exit(1);
    }

    // Set console width override if specified (for testing)
    if let Some(width) = args.console_width {
        console_format::set_console_width(width);
    }

    let config = match config::build_app_config(&args) {
        Ok(c) => c,
        Err(e) => {
            ui::print_error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };

    let mut app = App::new(config);
    let result = app.run(&args.command);
    app.shutdown();

    if let Err(e) = result {
        ui::print_error(&e);
        std::process::exit(1);
    }
}

/// Rows to show plus the backend statistics they were flattened from
struct Loaded {
    dataset: Dataset,
    backend_stats: Option<DatasetStatistics>,
}

impl Loaded {
    fn from_info(info: DatasetInfo) -> Result<Self, String> {
        let Some(stats) = info.statistics else {
            return Err(format!("Dataset {} has no statistics yet (status: {})", info.id, info.status));
        };
        Ok(Self { dataset: dataset::rows_from_statistics(info.file_name, &stats), backend_stats: Some(stats) })
    }

    fn snapshot(&self) -> StatsSnapshot {
        match self.backend_stats {
            Some(ref stats) => StatsSnapshot::from_backend(stats),
            None => report::compute_stats(self.dataset.rows(), self.dataset.columns()),
        }
    }

    fn total_records(&self) -> usize {
        match self.backend_stats {
            Some(ref stats) if stats.total_equipment_count > 0 => stats.total_equipment_count,
            _ => self.dataset.len(),
        }
    }
}

/// One run of the tool: resolved config plus a lazily opened backend session
struct App {
    config: AppConfig,
    client: Option<Arc<ApiClient>>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self { config, client: None }
    }

    /// The logged-in client, logging in on first use
    fn client(&mut self) -> Result<Arc<ApiClient>, String> {
        if let Some(ref client) = self.client {
            return Ok(client.clone());
        }
        let Some((username, password)) = self.config.credentials() else {
            return Err(format!(
                "Not logged in: pass --username and --password or set {} and {}",
                ENV_USERNAME, ENV_PASSWORD
            ));
        };
        let client = Arc::new(ApiClient::login(&self.config.api_url, username, password, self.config.timeout)?);
        info!("logged in to {} as {}", self.config.api_url, client.session().user().username);
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Backend preferences when credentials are configured, else the local file
    fn preference_store(&mut self) -> Result<Arc<dyn PreferenceStore>, String> {
        if !self.config.local_prefs && self.config.credentials().is_some() {
            Ok(Arc::new(RemotePreferenceStore::new(self.client()?)))
        } else {
            Ok(Arc::new(LocalPreferenceStore::new(self.config.preferences_path.clone())))
        }
    }

    fn saver(&self) -> DirectorySaver {
        DirectorySaver::new(self.config.output_dir.clone())
    }

    /// Log out if a session was opened
    fn shutdown(self) {
        let Some(client) = self.client else {
            return;
        };
        match Arc::try_unwrap(client) {
            Ok(client) => {
                if let Err(e) = client.logout() {
                    warn!("Logout failed: {}", e);
                }
            }
            Err(_) => warn!("Session still in use; skipping logout"),
        }
    }

    fn run(&mut self, command: &Command) -> Result<(), String> {
        match command {
            Command::View { source, view, interactive } => self.run_view(source, view, *interactive),
            Command::Export { source, view } => self.run_export(source, view),
            Command::Report { source, print } => self.run_report(source, *print),
            Command::Stats { source } => self.run_stats(source),
            // checked locally before logging in
            Command::Datasets { action: DatasetCommand::Upload { file } } => self.run_upload(file),
            Command::Datasets { action } => self.run_datasets(action),
            Command::Prefs { action } => self.run_prefs(action),
            Command::Whoami => self.run_whoami(),
        }
    }

    fn run_whoami(&mut self) -> Result<(), String> {
        let profile = self.client()?.profile()?;
        println!("{} (id {})", profile.username, profile.id);
        if !profile.email.is_empty() {
            println!("Email: {}", profile.email);
        }
        println!("Uploads: {}", profile.upload_count);
        println!("Backend: {}", self.config.api_url);
        Ok(())
    }

    fn load(&mut self, args: &SourceArgs) -> Result<Loaded, String> {
        let source = args.resolve()?;
        let client = match source {
            Source::File(_) => None,
            Source::Dataset(_) | Source::Latest => Some(self.client()?),
        };
        load_source(&source, client.as_deref())
    }

    /// Open a view seeded from stored preferences, then apply the flags
    ///
    /// An unavailable store never blocks the view: it opens with defaults and
    /// changes are not saved.
    fn open_view(&mut self, dataset: Dataset, args: &ViewArgs) -> Result<TableView, String> {
        let (stored, publisher) = match self.preference_store() {
            Ok(store) => {
                let stored = match store.get() {
                    Ok(stored) => stored,
                    Err(e) => {
                        ui::print_warning(&format!("Using default view settings: {}", e));
                        None
                    }
                };
                (stored, PreferencePublisher::spawn(store))
            }
            Err(e) => {
                ui::print_warning(&format!("Preferences unavailable, view settings will not be saved: {}", e));
                (None, PreferencePublisher::disabled())
            }
        };
        let mut view = TableView::new(dataset, stored, publisher);
        apply_view_args(&mut view, args)?;
        Ok(view)
    }

    fn run_view(&mut self, source_args: &SourceArgs, args: &ViewArgs, interactive: bool) -> Result<(), String> {
        let loaded = self.load(source_args)?;
        let mut view = self.open_view(loaded.dataset, args)?;
        let printed = console_format::print_page(&view.visible_page());
        if let Err(e) = printed {
            finish_view(view);
            return Err(format!("Failed to write table: {}", e));
        }

        let result = if interactive {
            let source = source_args.resolve()?;
            let client = self.client.clone();
            let reload = move || load_source(&source, client.as_deref()).map(|loaded| loaded.dataset);

            let stdin = io::stdin();
            let mut stdout = io::stdout();
            interactive::run_session(
                &mut view,
                stdin.lock(),
                &mut stdout,
                console_format::console_width(),
                &self.saver(),
                &reload,
            )
            .map_err(|e| format!("Failed to read commands: {}", e))
        } else {
            Ok(())
        };

        finish_view(view);
        result
    }

    fn run_export(&mut self, source: &SourceArgs, args: &ViewArgs) -> Result<(), String> {
        let loaded = self.load(source)?;
        let view = self.open_view(loaded.dataset, args)?;
        let result = view.download_csv(&self.saver());
        let count = view.ordered_rows().len();
        finish_view(view);

        let path = result.map_err(|e| format!("Failed to save export: {}", e))?;
        ui::status(&format!("Exported {} rows to {}", count, path.display()));
        Ok(())
    }

    fn run_report(&mut self, source: &SourceArgs, print: bool) -> Result<(), String> {
        let loaded = self.load(source)?;
        let meta = ReportMeta {
            filename: loaded.dataset.name().to_string(),
            total_records: loaded.total_records(),
            generated_at: chrono::Local::now().fixed_offset(),
        };
        let document = report::render_document(&meta, &loaded.dataset, &loaded.snapshot());

        if print {
            return report::print_document(&document, io::stdout().lock())
                .map_err(|e| format!("Failed to print report: {}", e));
        }
        let path = report::trigger_download(&document, loaded.dataset.name(), &self.saver())
            .map_err(|e| format!("Failed to save report: {}", e))?;
        ui::status(&format!("Report saved to {}", path.display()));
        Ok(())
    }

    fn run_stats(&mut self, source: &SourceArgs) -> Result<(), String> {
        let loaded = self.load(source)?;
        let snapshot = loaded.snapshot();
        let aggregates = match loaded.backend_stats {
            Some(ref stats) => report::aggregate_from_backend(stats),
            None => report::aggregate_by_type(loaded.dataset.rows(), loaded.dataset.columns()),
        };
        let shares = report::type_shares(&aggregates);

        let mut writer = TableWriter::new(io::stdout(), false);
        write_stats(&mut writer, loaded.dataset.name(), loaded.total_records(), &snapshot, &aggregates, &shares)
            .map_err(|e| format!("Failed to write statistics: {}", e))
    }

    fn run_upload(&mut self, path: &Path) -> Result<(), String> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("Not a file path: {}", path.display()))?
            .to_string();
        let contents = fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        api::check_upload(&name, contents.len())?;

        let info = self.client()?.upload_csv(&name, &contents)?;
        ui::status(&format!(
            "Uploaded {} as dataset {} ({} rows, {})",
            info.file_name,
            info.id,
            info.row_count.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
            info.status
        ));
        if info.statistics.is_some() { print_dataset_summary(info) } else { Ok(()) }
    }

    fn run_datasets(&mut self, action: &DatasetCommand) -> Result<(), String> {
        let client = self.client()?;
        match action {
            DatasetCommand::Upload { file } => self.run_upload(file),
            DatasetCommand::List => {
                let datasets = client.list_datasets()?;
                TableWriter::new(io::stdout(), false)
                    .write_dataset_list(&datasets)
                    .map_err(|e| format!("Failed to write dataset list: {}", e))
            }
            DatasetCommand::Show { id } => {
                let info = client.dataset(*id)?;
                println!("{} (id {})", info.file_name, info.id);
                println!("Status: {}", info.status);
                println!("Uploaded: {} by {}", info.uploaded_at, info.uploaded_by_username);
                print_dataset_summary(info)
            }
            DatasetCommand::Delete { id } => {
                let message = client.delete_dataset(*id)?;
                if message.is_empty() {
                    ui::status(&format!("Deleted dataset {}", id));
                } else {
                    ui::status(&message);
                }
                Ok(())
            }
            DatasetCommand::Pdf { id } => {
                let info = client.dataset(*id)?;
                let bytes = client.dataset_pdf(*id)?;
                let name = save::derived_filename(&info.file_name, "_report.pdf");
                let path = self
                    .saver()
                    .save(&bytes, "application/pdf", &name)
                    .map_err(|e| format!("Failed to save PDF: {}", e))?;
                ui::status(&format!("PDF saved to {}", path.display()));
                Ok(())
            }
        }
    }

    fn run_prefs(&mut self, action: &PrefsCommand) -> Result<(), String> {
        let store = self.preference_store()?;
        match action {
            PrefsCommand::Show => {
                let stored = store.get()?;
                let shown = stored.clone().unwrap_or_default();
                println!("Store: {}", store.describe());
                println!(
                    "Sort column: {}",
                    if shown.default_sort_column.is_empty() { "(none)" } else { shown.default_sort_column.as_str() }
                );
                println!("Sort order: {}", shown.default_sort_order);
                println!("Items per page: {}", shown.items_per_page);
                if stored.is_none() {
                    println!("(defaults; nothing saved yet)");
                }
                Ok(())
            }
            PrefsCommand::Set { sort, order, per_page } => {
                let update = PreferenceUpdate {
                    default_sort_column: sort.clone(),
                    default_sort_order: *order,
                    items_per_page: *per_page,
                };
                store.update(&update)?;
                ui::status(&format!("Preferences saved to {}", store.describe()));
                Ok(())
            }
        }
    }
}

/// Fetch the rows for `source`; remote sources need `client`
fn load_source(source: &Source, client: Option<&ApiClient>) -> Result<Loaded, String> {
    let remote = || client.ok_or_else(|| "Remote datasets need a logged-in session".to_string());
    match source {
        Source::File(path) => {
            let dataset = dataset::load_csv(path)?;
            if dataset.is_empty() {
                ui::print_warning(&format!("{} has no data rows", dataset.name()));
            }
            Ok(Loaded { dataset, backend_stats: None })
        }
        Source::Dataset(id) => Loaded::from_info(remote()?.dataset(*id)?),
        Source::Latest => {
            let overview = remote()?.statistics()?;
            debug!("backend has {} completed datasets", overview.total_datasets);
            let info = overview
                .latest()
                .cloned()
                .ok_or_else(|| "No completed datasets with statistics yet".to_string())?;
            Loaded::from_info(info)
        }
    }
}

/// Metric cards and per-type table of a backend dataset
fn print_dataset_summary(info: DatasetInfo) -> Result<(), String> {
    let loaded = Loaded::from_info(info)?;
    let snapshot = loaded.snapshot();
    let aggregates = loaded.backend_stats.as_ref().map(report::aggregate_from_backend).unwrap_or_default();
    let shares = report::type_shares(&aggregates);
    let mut writer = TableWriter::new(io::stdout(), false);
    write_stats(&mut writer, loaded.dataset.name(), loaded.total_records(), &snapshot, &aggregates, &shares)
        .map_err(|e| format!("Failed to write statistics: {}", e))
}

/// Apply `--search/--sort/--order/--per-page/--page` to a fresh view
fn apply_view_args(view: &mut TableView, args: &ViewArgs) -> Result<(), String> {
    if let Some(ref term) = args.search {
        view.set_search(term);
    }

    match (&args.sort, args.order) {
        (Some(column), order) => {
            let idx = view.dataset().column_index(column).ok_or_else(|| {
                format!("Unknown column '{}' (columns: {})", column, view.dataset().columns().join(", "))
            })?;
            let name = view.dataset().columns()[idx].clone();
            view.set_sort(&name, order.unwrap_or_default());
        }
        (None, Some(order)) => match view.preferences().sort_column.clone() {
            Some(column) => view.set_sort(&column, order),
            None => ui::print_warning("--order ignored: no sort column is set"),
        },
        (None, None) => {}
    }

    if let Some(n) = args.per_page {
        view.set_items_per_page(n)?;
    }
    if let Some(page) = args.page {
        view.go_to_page(page);
    }
    Ok(())
}

/// Wait for preference writes and report any that failed
fn finish_view(view: TableView) {
    let summary = view.close();
    debug!("preference publishes: {} applied, {} failed", summary.applied, summary.failed);
    if summary.failed > 0 {
        ui::print_warning(&format!("{} preference change(s) could not be saved", summary.failed));
    }
}

fn write_stats<W: Write>(
    writer: &mut TableWriter<W>,
    name: &str,
    total_records: usize,
    snapshot: &StatsSnapshot,
    aggregates: &[report::TypeAggregate],
    shares: &[report::TypeShare],
) -> io::Result<()> {
    writer.write_heading(&format!("{} ({} records)", name, total_records))?;
    writer.write_stat_cards(&report::aggregate_stats(snapshot))?;
    if !aggregates.is_empty() {
        writer.write_type_summary(aggregates, shares)?;
    }
    Ok(())
}
