use crate::types::SortOrder;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Get the default configuration directory for chemdata
/// Uses platform-specific config directories:
/// - Linux: ~/.config/chemdata
/// - macOS: ~/Library/Application Support/chemdata
/// - Windows: %APPDATA%/chemdata
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir().map(|p| p.join("chemdata")).unwrap_or_else(|| PathBuf::from(".chemdata"))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "chemdata")]
#[command(about = "Browse, export and report on chemical equipment datasets")]
#[command(version)]
pub struct CliArgs {
    /// Config file (default: <config dir>/chemdata/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend base URL (env: CHEMDATA_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Backend username (env: CHEMDATA_USERNAME)
    #[arg(long, short = 'u', global = true)]
    pub username: Option<String>,

    /// Backend password (env: CHEMDATA_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Directory downloads are saved into (default: current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Local preference file (default: <config dir>/chemdata/preferences.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub preferences: Option<PathBuf>,

    /// Keep view preferences in the local file even when logged in
    #[arg(long, global = true)]
    pub local_prefs: bool,

    /// HTTP timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Override console width for testing (default: auto-detect)
    #[arg(long, global = true, value_name = "COLUMNS")]
    pub console_width: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show one page of a dataset as a table
    View {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Read view commands from stdin after printing the first page
        #[arg(long, short = 'i')]
        interactive: bool,
    },

    /// Write the filtered, sorted rows as CSV
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Write the HTML report for a dataset
    Report {
        #[command(flatten)]
        source: SourceArgs,

        /// Write the report to stdout instead of the output directory
        #[arg(long)]
        print: bool,
    },

    /// Print metric summaries and per-type averages
    Stats {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Manage datasets uploaded to the backend
    Datasets {
        #[command(subcommand)]
        action: DatasetCommand,
    },

    /// Inspect or change stored view preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsCommand,
    },

    /// Show the logged-in user's profile
    Whoami,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DatasetCommand {
    /// Upload a CSV file for the backend to process
    Upload {
        #[arg(value_name = "CSV")]
        file: PathBuf,
    },
    /// List uploaded datasets
    List,
    /// Show one dataset with its statistics
    Show { id: u64 },
    /// Delete a dataset
    Delete { id: u64 },
    /// Download the backend's PDF report for a dataset
    Pdf { id: u64 },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrefsCommand {
    /// Print the stored preferences
    Show,
    /// Change the stored preferences
    Set {
        /// Default sort column
        #[arg(long, value_name = "COLUMN")]
        sort: Option<String>,

        /// Default sort order (asc or desc)
        #[arg(long)]
        order: Option<SortOrder>,

        /// Default rows per page
        #[arg(long, value_name = "N")]
        per_page: Option<usize>,
    },
}

/// Where rows come from
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SourceArgs {
    /// Local CSV file
    #[arg(long, short = 'f', value_name = "CSV")]
    pub file: Option<PathBuf>,

    /// Uploaded dataset id
    #[arg(long, short = 'd', value_name = "ID")]
    pub dataset: Option<u64>,

    /// Newest completed dataset on the backend
    #[arg(long)]
    pub latest: bool,
}

/// A resolved row source
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    File(PathBuf),
    Dataset(u64),
    Latest,
}

impl SourceArgs {
    /// Exactly one of --file, --dataset or --latest
    pub fn resolve(&self) -> Result<Source, String> {
        match (&self.file, self.dataset, self.latest) {
            (Some(path), None, false) => Ok(Source::File(path.clone())),
            (None, Some(id), false) => Ok(Source::Dataset(id)),
            (None, None, true) => Ok(Source::Latest),
            (None, None, false) => Err("Must specify one of: --file, --dataset or --latest".to_string()),
            _ => Err("Cannot combine --file, --dataset and --latest".to_string()),
        }
    }
}

/// Initial view settings; unset fields fall back to stored preferences
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ViewArgs {
    /// Case-insensitive substring filter over every column
    #[arg(long, short = 's', value_name = "TERM")]
    pub search: Option<String>,

    /// Column to sort by
    #[arg(long, value_name = "COLUMN")]
    pub sort: Option<String>,

    /// Sort order (asc or desc); applies to the stored sort column when --sort is absent
    #[arg(long)]
    pub order: Option<SortOrder>,

    /// Rows per page
    #[arg(long, value_name = "N")]
    pub per_page: Option<usize>,

    /// Page to show (1-based)
    #[arg(long, value_name = "N")]
    pub page: Option<usize>,
}

impl ViewArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.per_page == Some(0) {
            return Err("--per-page must be at least 1".to_string());
        }
        if self.page == Some(0) {
            return Err("--page starts at 1".to_string());
        }
        Ok(())
    }
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout == Some(0) {
            return Err("--timeout must be at least 1 second".to_string());
        }

        match &self.command {
            Command::View { source, view, .. } | Command::Export { source, view } => {
                source.resolve()?;
                view.validate()
            }
            Command::Report { source, .. } | Command::Stats { source } => source.resolve().map(|_| ()),
            Command::Datasets { .. } | Command::Whoami => Ok(()),
            Command::Prefs { action: PrefsCommand::Set { sort, order, per_page } } => {
                if sort.is_none() && order.is_none() && per_page.is_none() {
                    return Err("Nothing to set: pass --sort, --order or --per-page".to_string());
                }
                if *per_page == Some(0) {
                    return Err("--per-page must be at least 1".to_string());
                }
                Ok(())
            }
            Command::Prefs { action: PrefsCommand::Show } => Ok(()),
        }
    }
}
