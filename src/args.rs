//! These structs provide the CLI interface for the txn-insights CLI.

use crate::analysis::AggregateKind;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// txn-insights: Turns a CSV of bank transactions into chart-ready aggregates.
///
/// The input is a CSV file with a header row. The recognized columns are `Account Type`,
/// `Region`, `Transaction To`, `Credit`, `Debit` and `Date` or `Time`. Any of them may be missing;
/// an aggregate that needs a missing column is reported as unavailable and the others are still
/// computed.
///
/// There is also a mode in which an AI agent can use this program through the mcp subcommand.
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and a default config.json.
    ///
    /// The configuration sets the number of beneficiaries listed per region, the outlier
    /// threshold, extra date formats, and the file that is analyzed when --file is not given.
    /// Running this is optional; without a config.json the defaults are used.
    Init,
    /// Compute the aggregates and print them as a JSON report to stdout.
    Analyze(AnalyzeArgs),
    /// Show which recognized columns a file has and what each missing column disables.
    Columns(ColumnsArgs),
    /// Run the MCP server on stdio.
    Mcp,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. Logs are written to stderr.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration is held. Defaults to ~/txn-insights
    #[arg(long, env = "TXN_INSIGHTS_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `txn-insights analyze` command.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// The CSV file to analyze. Defaults to default_input from config.json.
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,

    /// Only compute these aggregates. May be repeated or comma separated.
    #[arg(long, value_enum, value_delimiter = ',')]
    only: Vec<AggregateKind>,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,
}

impl AnalyzeArgs {
    pub fn new(file: Option<PathBuf>, only: Vec<AggregateKind>, pretty: bool) -> Self {
        Self { file, only, pretty }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn only(&self) -> &[AggregateKind] {
        &self.only
    }

    pub fn pretty(&self) -> bool {
        self.pretty
    }
}

/// (Not shown): Args for the `txn-insights columns` command.
#[derive(Debug, Parser, Clone)]
pub struct ColumnsArgs {
    /// The CSV file to inspect. Defaults to default_input from config.json.
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,
}

impl ColumnsArgs {
    pub fn new(file: Option<PathBuf>) -> Self {
        Self { file }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("txn-insights"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or TXN_INSIGHTS_HOME instead of relying on the default \
                home directory.",
            );
            PathBuf::from("txn-insights")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
