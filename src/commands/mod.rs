//! Command handlers for the txn-insights CLI.
//!
//! This module contains implementations for all CLI subcommands. The MCP tools reuse the same
//! output shaping so both interfaces report the same thing.

mod analyze;
mod init;
mod mcp;

use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::fmt::Debug;
use std::io::Write;
use tracing::{debug, info};

pub use analyze::{aggregate, analyze, columns, ColumnImpact, ColumnsReport};
pub(crate) use analyze::{aggregate_out, columns_out, report_out};
pub use init::init;
pub use mcp::mcp;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Appends `suffix` to the message.
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.message.push_str(suffix);
        self
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }

    /// Print the message to `info!` and write the structured data (if it exists) as JSON to
    /// stdout, where it can be piped to another program.
    pub fn write_json(&self, pretty: bool) -> Result<()> {
        info!("{}", self.message);
        let Some(structure) = self.structure() else {
            return Ok(());
        };
        let json = if pretty {
            serde_json::to_string_pretty(structure)
        } else {
            serde_json::to_string(structure)
        }
        .context("Unable to serialize the command output")?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{json}").context("Unable to write to stdout")?;
        stdout.flush().context("Unable to write to stdout")
    }
}
