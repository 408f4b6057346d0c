//! The MCP tools: thin wrappers that load through the shared cache and shape output with the same
//! functions the CLI uses.

use crate::analysis::AggregateKind;
use crate::cache::CacheStatus;
use crate::commands::{self, Out};
use crate::error::{ErrorType, IntoResult};
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::InsightsServer;
use crate::model::Transactions;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters for the analyze tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "AnalyzeParams")]
pub struct AnalyzeParams {
    /// Path to the transaction CSV. Defaults to `default_input` from config.json.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Restrict the report to these aggregates. Every aggregate is computed when this is empty.
    #[serde(default)]
    pub only: Vec<AggregateKind>,
}

/// Parameters for the aggregate tool.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "AggregateParams")]
pub struct AggregateParams {
    /// The aggregate to compute.
    pub name: AggregateKind,

    /// Path to the transaction CSV. Defaults to `default_input` from config.json.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Parameters for tools that only need a file.
#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(title = "PathParams")]
pub struct PathParams {
    /// Path to the transaction CSV. Defaults to `default_input` from config.json.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl InsightsServer {
    /// Resolves `path` and gets its transactions from the cache. The cache lock is released
    /// before this returns.
    async fn load(&self, path: Option<&Path>) -> crate::Result<Loaded> {
        let path = self
            .config
            .resolve_input(path)
            .pub_result(ErrorType::Input)?;
        let (transactions, status) = self
            .cache
            .lock()
            .await
            .get(&path)
            .await
            .pub_result(ErrorType::Input)?;
        debug!("{} from cache: {status}", path.display());
        Ok(Loaded {
            path,
            transactions,
            status,
        })
    }
}

struct Loaded {
    path: PathBuf,
    transactions: Arc<Transactions>,
    status: CacheStatus,
}

impl Loaded {
    /// Tells the agent whether the file was parsed for this call.
    fn suffix(&self) -> String {
        format!(" (cache: {})", self.status)
    }
}

#[tool_router(vis = "pub(super)")]
impl InsightsServer {
    /// Compute every aggregate over a transaction CSV and return them as one JSON report.
    ///
    /// The report carries the record count, the recognized columns, per-column counts of cells
    /// that could not be parsed, and one entry per aggregate. Each entry is either
    /// `{"status": "available", "value": ...}` or `{"status": "unavailable", "value": {...}}`
    /// where the value explains which column is missing or why the statistic is undefined.
    ///
    /// # Parameters
    ///
    /// - `path`: The CSV to analyze. Optional when config.json has a `default_input`.
    /// - `only`: Aggregate names to restrict the report to.
    #[tool]
    async fn analyze(
        &self,
        Parameters(params): Parameters<AnalyzeParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "MCP: analyze called with path={:?}, only={:?}",
            params.path, params.only
        );
        let options = self.config.analysis_options();
        let out = self
            .load(params.path.as_deref())
            .await
            .map(|loaded| {
                commands::report_out(&loaded.path, &loaded.transactions, &options, &params.only)
                    .with_suffix(&loaded.suffix())
            });
        tool_result(out)
    }

    /// Compute a single aggregate over a transaction CSV. Returns the tagged result on its own,
    /// which is smaller than the full report when only one table is needed.
    #[tool]
    async fn aggregate(
        &self,
        Parameters(params): Parameters<AggregateParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(
            "MCP: aggregate called with name={}, path={:?}",
            params.name, params.path
        );
        let options = self.config.analysis_options();
        let out = match self.load(params.path.as_deref()).await {
            Ok(loaded) => {
                commands::aggregate_out(&loaded.path, &loaded.transactions, &options, params.name)
                    .map(|out| out.with_suffix(&loaded.suffix()))
            }
            Err(e) => Err(e),
        };
        tool_result(out)
    }

    /// List the recognized columns of a transaction CSV. For each missing column, lists the
    /// aggregates that cannot be computed without it. Headers that are not recognized are listed
    /// separately.
    #[tool]
    async fn columns(
        &self,
        Parameters(params): Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: columns called with path={:?}", params.path);
        let out = self
            .load(params.path.as_deref())
            .await
            .map(|loaded| {
                commands::columns_out(&loaded.path, &loaded.transactions)
                    .with_suffix(&loaded.suffix())
            });
        tool_result(out)
    }

    /// Drop a file from the cache so the next call re-reads it. Without `path`, every cached file
    /// is dropped. Changed files are detected automatically, so this is rarely needed.
    #[tool]
    async fn invalidate_cache(
        &self,
        Parameters(params): Parameters<PathParams>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: invalidate_cache called with path={:?}", params.path);
        let mut cache = self.cache.lock().await;
        let message = match params.path {
            Some(path) => {
                if cache.invalidate(&path).await {
                    format!("Removed {} from the cache", path.display())
                } else {
                    format!("{} was not cached", path.display())
                }
            }
            None => format!("Removed {} file(s) from the cache", cache.clear()),
        };
        tool_result(Ok(Out::<()>::new_message(message)))
    }
}
