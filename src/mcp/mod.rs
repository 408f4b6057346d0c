//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes the aggregation pipeline as tools for AI agent
//! integration. The server communicates via JSON-RPC over stdio.

mod mcp_utils;
mod tools;

use crate::{Config, DatasetCache};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::transport::stdio;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// The txn-insights MCP server.
///
/// Loaded files are kept in a `DatasetCache` shared by every tool call, so an agent can ask for
/// several aggregates of the same file without it being parsed again.
#[derive(Debug, Clone)]
pub struct InsightsServer {
    config: Arc<Config>,
    cache: Arc<Mutex<DatasetCache>>,
    tool_router: ToolRouter<InsightsServer>,
}

impl InsightsServer {
    /// Creates a new InsightsServer with the given configuration.
    pub fn new(config: Config) -> Self {
        let cache = DatasetCache::new(config.timestamp_parser());
        Self {
            config: Arc::new(config),
            cache: Arc::new(Mutex::new(cache)),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for InsightsServer {
    /// Returns server information sent to the MCP client during initialization.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "txn-insights".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INSTRUCTIONS.md").into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
pub(crate) async fn run_server(config: Config, io: Io) -> crate::Result<()> {
    use crate::error::{ErrorType, IntoResult};
    let server = InsightsServer::new(config);
    info!("Starting MCP server...");

    let service = match io {
        Io::Stdio => server
            .serve(stdio())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
        #[cfg(test)]
        Io::Mock(stream) => server
            .serve(stream)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
            .pub_result(ErrorType::Service)?,
    };

    info!("MCP server running, waiting for requests...");

    // Wait for the server to complete (client disconnects or error)
    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AggregateKind;
    use crate::test::TestEnv;
    use rmcp::model::{CallToolRequestParam, CallToolResult};
    use rmcp::service::{RoleClient, RunningService};
    use rmcp::ServiceExt;
    use serde_json::{json, Map, Value};
    use tokio::io::duplex;

    async fn call(
        client: &RunningService<RoleClient, ()>,
        name: &'static str,
        arguments: Value,
    ) -> CallToolResult {
        let arguments: Option<Map<String, Value>> = match arguments {
            Value::Object(map) => Some(map),
            _ => None,
        };
        client
            .call_tool(CallToolRequestParam {
                name: name.into(),
                arguments,
            })
            .await
            .unwrap_or_else(|e| panic!("{name} call failed: {e}"))
    }

    /// The text message that every tool result starts with.
    fn message(result: &CallToolResult) -> &str {
        assert!(
            !result.is_error.unwrap_or(false),
            "tool returned error: {:?}",
            result.content
        );
        &result.content[0].as_text().unwrap().text
    }

    /// The JSON structure that follows the message.
    fn structure(result: &CallToolResult) -> Value {
        message(result);
        let text = &result.content[1].as_text().unwrap().text;
        serde_json::from_str(text).unwrap()
    }

    /// Integration test for the MCP server using an in-memory transport.
    #[tokio::test]
    async fn test_mcp_server_integration() {
        // Create duplex channel - one end for server, one for client
        let (client_io, server_io) = duplex(4096);

        // Create test environment (holds TempDir alive for duration of test)
        let env = TestEnv::new().await;
        let config = env.config();
        let partial = env.write_csv("partial.csv", "Region,Credit\nEast,1\nWest,2\n");

        let server_handle =
            tokio::spawn(async move { run_server(config, Io::Mock(server_io)).await });

        let client = ().serve(client_io).await.expect("Failed to create client");

        let tools = client
            .list_tools(Default::default())
            .await
            .expect("Failed to list tools");
        let names: Vec<&str> = tools.tools.iter().map(|t| &*t.name).collect();
        for expected in ["analyze", "aggregate", "columns", "invalidate_cache"] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }

        // The default input from config.json is parsed on the first call.
        let result = call(&client, "analyze", json!({})).await;
        assert!(message(&result).ends_with("(cache: loaded)"));
        let report = structure(&result);
        assert_eq!(report["records"], 16);
        for kind in AggregateKind::ALL {
            assert_eq!(report[kind.to_string()]["status"], "available", "{kind}");
        }

        // And served from the cache after that.
        let result = call(&client, "analyze", json!({})).await;
        assert!(message(&result).ends_with("(cache: hit)"));
        assert_eq!(structure(&result), report);

        let result = call(
            &client,
            "analyze",
            json!({"path": partial, "only": ["account_types", "top_beneficiaries", "correlation"]}),
        )
        .await;
        let partial_report = structure(&result);
        assert_eq!(partial_report["records"], 2);
        assert_eq!(partial_report["columns"], json!(["region", "credit"]));
        let correlation = &partial_report["correlation"];
        assert_eq!(correlation["status"], "unavailable");
        assert_eq!(correlation["value"]["reason"], "missing_column");
        assert_eq!(correlation["value"]["columns"], json!(["debit"]));
        assert_eq!(
            partial_report["account_types"]["value"]["columns"],
            json!(["account_type"])
        );
        assert!(partial_report.get("outliers").is_none());
        assert!(partial_report.get("daily_totals").is_none());

        let result = call(&client, "aggregate", json!({"name": "outliers"})).await;
        assert!(message(&result).ends_with("(cache: hit)"));
        let outliers = structure(&result);
        assert_eq!(outliers["status"], "available");
        assert!(outliers["value"]["flagged"].is_array());
        assert_eq!(outliers["value"]["credit"]["status"], "available");
        assert!(outliers.get("records").is_none());

        let result = call(&client, "columns", json!({"path": partial})).await;
        assert!(message(&result).ends_with("(cache: hit)"));
        let columns = structure(&result);
        assert_eq!(columns["present"], json!(["region", "credit"]));
        let debit = columns["missing"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["column"] == "debit")
            .unwrap();
        let disables = debit["disables"].as_array().unwrap();
        assert!(disables.contains(&json!("correlation")));
        assert!(disables.contains(&json!("regional_intensity")));

        let result = call(&client, "invalidate_cache", json!({})).await;
        assert_eq!(message(&result), "Removed 2 file(s) from the cache");

        let result = call(&client, "analyze", json!({})).await;
        assert!(message(&result).ends_with("(cache: loaded)"));

        // An unreadable file is a tool error, not a server failure.
        let result = call(
            &client,
            "analyze",
            json!({"path": env.root().join("missing.csv")}),
        )
        .await;
        assert!(result.is_error.unwrap_or(false));

        // Drop client to trigger server shutdown
        drop(client);

        let server_result = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle)
            .await
            .expect("Server timed out")
            .expect("Server task panicked");

        assert!(
            server_result.is_ok(),
            "Server returned error: {:?}",
            server_result
        );
    }
}
