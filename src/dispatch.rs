use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::protocol::{self, ErrorCode, Request, PROTOCOL_VERSION};
use crate::provider::ImageProvider;
use crate::registry::ToolRegistry;

const KNOWN_TYPES: [&str; 3] = ["hello", "list_tools", "run_tool"];

/// Routes one input line to its handler and renders exactly one reply line.
///
/// Stateless across lines: no session, no memory of prior requests, so
/// replaying a `run_tool` line issues a fresh provider call. Registry and
/// provider are passed in at construction so tests can swap in fakes.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    provider: Arc<dyn ImageProvider>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, provider: Arc<dyn ImageProvider>) -> Self {
        Self { registry, provider }
    }

    /// Handle one input line. Returns the serialized response, or `None`
    /// when the line is unparseable and carries no recoverable id.
    pub async fn dispatch_line(&self, line: &str) -> Option<String> {
        let message: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                // The broken line itself is the only id source left. Scan it
                // rather than re-parsing, which can only fail again.
                return match protocol::extract_id(line) {
                    Some(id) => Some(render(protocol::error(
                        id,
                        ErrorCode::InternalError,
                        format!("invalid JSON: {e}"),
                    ))),
                    None => {
                        warn!(error = %e, "dropping unparseable line with no recoverable id");
                        None
                    }
                };
            }
        };

        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let tag = message
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let response = match serde_json::from_value::<Request>(message) {
            Ok(request) => self.handle(id, request).await,
            Err(e) if KNOWN_TYPES.contains(&tag.as_str()) => protocol::error(
                id,
                ErrorCode::InternalError,
                format!("malformed {tag} message: {e}"),
            ),
            Err(_) => protocol::error(
                id,
                ErrorCode::NotSupported,
                format!("unsupported message type: {tag}"),
            ),
        };

        Some(render(response))
    }

    async fn handle(&self, id: Value, request: Request) -> Value {
        match request {
            Request::Hello => protocol::success(
                id,
                json!({
                    "type": "hello_response",
                    "version": PROTOCOL_VERSION,
                    "capabilities": ["tools"],
                }),
            ),
            Request::ListTools => {
                let tools: Vec<Value> = self.registry.list().iter().map(|t| t.to_json()).collect();
                protocol::success(id, json!({ "type": "list_tools_response", "tools": tools }))
            }
            Request::RunTool { tool_name, parameters } => {
                self.run_tool(id, &tool_name, &parameters).await
            }
        }
    }

    async fn run_tool(&self, id: Value, tool_name: &str, parameters: &Map<String, Value>) -> Value {
        let Some(tool) = self.registry.find(tool_name) else {
            return protocol::error(
                id,
                ErrorCode::NotFound,
                format!("tool not found: {tool_name}"),
            );
        };

        let input = tool.merge_defaults(parameters);
        debug!(tool = tool_name, input = ?input, "running tool");

        match self.provider.generate(&input).await {
            Ok(result) => protocol::success(
                id,
                json!({ "type": "run_tool_response", "result": result }),
            ),
            Err(e) => {
                warn!(tool = tool_name, error = %e, "tool run failed");
                protocol::error(id, ErrorCode::ToolError, format!("error running tool: {e}"))
            }
        }
    }
}

fn render(response: Value) -> String {
    serde_json::to_string(&response).unwrap_or_else(|_| "{}".into())
}
