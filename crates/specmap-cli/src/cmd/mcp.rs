use crate::tools::{self, SpecmapTool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::path::Path;

const PROTOCOL_VERSION: &str = "2024-11-05";

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    fn ok(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolContent {
    r#type: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct ToolCallResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Line-delimited JSON-RPC over stdin/stdout. Logging goes to stderr.
pub fn run(root: &Path) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let tools = tools::all_tools();
    tracing::info!(root = %root.display(), tools = tools.len(), "mcp server started");

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Err(e) => JsonRpcResponse::err(None, -32700, format!("parse error: {e}")),
            // Notifications carry no id and get no reply.
            Ok(raw) if !raw.as_object().is_some_and(|o| o.contains_key("id")) => {
                tracing::debug!(line = %line, "notification ignored");
                continue;
            }
            Ok(raw) => match serde_json::from_value::<JsonRpcRequest>(raw) {
                Ok(request) => handle_request(&request, &tools, root),
                Err(e) => JsonRpcResponse::err(None, -32600, format!("invalid request: {e}")),
            },
        };

        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &response)?;
        writeln!(out)?;
        out.flush()?;
    }

    tracing::info!("mcp server stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Request dispatch (pub for unit tests)
// ---------------------------------------------------------------------------

pub fn handle_request(
    req: &JsonRpcRequest,
    tools: &[Box<dyn SpecmapTool>],
    root: &Path,
) -> JsonRpcResponse {
    let id = req.id.clone();
    match req.method.as_str() {
        "initialize" => JsonRpcResponse::ok(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "specmap",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),

        "tools/list" => {
            let tool_list: Vec<Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name(),
                        "description": t.description(),
                        "inputSchema": t.schema()
                    })
                })
                .collect();
            JsonRpcResponse::ok(id, serde_json::json!({ "tools": tool_list }))
        }

        "tools/call" => {
            let Some(params) = &req.params else {
                return JsonRpcResponse::err(id, -32602, "missing params");
            };
            let Some(tool_name) = params["name"].as_str() else {
                return JsonRpcResponse::err(id, -32602, "missing tool name in params");
            };
            let Some(tool) = tools.iter().find(|t| t.name() == tool_name) else {
                return JsonRpcResponse::err(id, -32601, format!("tool not found: {tool_name}"));
            };

            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            let (text, is_error) = match tool.call(args, root) {
                Ok(v) => (
                    serde_json::to_string_pretty(&v)
                        .unwrap_or_else(|e| format!("serialization error: {e}")),
                    false,
                ),
                Err(e) => {
                    tracing::warn!(tool = tool_name, "tool call failed");
                    (e, true)
                }
            };

            let call_result = ToolCallResult {
                content: vec![ToolContent {
                    r#type: "text",
                    text,
                }],
                is_error,
            };
            JsonRpcResponse::ok(
                id,
                serde_json::to_value(&call_result)
                    .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()})),
            )
        }

        other => JsonRpcResponse::err(id, -32601, format!("method not found: {other}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
