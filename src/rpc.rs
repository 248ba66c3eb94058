//! JSON-RPC 2.0 over stdio: one message per line in, one response per line out.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde_json::{Map, Value, json};

use logstash_mcp::{DispatchError, LogstashApi, ToolCall, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "logstash-mcp";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const NOT_INITIALIZED: i64 = -32002;

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<DispatchError> for RpcError {
    fn from(err: DispatchError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// One client connection. Owns the `initialized` flag; the registry and the
/// remote client are shared and read-only.
pub struct Session<'a> {
    registry: &'a ToolRegistry,
    api: &'a dyn LogstashApi,
    initialized: bool,
}

impl<'a> Session<'a> {
    pub fn new(registry: &'a ToolRegistry, api: &'a dyn LogstashApi) -> Self {
        Self {
            registry,
            api,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Handle one raw line. Returns the serialized response, or `None` for
    /// notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Ok(message) => self.handle_message(message)?,
            Err(e) => {
                warn!("[rpc] unparseable message: {e}");
                error_response(Value::Null, RpcError::new(PARSE_ERROR, format!("Parse error: {e}")))
            }
        };
        Some(response.to_string())
    }

    pub fn handle_message(&mut self, message: Value) -> Option<Value> {
        let Value::Object(mut request) = message else {
            return Some(error_response(
                Value::Null,
                RpcError::new(INVALID_REQUEST, "Invalid Request: expected a JSON object"),
            ));
        };

        // Requests carry an id, notifications don't.
        let id = request.remove("id");
        let method = match request.remove("method") {
            Some(Value::String(m)) => m,
            _ => {
                return id.map(|id| {
                    error_response(id, RpcError::new(INVALID_REQUEST, "Invalid Request: missing method"))
                });
            }
        };
        let params = request.remove("params").unwrap_or(Value::Null);

        debug!("[rpc] {method}");
        let outcome = self.dispatch(&method, params);

        let id = id?;
        Some(match outcome {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(err) => {
                warn!("[rpc] {method} failed: {} ({})", err.message, err.code);
                error_response(id, err)
            }
        })
    }

    fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => {
                self.initialized = true;
                info!("[rpc] session initialized");
                Ok(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }))
            }
            "notifications/initialized" => Ok(Value::Null),
            "ping" => Ok(Value::Object(Map::new())),
            "tools/list" => {
                self.require_initialized()?;
                Ok(self.registry.list_tools())
            }
            "tools/call" => {
                self.require_initialized()?;
                let call: ToolCall = serde_json::from_value(params).map_err(|e| {
                    RpcError::new(INVALID_PARAMS, format!("invalid tools/call params: {e}"))
                })?;
                let result = self.registry.call_tool(&call, self.api)?;
                serde_json::to_value(result)
                    .map_err(|e| RpcError::new(INVALID_PARAMS, format!("unserializable result: {e}")))
            }
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Unknown method: {other}"))),
        }
    }

    fn require_initialized(&self) -> Result<(), RpcError> {
        if self.initialized {
            Ok(())
        } else {
            Err(RpcError::new(NOT_INITIALIZED, "Server not initialized"))
        }
    }
}

fn error_response(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": err.code, "message": err.message },
    })
}

/// Serve one session until `reader` hits EOF.
pub fn serve<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    registry: &ToolRegistry,
    api: &dyn LogstashApi,
) -> Result<()> {
    let mut session = Session::new(registry, api);
    for line in reader.lines() {
        let line = line.context("reading request line")?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = session.handle_line(&line) {
            writeln!(writer, "{response}").context("writing response")?;
            writer.flush().context("flushing response")?;
        }
    }
    info!(
        "[rpc] input closed, session ended (initialized: {})",
        session.is_initialized()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use logstash_mcp::testing::FakeLogstash;

    use super::*;

    fn node() -> Value {
        json!({ "version": "8.13.0", "host": "ls-01", "id": "abc", "status": "green" })
    }

    fn send(session: &mut Session, message: Value) -> Value {
        let line = session.handle_line(&message.to_string()).unwrap();
        serde_json::from_str(&line).unwrap()
    }

    fn init(session: &mut Session) {
        send(session, json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {} }));
    }

    #[test]
    fn initialize_reports_tools_capability() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let mut session = Session::new(&registry, &engine);

        let resp = send(&mut session, json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }));
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], "logstash-mcp");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
        assert!(session.is_initialized());
    }

    #[test]
    fn tools_before_initialize_are_refused() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let mut session = Session::new(&registry, &engine);

        let resp = send(&mut session, json!({ "jsonrpc": "2.0", "id": 7, "method": "tools/list" }));
        assert_eq!(resp["error"]["code"], NOT_INITIALIZED);
        assert_eq!(resp["id"], 7);
    }

    #[test]
    fn notifications_get_no_response() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let mut session = Session::new(&registry, &engine);

        let line = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string();
        assert!(session.handle_line(&line).is_none());
        let line = json!({ "jsonrpc": "2.0", "method": "no/such/thing" }).to_string();
        assert!(session.handle_line(&line).is_none());
    }

    #[test]
    fn malformed_line_is_parse_error() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let mut session = Session::new(&registry, &engine);

        let resp: Value = serde_json::from_str(&session.handle_line("{not json").unwrap()).unwrap();
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert_eq!(resp["id"], Value::Null);
    }

    #[test]
    fn unknown_method_and_ping() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let mut session = Session::new(&registry, &engine);

        let resp = send(&mut session, json!({ "jsonrpc": "2.0", "id": "a", "method": "resources/list" }));
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);

        let resp = send(&mut session, json!({ "jsonrpc": "2.0", "id": "b", "method": "ping" }));
        assert_eq!(resp["result"], json!({}));
    }

    #[test]
    fn tools_list_and_call() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new().on_get("/_node", node());
        let mut session = Session::new(&registry, &engine);
        init(&mut session);

        let resp = send(&mut session, json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }));
        assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 12);

        let resp = send(
            &mut session,
            json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "logstash_node_info", "arguments": {} }
            }),
        );
        assert_eq!(resp["result"]["isError"], false);
        assert_eq!(resp["result"]["content"][0]["type"], "text");
        assert!(resp["result"]["content"][0]["text"].as_str().unwrap().contains("version: 8.13.0"));
    }

    #[test]
    fn dispatch_errors_map_to_invalid_params() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let mut session = Session::new(&registry, &engine);
        init(&mut session);

        let resp = send(
            &mut session,
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": { "name": "logstash_pipeline_stats", "arguments": {} }
            }),
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert!(resp["error"]["message"].as_str().unwrap().contains("id"));

        let resp = send(
            &mut session,
            json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": { "name": "nope" }
            }),
        );
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert_eq!(resp["error"]["message"], "Unknown tool: nope");
    }

    #[test]
    fn remote_failure_is_a_result_not_an_error() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::refusing();
        let mut session = Session::new(&registry, &engine);
        init(&mut session);

        let resp = send(
            &mut session,
            json!({
                "jsonrpc": "2.0", "id": 5, "method": "tools/call",
                "params": { "name": "logstash_jvm_stats" }
            }),
        );
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["isError"], true);
    }

    #[test]
    fn serve_answers_each_request_line() {
        let registry = ToolRegistry::default();
        let engine = FakeLogstash::new();
        let input = [
            json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize" }).to_string(),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
            String::new(),
            "garbage".to_string(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }).to_string(),
        ]
        .join("\n");

        let mut output = Vec::new();
        serve(Cursor::new(input), &mut output, &registry, &engine).unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 0);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(lines[2]["id"], 1);
        assert!(lines[2]["result"]["tools"].is_array());
    }
}
