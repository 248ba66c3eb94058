use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DispatchError;

// ── Parameter schema ──────────────────────────────────────────────────────────

/// Primitive types a tool parameter can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            // Args::int reads i64, so larger integers are out of range.
            ParamType::Integer => value.is_i64(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

/// A single parameter in a tool's input schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    /// Value used when the caller leaves an optional parameter out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolParam {
    pub fn required(name: &str, ty: ParamType, description: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, ty: ParamType, description: &str, default: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty,
            required: false,
            default: Some(default),
        }
    }

    /// The `human` flag shared by every stats tool.
    pub fn human() -> Self {
        Self::optional(
            "human",
            ParamType::Boolean,
            "Format output for human readability",
            Value::Bool(true),
        )
    }
}

// ── Tool definition ───────────────────────────────────────────────────────────

/// Static metadata that describes a tool to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

impl ToolDef {
    /// Render the parameter list as a JSON Schema object, the `inputSchema`
    /// shape MCP clients expect.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|p| {
                let mut schema = serde_json::json!({
                    "type": p.ty,
                    "description": p.description,
                });
                if let Some(default) = &p.default {
                    schema["default"] = default.clone();
                }
                (p.name.clone(), schema)
            })
            .collect();

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The `tools/list` entry for this tool.
    pub fn to_mcp(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// Check `arguments` against the schema and fill in defaults.
    ///
    /// Unknown keys are dropped. Every missing or mistyped parameter is
    /// reported in a single `InvalidArguments`.
    pub fn validate(&self, arguments: &Value) -> Result<Args, DispatchError> {
        let empty = Map::new();
        let given = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(DispatchError::InvalidArguments {
                    tool: self.name.clone(),
                    params: vec![],
                    detail: format!("arguments must be an object, got {}", json_type(other)),
                });
            }
        };

        let mut values = Map::new();
        let mut bad = vec![];
        let mut problems = vec![];

        for param in &self.params {
            match given.get(&param.name) {
                Some(Value::Null) | None => {
                    if param.required {
                        bad.push(param.name.clone());
                        problems.push(format!("missing required parameter '{}'", param.name));
                    } else if let Some(default) = &param.default {
                        values.insert(param.name.clone(), default.clone());
                    }
                }
                Some(value) if param.ty.matches(value) => {
                    values.insert(param.name.clone(), value.clone());
                }
                Some(value) => {
                    bad.push(param.name.clone());
                    problems.push(format!(
                        "parameter '{}' must be {}, got {}",
                        param.name,
                        param.ty.as_str(),
                        json_type(value)
                    ));
                }
            }
        }

        if bad.is_empty() {
            Ok(Args { values })
        } else {
            Err(DispatchError::InvalidArguments {
                tool: self.name.clone(),
                params: bad,
                detail: problems.join("; "),
            })
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(n) if !n.is_i64() => "integer out of range",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Arguments that passed validation, with defaults applied.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Map<String, Value>,
}

impl Args {
    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.as_str()
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.values.get(key)?.as_bool()
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.values.get(key)?.as_i64()
    }

    /// The `human` flag; stats tools default it to `true`.
    pub fn human(&self) -> bool {
        self.bool("human").unwrap_or(true)
    }
}

// ── Tool call (client → server) ───────────────────────────────────────────────

/// A request from the client to invoke a specific tool.
/// Matches the `params` of an MCP `tools/call` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Arbitrary JSON arguments as specified by the tool's input schema.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

// ── Tool result (server → client) ─────────────────────────────────────────────

/// A content block inside a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }
}

/// The result of invoking a tool, sent back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(message)],
            is_error: true,
        }
    }

    /// All text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| match c {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
