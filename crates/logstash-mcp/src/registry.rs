use log::{info, warn};
use serde_json::{Value, json};

use crate::{
    analyze::Thresholds,
    client::LogstashApi,
    error::DispatchError,
    shape,
    tool::ToolKind,
    types::{ToolCall, ToolDef, ToolResult},
};

/// Holds the tool catalog and dispatches calls to the right handler.
///
/// Immutable once built: share it behind an `Arc` between the RPC loop and
/// the dashboard.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolKind>,
    defs: Vec<ToolDef>,
    thresholds: Thresholds,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl ToolRegistry {
    /// The twelve read-only tools.
    pub fn new(thresholds: Thresholds) -> Self {
        Self::from_kinds(ToolKind::CATALOG.to_vec(), thresholds)
    }

    /// Also register the mutating pipeline reload tool.
    pub fn with_management(self) -> Self {
        let mut tools = self.tools;
        if !tools.contains(&ToolKind::ReloadPipeline) {
            tools.push(ToolKind::ReloadPipeline);
        }
        Self::from_kinds(tools, self.thresholds)
    }

    fn from_kinds(tools: Vec<ToolKind>, thresholds: Thresholds) -> Self {
        let defs = tools.iter().map(|k| k.def()).collect();
        Self {
            tools,
            defs,
            thresholds,
        }
    }

    /// Retrieve a tool by name.
    pub fn get(&self, name: &str) -> Option<ToolKind> {
        self.tools.iter().copied().find(|k| k.name() == name)
    }

    /// All tool definitions, in catalog order.
    pub fn defs(&self) -> &[ToolDef] {
        &self.defs
    }

    /// Names of all registered tools.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|k| k.name()).collect()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// The `tools/list` result body.
    pub fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self.defs.iter().map(ToolDef::to_mcp).collect();
        json!({ "tools": tools })
    }

    /// Dispatch a `ToolCall` to the matching tool.
    ///
    /// Unknown tools and schema violations are protocol errors. Failures of the
    /// remote engine come back as a `ToolResult` with `is_error` set and a
    /// remediation hint in the text.
    pub fn call_tool(
        &self,
        call: &ToolCall,
        api: &dyn LogstashApi,
    ) -> Result<ToolResult, DispatchError> {
        let Some((kind, def)) = self
            .tools
            .iter()
            .copied()
            .zip(&self.defs)
            .find(|(k, _)| k.name() == call.name)
        else {
            warn!("[tools] unknown tool: {}", call.name);
            return Err(DispatchError::UnknownTool(call.name.clone()));
        };

        let args = def.validate(&call.arguments).and_then(|args| {
            kind.check(&args)?;
            Ok(args)
        });
        let args = match args {
            Ok(args) => args,
            Err(e) => {
                warn!("[tools] {e}");
                return Err(e);
            }
        };

        info!("[tools] call {} against {}", kind.name(), api.base_url());
        match kind.run(&args, api, &self.thresholds) {
            Ok(text) => Ok(ToolResult::ok(text)),
            Err(err) => {
                warn!("[tools] {} failed: {}", kind.name(), err);
                Ok(ToolResult::error(shape::diagnostic(
                    kind.name(),
                    api.base_url(),
                    &err,
                )))
            }
        }
    }
}
