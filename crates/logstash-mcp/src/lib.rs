pub mod analyze;
pub mod client;
pub mod error;
pub mod registry;
pub mod shape;
pub mod tool;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Convenience re-exports so users only need `use logstash_mcp::*` or individual items.
pub use analyze::{Finding, OverallStatus, Report, Severity, Thresholds};
pub use client::{ApiRequest, HttpClient, LogstashApi, Method, RemoteResponse};
pub use error::{DispatchError, RemoteError};
pub use registry::ToolRegistry;
pub use tool::ToolKind;
pub use types::{ParamType, ToolCall, ToolContent, ToolDef, ToolParam, ToolResult};
