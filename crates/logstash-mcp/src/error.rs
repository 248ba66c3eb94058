use std::time::Duration;

use thiserror::Error;

/// JSON-RPC "invalid params" code, used for both unknown tools and bad arguments.
pub const INVALID_PARAMS: i64 = -32602;

/// Failures that are reported to the caller as protocol errors rather than
/// as a `ToolResult`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {detail}")]
    InvalidArguments {
        tool: String,
        /// Names of the offending parameters, in schema order.
        params: Vec<String>,
        detail: String,
    },
}

impl DispatchError {
    pub fn code(&self) -> i64 {
        INVALID_PARAMS
    }
}

/// Why a call to the remote engine did not produce a usable payload.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    #[error("failed to connect to Logstash at {url}: {message}")]
    Connection { url: String, message: String },

    #[error("request to {url} timed out after {}s", timeout.as_secs_f64())]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unreadable response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl RemoteError {
    /// Short machine-friendly failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteError::Connection { .. } => "connection",
            RemoteError::Timeout { .. } => "timeout",
            RemoteError::Http { .. } => "http",
            RemoteError::Decode { .. } => "decode",
        }
    }

    /// What the operator should try next.
    pub fn suggestion(&self, base_url: &str) -> String {
        match self {
            RemoteError::Connection { .. } => format!(
                "Verify Logstash is running and reachable at {base_url} \
                 (set LOGSTASH_API_BASE to point at another node)"
            ),
            RemoteError::Timeout { .. } => format!(
                "Logstash at {base_url} is slow to answer; check node load or raise timeout_secs"
            ),
            RemoteError::Http { status: 404, .. } => {
                "The resource was not found; check the pipeline id against logstash_node_info"
                    .to_string()
            }
            RemoteError::Http { .. } => {
                "Logstash rejected the request; check its logs for details".to_string()
            }
            RemoteError::Decode { .. } => {
                "The endpoint answered with an unexpected payload; check the Logstash version"
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_names_base_url_for_transport_failures() {
        let err = RemoteError::Connection {
            url: "http://localhost:9600/_node".into(),
            message: "connection refused".into(),
        };
        assert_eq!(err.kind(), "connection");
        assert!(err.suggestion("http://localhost:9600").contains("http://localhost:9600"));
    }

    #[test]
    fn timeout_message_reports_seconds() {
        let err = RemoteError::Timeout {
            url: "http://ls:9600/_node".into(),
            timeout: Duration::from_millis(2500),
        };
        assert_eq!(err.to_string(), "request to http://ls:9600/_node timed out after 2.5s");
    }
}
