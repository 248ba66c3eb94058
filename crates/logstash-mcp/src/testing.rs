//! Scripted stand-in for a Logstash node, for tests in this and other crates.

use std::sync::Mutex;

use serde_json::Value;

use crate::{
    client::{ApiRequest, LogstashApi, Method, RemoteResponse},
    error::RemoteError,
};

type Route = (Method, String, Result<Value, RemoteError>);

/// Answers requests from a fixed route table and records every call.
///
/// Unscripted paths answer HTTP 404, like a real node would.
pub struct FakeLogstash {
    base_url: String,
    routes: Vec<Route>,
    refuse_all: bool,
    calls: Mutex<Vec<ApiRequest>>,
}

impl Default for FakeLogstash {
    fn default() -> Self {
        Self {
            base_url: "http://fake-logstash:9600".into(),
            routes: vec![],
            refuse_all: false,
            calls: Mutex::new(vec![]),
        }
    }
}

impl FakeLogstash {
    pub fn new() -> Self {
        Self::default()
    }

    /// A node that refuses every connection.
    pub fn refusing() -> Self {
        Self {
            refuse_all: true,
            ..Self::default()
        }
    }

    pub fn on_get(self, path: &str, payload: Value) -> Self {
        self.route(Method::Get, path, Ok(payload))
    }

    pub fn on_post(self, path: &str, payload: Value) -> Self {
        self.route(Method::Post, path, Ok(payload))
    }

    pub fn fail_get(self, path: &str, err: RemoteError) -> Self {
        self.route(Method::Get, path, Err(err))
    }

    /// Later scripts for the same method and path replace earlier ones.
    fn route(mut self, method: Method, path: &str, outcome: Result<Value, RemoteError>) -> Self {
        self.routes.retain(|(m, p, _)| !(*m == method && p == path));
        self.routes.push((method, path.to_string(), outcome));
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Requests received so far as `"GET /path?query"` strings.
    pub fn call_log(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|r| format!("{} {}", r.method.as_str(), r.path_and_query()))
            .collect()
    }
}

impl LogstashApi for FakeLogstash {
    fn call(&self, request: &ApiRequest) -> Result<RemoteResponse, RemoteError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if self.refuse_all {
            return Err(RemoteError::Connection {
                url: format!("{}{}", self.base_url, request.path),
                message: "Connection refused (os error 111)".into(),
            });
        }

        self.routes
            .iter()
            .find(|(method, path, _)| *method == request.method && *path == request.path)
            .map(|(_, _, outcome)| outcome.clone().map(RemoteResponse::new))
            .unwrap_or_else(|| {
                Err(RemoteError::Http {
                    status: 404,
                    body: format!("no handler for {}", request.path),
                })
            })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
