use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, warn};
use serde_json::Value;

use crate::error::RemoteError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9600";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// One outbound call against the Logstash monitoring API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: vec![],
            body: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds `human=true` when `human` is set, as every stats endpoint accepts it.
    pub fn human(self, human: bool) -> Self {
        if human { self.query("human", "true") } else { self }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path plus encoded query string.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

/// A successful (2xx) answer from the remote engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    /// Parsed JSON body, or `Value::String` when the endpoint answered with text.
    pub payload: Value,
    pub latency: Duration,
    pub http_status: u16,
}

impl RemoteResponse {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            latency: Duration::ZERO,
            http_status: 200,
        }
    }
}

/// The interface tools use to reach the remote engine.
///
/// `HttpClient` talks to a real node; tests plug in a scripted fake.
pub trait LogstashApi: Send + Sync {
    /// Perform a single request. Never retries.
    fn call(&self, request: &ApiRequest) -> Result<RemoteResponse, RemoteError>;

    /// Base URL requests are resolved against, used in diagnostics.
    fn base_url(&self) -> &str;
}

/// Blocking HTTP implementation of `LogstashApi`.
pub struct HttpClient {
    base_url: String,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.path_and_query())
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else if err.is_body() || err.is_decode() {
            RemoteError::Decode {
                url: url.to_string(),
                message: format!("{:#}", anyhow::Error::new(err)),
            }
        } else {
            RemoteError::Connection {
                url: url.to_string(),
                message: format!("{:#}", anyhow::Error::new(err)),
            }
        }
    }
}

impl LogstashApi for HttpClient {
    fn call(&self, request: &ApiRequest) -> Result<RemoteResponse, RemoteError> {
        let url = self.url(request);
        debug!("[Logstash] {} {}", request.method.as_str(), url);

        let started = Instant::now();
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .map_err(|e| self.transport_error(&url, e))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| self.transport_error(&url, e))?;
        let latency = started.elapsed();

        debug!(
            "[Logstash] {} {} -> {} in {}ms",
            request.method.as_str(),
            url,
            status.as_u16(),
            latency.as_millis()
        );

        if !status.is_success() {
            warn!("[Logstash] {} answered {}: {}", url, status.as_u16(), text);
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let payload = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(RemoteResponse {
            payload,
            latency,
            http_status: status.as_u16(),
        })
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
