//! Turns raw Logstash monitoring JSON into the text returned to callers.
//!
//! Everything here is pure: the same payload and `human` flag always give the
//! same string. Missing fields render as [`NA`] instead of failing.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use crate::analyze::{BackpressureLevel, Finding, Report, Severity};
use crate::client::RemoteResponse;
use crate::error::RemoteError;
use crate::tool::ToolKind;

/// Marker for fields the remote engine did not report.
pub const NA: &str = "N/A";

const BYTE_UNITS: [&str; 6] = ["b", "kb", "mb", "gb", "tb", "pb"];

/// `536870912` → `512.0mb`. Values below 1kb keep integer precision.
pub fn human_bytes(bytes: f64) -> String {
    if bytes < 1024.0 {
        return format!("{}b", bytes as i64);
    }
    let mut value = bytes;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", value, BYTE_UNITS[unit])
}

/// `3200` → `3.2s`, `850` → `850ms`.
pub fn human_millis(millis: f64) -> String {
    const SECOND: f64 = 1_000.0;
    const MINUTE: f64 = 60.0 * SECOND;
    const HOUR: f64 = 60.0 * MINUTE;
    const DAY: f64 = 24.0 * HOUR;

    if millis < SECOND {
        format!("{}ms", millis as i64)
    } else if millis < MINUTE {
        format!("{:.1}s", millis / SECOND)
    } else if millis < HOUR {
        format!("{:.1}m", millis / MINUTE)
    } else if millis < DAY {
        format!("{:.1}h", millis / HOUR)
    } else {
        format!("{:.1}d", millis / DAY)
    }
}

/// Scalars print bare, containers print as compact JSON.
fn plain(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NA.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Line-oriented text builder with two-space section indentation.
pub(crate) struct Summary {
    human: bool,
    indent: usize,
    out: String,
}

impl Summary {
    pub(crate) fn new(human: bool) -> Self {
        Self {
            human,
            indent: 0,
            out: String::new(),
        }
    }

    pub(crate) fn line(&mut self, label: &str, value: impl AsRef<str>) -> &mut Self {
        let _ = writeln!(
            self.out,
            "{:width$}{}: {}",
            "",
            label,
            value.as_ref(),
            width = self.indent * 2
        );
        self
    }

    pub(crate) fn text(&mut self, text: impl AsRef<str>) -> &mut Self {
        let _ = writeln!(self.out, "{:width$}{}", "", text.as_ref(), width = self.indent * 2);
        self
    }

    pub(crate) fn field(&mut self, label: &str, value: Option<&Value>) -> &mut Self {
        let rendered = plain(value);
        self.line(label, rendered)
    }

    pub(crate) fn bytes(&mut self, label: &str, value: Option<&Value>) -> &mut Self {
        let rendered = match value.and_then(Value::as_f64) {
            Some(n) if self.human && n >= 0.0 => human_bytes(n),
            _ => plain(value),
        };
        self.line(label, rendered)
    }

    pub(crate) fn millis(&mut self, label: &str, value: Option<&Value>) -> &mut Self {
        let rendered = match value.and_then(Value::as_f64) {
            Some(n) if self.human && n >= 0.0 => human_millis(n),
            _ => plain(value),
        };
        self.line(label, rendered)
    }

    /// A field whose unit is inferred from its key suffix.
    pub(crate) fn keyed(&mut self, key: &str, value: Option<&Value>) -> &mut Self {
        if key.ends_with("_in_bytes") {
            self.bytes(key, value)
        } else if key.ends_with("_in_millis") {
            self.millis(key, value)
        } else {
            self.field(key, value)
        }
    }

    pub(crate) fn section(&mut self, title: impl AsRef<str>) -> &mut Self {
        self.text(title);
        self.indent += 1;
        self
    }

    /// Indent without a heading; close with [`Summary::end`].
    pub(crate) fn nest(&mut self) -> &mut Self {
        self.indent += 1;
        self
    }

    pub(crate) fn end(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    /// Render an arbitrary JSON object as nested sections.
    pub(crate) fn tree(&mut self, map: &Map<String, Value>) -> &mut Self {
        for (key, value) in map {
            match value {
                Value::Object(inner) if inner.is_empty() => {
                    self.line(key, "{}");
                }
                Value::Object(inner) => {
                    self.section(key).tree(inner).end();
                }
                Value::Array(items) if items.iter().any(Value::is_object) => {
                    self.section(key);
                    for item in items {
                        match item {
                            Value::Object(inner) => {
                                self.section("-").tree(inner).end();
                            }
                            other => {
                                self.text(format!("- {}", plain(Some(other))));
                            }
                        }
                    }
                    self.end();
                }
                other => {
                    self.keyed(key, Some(other));
                }
            }
        }
        self
    }

    pub(crate) fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}

/// Shape the raw payload of a single-endpoint tool.
///
/// Composite tools (connectivity, health check, backpressure) go through
/// [`connectivity`], [`health_check`] and [`backpressure`] instead; for them
/// this falls back to a generic tree rendering of the payload.
pub fn shape(kind: ToolKind, payload: &Value, human: bool) -> String {
    let mut s = Summary::new(human);
    match kind {
        ToolKind::NodeInfo => node_info(&mut s, payload),
        ToolKind::NodeStats => node_stats(&mut s, payload),
        ToolKind::PipelinesStats => pipelines(&mut s, payload, false),
        ToolKind::PipelineStats => pipelines(&mut s, payload, true),
        ToolKind::HotThreads => hot_threads(&mut s, payload),
        ToolKind::Plugins => plugins(&mut s, payload),
        ToolKind::JvmStats => jvm_stats(&mut s, payload),
        ToolKind::HealthReport => health_report(&mut s, payload),
        ToolKind::FlowMetrics => flow_metrics(&mut s, payload),
        ToolKind::CheckConnectivity
        | ToolKind::CheckBackpressure
        | ToolKind::HealthCheck
        | ToolKind::ReloadPipeline => generic(&mut s, payload),
    }
    s.finish()
}

fn generic(s: &mut Summary, payload: &Value) {
    match payload {
        Value::Object(map) => {
            s.tree(map);
        }
        other => {
            s.text(plain(Some(other)));
        }
    }
}

fn node_info(s: &mut Summary, p: &Value) {
    s.field("name", p.get("name"))
        .field("id", p.get("id"))
        .field("host", p.get("host"))
        .field("version", p.get("version"))
        .field("http address", p.get("http_address"))
        .field("status", p.get("status"))
        .field("jvm version", p.pointer("/jvm/version"))
        .bytes("jvm heap max", p.pointer("/jvm/mem/heap_max_in_bytes"));

    match p.get("pipelines").and_then(Value::as_object) {
        Some(pipelines) => {
            s.line("pipelines", pipelines.len().to_string());
            for (id, pipeline) in pipelines {
                s.section(format!("pipeline {id}"))
                    .field("workers", pipeline.get("workers"))
                    .field("batch size", pipeline.get("batch_size"))
                    .millis("batch delay", pipeline.get("batch_delay"))
                    .field("config reload automatic", pipeline.get("config_reload_automatic"))
                    .end();
            }
        }
        None => {
            s.line("pipelines", NA);
        }
    }
}

fn node_stats(s: &mut Summary, p: &Value) {
    s.field("version", p.get("version"))
        .field("status", p.get("status"))
        .millis("uptime", p.pointer("/jvm/uptime_in_millis"))
        .section("jvm")
        .bytes("heap used", p.pointer("/jvm/mem/heap_used_in_bytes"))
        .bytes("heap max", p.pointer("/jvm/mem/heap_max_in_bytes"))
        .field("heap used percent", p.pointer("/jvm/mem/heap_used_percent"))
        .field("threads", p.pointer("/jvm/threads/count"))
        .end()
        .section("process")
        .field("cpu percent", p.pointer("/process/cpu/percent"))
        .field("open file descriptors", p.pointer("/process/open_file_descriptors"))
        .end()
        .section("events")
        .field("in", p.pointer("/events/in"))
        .field("filtered", p.pointer("/events/filtered"))
        .field("out", p.pointer("/events/out"))
        .millis("duration", p.pointer("/events/duration_in_millis"))
        .end()
        .section("reloads")
        .field("successes", p.pointer("/reloads/successes"))
        .field("failures", p.pointer("/reloads/failures"))
        .end();

    let count = p
        .get("pipelines")
        .and_then(Value::as_object)
        .map(|m| m.len().to_string())
        .unwrap_or_else(|| NA.to_string());
    s.line("pipelines", count);
}

fn pipelines(s: &mut Summary, p: &Value, with_plugins: bool) {
    let Some(pipelines) = p.get("pipelines").and_then(Value::as_object) else {
        s.line("pipelines", NA);
        return;
    };
    if pipelines.is_empty() {
        s.line("pipelines", "0");
        return;
    }

    for (id, pipeline) in pipelines {
        s.section(format!("pipeline {id}"))
            .field("events in", pipeline.pointer("/events/in"))
            .field("events filtered", pipeline.pointer("/events/filtered"))
            .field("events out", pipeline.pointer("/events/out"))
            .millis("events duration", pipeline.pointer("/events/duration_in_millis"))
            .millis(
                "queue push duration",
                pipeline.pointer("/events/queue_push_duration_in_millis"),
            )
            .field("queue type", pipeline.pointer("/queue/type"))
            .field("queue events", queue_events(pipeline))
            .bytes("queue size", pipeline.pointer("/queue/queue_size_in_bytes"))
            .bytes("queue max size", pipeline.pointer("/queue/max_queue_size_in_bytes"))
            .field("reload successes", pipeline.pointer("/reloads/successes"))
            .field("reload failures", pipeline.pointer("/reloads/failures"));

        if with_plugins {
            for stage in ["inputs", "filters", "outputs"] {
                let Some(list) = pipeline.pointer(&format!("/plugins/{stage}")).and_then(Value::as_array)
                else {
                    continue;
                };
                s.section(stage);
                for plugin in list {
                    s.section(format!(
                        "{} ({})",
                        plain(plugin.get("name")),
                        plain(plugin.get("id"))
                    ))
                    .field("events in", plugin.pointer("/events/in"))
                    .field("events out", plugin.pointer("/events/out"))
                    .millis("duration", plugin.pointer("/events/duration_in_millis"))
                    .end();
                }
                s.end();
            }
        }
        s.end();
    }
}

/// Queue depth; persisted queues report `events_count`, older nodes `events`.
pub(crate) fn queue_events(pipeline: &Value) -> Option<&Value> {
    pipeline
        .pointer("/queue/events_count")
        .or_else(|| pipeline.pointer("/queue/events"))
}

fn hot_threads(s: &mut Summary, p: &Value) {
    if let Value::String(text) = p {
        s.text(text.trim_end());
        return;
    }
    let root = p.get("hot_threads").unwrap_or(p);
    s.field("time", root.get("time"))
        .field("busiest threads", root.get("busiest_threads"));
    match root.get("threads").and_then(Value::as_array) {
        Some(threads) => {
            s.section("threads");
            for t in threads {
                s.text(format!(
                    "- {} (id {}): cpu {}%, state {}",
                    plain(t.get("name")),
                    plain(t.get("thread_id")),
                    plain(t.get("percent_of_cpu_time")),
                    plain(t.get("state"))
                ));
            }
            s.end();
        }
        None => {
            s.line("threads", NA);
        }
    }
}

fn plugins(s: &mut Summary, p: &Value) {
    s.field("total", p.get("total"));
    if let Some(list) = p.get("plugins").and_then(Value::as_array) {
        for plugin in list {
            s.text(format!(
                "{} {}",
                plain(plugin.get("name")),
                plain(plugin.get("version"))
            ));
        }
    }
}

fn jvm_stats(s: &mut Summary, p: &Value) {
    let jvm = p.get("jvm").unwrap_or(p);
    s.millis("uptime", jvm.get("uptime_in_millis"))
        .field("threads", jvm.pointer("/threads/count"))
        .field("threads peak", jvm.pointer("/threads/peak_count"))
        .section("heap")
        .bytes("used", jvm.pointer("/mem/heap_used_in_bytes"))
        .bytes("committed", jvm.pointer("/mem/heap_committed_in_bytes"))
        .bytes("max", jvm.pointer("/mem/heap_max_in_bytes"))
        .field("used percent", jvm.pointer("/mem/heap_used_percent"))
        .end()
        .section("non-heap")
        .bytes("used", jvm.pointer("/mem/non_heap_used_in_bytes"))
        .bytes("committed", jvm.pointer("/mem/non_heap_committed_in_bytes"))
        .end();

    if let Some(pools) = jvm.pointer("/mem/pools").and_then(Value::as_object) {
        s.section("pools");
        for (name, pool) in pools {
            s.section(name)
                .bytes("used", pool.get("used_in_bytes"))
                .bytes("committed", pool.get("committed_in_bytes"))
                .bytes("max", pool.get("max_in_bytes"))
                .bytes("peak used", pool.get("peak_used_in_bytes"))
                .end();
        }
        s.end();
    }

    match jvm.pointer("/gc/collectors").and_then(Value::as_object) {
        Some(collectors) => {
            s.section("gc");
            for (name, gc) in collectors {
                s.section(name)
                    .field("collections", gc.get("collection_count"))
                    .millis("time", gc.get("collection_time_in_millis"))
                    .end();
            }
            s.end();
        }
        None => {
            s.line("gc", NA);
        }
    }
}

fn health_report(s: &mut Summary, p: &Value) {
    s.field("status", p.get("status"))
        .field("symptom", p.get("symptom"));
    if let Some(indicators) = p.get("indicators").and_then(Value::as_object) {
        indicator_tree(s, indicators);
    }
}

fn indicator_tree(s: &mut Summary, indicators: &Map<String, Value>) {
    for (name, indicator) in indicators {
        s.section(format!("indicator {name}"))
            .field("status", indicator.get("status"))
            .field("symptom", indicator.get("symptom"));

        if let Some(diagnosis) = indicator.get("diagnosis").and_then(Value::as_array) {
            for d in diagnosis {
                s.section("diagnosis")
                    .field("cause", d.get("cause"))
                    .field("action", d.get("action"))
                    .field("help", d.get("help_url"))
                    .end();
            }
        }
        if let Some(impacts) = indicator.get("impacts").and_then(Value::as_array) {
            for impact in impacts {
                s.line("impact", plain(impact.get("description")));
            }
        }
        if let Some(details) = indicator.get("details").and_then(Value::as_object) {
            s.section("details").tree(details).end();
        }
        if let Some(nested) = indicator.get("indicators").and_then(Value::as_object) {
            indicator_tree(s, nested);
        }
        s.end();
    }
}

fn flow_metrics(s: &mut Summary, p: &Value) {
    let flow = match p.get("flow").and_then(Value::as_object) {
        Some(flow) if !flow.is_empty() => flow,
        _ => {
            s.line("flow metrics", NA);
            return;
        }
    };

    s.field("timestamp", p.get("timestamp"));
    for (metric, values) in flow {
        s.section(metric)
            .field("current", values.get("current"))
            .field("last 1 minute", values.get("last_1_minute"))
            .field("lifetime", values.get("lifetime"))
            .end();
    }
    s.section("summary")
        .field("worker concurrency", p.pointer("/flow/worker_concurrency/current"))
        .field("queue backpressure", p.pointer("/flow/queue_backpressure/current"))
        .field("input throughput", p.pointer("/flow/input_throughput/current"))
        .field("output throughput", p.pointer("/flow/output_throughput/current"))
        .end();
}

/// Connectivity check output, whether or not the node answered.
pub fn connectivity(
    base_url: &str,
    outcome: &Result<RemoteResponse, RemoteError>,
    human: bool,
) -> String {
    let mut s = Summary::new(human);
    match outcome {
        Ok(resp) => {
            let latency = Value::from(resp.latency.as_millis() as u64);
            s.line("status", "connected")
                .line("url", base_url)
                .field("version", resp.payload.get("version"))
                .field("host", resp.payload.get("host"))
                .field("node id", resp.payload.get("id"))
                .field("node status", resp.payload.get("status"))
                .millis("response time", Some(&latency));
        }
        Err(err) => {
            let status = match err {
                RemoteError::Http { .. } | RemoteError::Decode { .. } => "error",
                RemoteError::Connection { .. } | RemoteError::Timeout { .. } => "unreachable",
            };
            s.line("status", status)
                .line("url", base_url)
                .line("error", err.to_string())
                .line("suggestion", err.suggestion(base_url));
        }
    }
    s.finish()
}

fn findings(s: &mut Summary, findings: &[Finding]) {
    s.section("findings");
    for f in findings {
        let tag = match f.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        s.text(format!("[{tag}] {}", f.message))
            .nest()
            .line("recommendation", &f.recommendation)
            .end();
    }
    s.end();
}

/// Health check output: overall verdict, node identity, findings.
pub fn health_check(report: &Report, node: Option<&Value>) -> String {
    let mut s = Summary::new(true);
    s.line("overall status", report.status.as_str());
    if let Some(node) = node {
        s.field("logstash version", node.get("version"))
            .field("host", node.get("host"));
    }
    findings(&mut s, &report.findings);
    s.finish()
}

/// Backpressure check output: flow-level backpressure trend plus findings.
pub fn backpressure(
    report: &Report,
    level: Option<BackpressureLevel>,
    flow: &Value,
    human: bool,
) -> String {
    let mut s = Summary::new(human);
    s.line("status", report.status.as_str())
        .line("backpressure level", level.map_or(NA, BackpressureLevel::as_str))
        .field("timestamp", flow.get("timestamp"));

    match flow.pointer("/flow/queue_backpressure") {
        Some(bp) => {
            let current = bp.get("current").and_then(Value::as_f64);
            let percent = match current {
                Some(c) => format!("{:.4}%", c * 100.0),
                None => NA.to_string(),
            };
            s.line("current backpressure", percent)
                .section("queue backpressure")
                .field("current", bp.get("current"))
                .field("last 1 minute", bp.get("last_1_minute"))
                .field("last 5 minutes", bp.get("last_5_minutes"))
                .field("last 15 minutes", bp.get("last_15_minutes"))
                .field("lifetime", bp.get("lifetime"))
                .end();
        }
        None => {
            s.line("queue backpressure", NA);
        }
    }
    findings(&mut s, &report.findings);
    s.finish()
}

/// Acknowledgement of a pipeline reload request.
pub fn reload(id: &str, ack: &Value) -> String {
    let mut s = Summary::new(true);
    s.line("pipeline", id).line("reload", "requested");
    match ack {
        Value::Object(map) if !map.is_empty() => {
            s.section("response").tree(map).end();
        }
        Value::Null | Value::Object(_) => {}
        other => {
            s.line("response", plain(Some(other)));
        }
    }
    s.finish()
}

/// Text returned in place of a result when the remote call failed.
pub fn diagnostic(tool: &str, base_url: &str, err: &RemoteError) -> String {
    let mut s = Summary::new(true);
    s.text(format!("{tool} failed"))
        .line("kind", err.kind())
        .line("url", base_url)
        .line("error", err.to_string())
        .line("suggestion", err.suggestion(base_url));
    s.finish()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node_stats_payload() -> Value {
        json!({
            "version": "8.13.0",
            "status": "green",
            "jvm": {
                "uptime_in_millis": 3200,
                "mem": {
                    "heap_used_in_bytes": 536870912u64,
                    "heap_max_in_bytes": 1073741824u64,
                    "heap_used_percent": 50
                },
                "threads": { "count": 42 }
            },
            "events": { "in": 100, "filtered": 100, "out": 99, "duration_in_millis": 850 },
            "pipelines": { "main": {}, "beats": {} }
        })
    }

    /// The value after `label: ` on the first line starting with `label`.
    fn value_of<'a>(text: &'a str, label: &str) -> &'a str {
        text.lines()
            .map(str::trim_start)
            .find_map(|l| l.strip_prefix(&format!("{label}: ")))
            .unwrap_or_else(|| panic!("no '{label}' line in:\n{text}"))
    }

    #[test]
    fn human_units() {
        assert_eq!(human_bytes(512.0), "512b");
        assert_eq!(human_bytes(536870912.0), "512.0mb");
        assert_eq!(human_bytes(1536.0), "1.5kb");
        assert_eq!(human_millis(850.0), "850ms");
        assert_eq!(human_millis(3200.0), "3.2s");
        assert_eq!(human_millis(90_000.0), "1.5m");
        assert_eq!(human_millis(2.0 * 3_600_000.0), "2.0h");
    }

    #[test]
    fn node_stats_human_uses_units() {
        let text = shape(ToolKind::NodeStats, &node_stats_payload(), true);
        assert_eq!(value_of(&text, "heap used"), "512.0mb");
        assert_eq!(value_of(&text, "uptime"), "3.2s");
        assert_eq!(value_of(&text, "duration"), "850ms");
        assert_eq!(value_of(&text, "pipelines"), "2");
    }

    #[test]
    fn raw_numbers_round_trip() {
        let payload = json!({
            "jvm": {
                "uptime_in_millis": 123456789012u64,
                "mem": { "heap_used_in_bytes": 987654321u64, "heap_used_percent": 12.75 }
            },
            "process": { "cpu": { "percent": 0.1 } }
        });
        let text = shape(ToolKind::NodeStats, &payload, false);

        let heap: u64 = value_of(&text, "heap used").parse().unwrap();
        let uptime: u64 = value_of(&text, "uptime").parse().unwrap();
        let percent: f64 = value_of(&text, "heap used percent").parse().unwrap();
        let cpu: f64 = value_of(&text, "cpu percent").parse().unwrap();
        assert_eq!(heap, 987654321);
        assert_eq!(uptime, 123456789012);
        assert_eq!(percent, 12.75);
        assert_eq!(cpu, 0.1);
    }

    #[test]
    fn missing_fields_render_na() {
        let text = shape(ToolKind::NodeStats, &json!({}), true);
        assert_eq!(value_of(&text, "version"), NA);
        assert_eq!(value_of(&text, "heap used"), NA);
        assert_eq!(value_of(&text, "pipelines"), NA);

        let text = shape(ToolKind::FlowMetrics, &json!({ "flow": {} }), true);
        assert_eq!(text, "flow metrics: N/A");
    }

    #[test]
    fn plugins_keep_remote_order() {
        let payload = json!({
            "total": 3,
            "plugins": [
                { "name": "logstash-input-beats", "version": "6.8.0" },
                { "name": "logstash-filter-grok", "version": "4.4.3" },
                { "name": "logstash-codec-json" }
            ]
        });
        let text = shape(ToolKind::Plugins, &payload, true);
        assert_eq!(
            text,
            "total: 3\nlogstash-input-beats 6.8.0\nlogstash-filter-grok 4.4.3\nlogstash-codec-json N/A"
        );
    }

    #[test]
    fn pipelines_preserve_remote_order() {
        let payload: Value = serde_json::from_str(
            r#"{"pipelines":{"zeta":{"events":{"in":1}},"alpha":{"events":{"in":2}}}}"#,
        )
        .unwrap();
        let text = shape(ToolKind::PipelinesStats, &payload, true);
        let zeta = text.find("pipeline zeta").unwrap();
        let alpha = text.find("pipeline alpha").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn single_pipeline_lists_plugins() {
        let payload = json!({
            "pipelines": {
                "main": {
                    "events": { "in": 10, "filtered": 10, "out": 10 },
                    "plugins": {
                        "filters": [
                            { "id": "grok-1", "name": "grok", "events": { "in": 10, "out": 10, "duration_in_millis": 1500 } }
                        ]
                    }
                }
            }
        });
        let text = shape(ToolKind::PipelineStats, &payload, true);
        assert!(text.contains("filters\n    grok (grok-1)"));
        assert!(text.contains("duration: 1.5s"));
    }

    #[test]
    fn hot_threads_text_passes_through() {
        let payload = json!("::: {node}\n   Hot threads at 2024-01-01\n");
        assert_eq!(
            shape(ToolKind::HotThreads, &payload, true),
            "::: {node}\n   Hot threads at 2024-01-01"
        );
    }

    #[test]
    fn hot_threads_json_enumerates_threads() {
        let payload = json!({
            "hot_threads": {
                "time": "2024-01-01T00:00:00Z",
                "busiest_threads": 2,
                "threads": [
                    { "name": "[main]>worker0", "thread_id": 31, "percent_of_cpu_time": 12.5, "state": "runnable" },
                    { "name": "[main]<beats", "thread_id": 27, "percent_of_cpu_time": 1.1, "state": "timed_waiting" }
                ]
            }
        });
        let text = shape(ToolKind::HotThreads, &payload, true);
        assert!(text.contains("- [main]>worker0 (id 31): cpu 12.5%, state runnable\n  - [main]<beats"));
    }

    #[test]
    fn health_report_walks_nested_indicators() {
        let payload = json!({
            "status": "yellow",
            "symptom": "1 indicator is concerning",
            "indicators": {
                "pipelines": {
                    "status": "yellow",
                    "indicators": {
                        "main": {
                            "status": "yellow",
                            "symptom": "pipeline is blocked",
                            "diagnosis": [{ "cause": "worker saturation", "action": "add workers" }]
                        }
                    }
                }
            }
        });
        let text = shape(ToolKind::HealthReport, &payload, true);
        assert!(text.contains("indicator pipelines\n  status: yellow"));
        assert!(text.contains("\n  indicator main\n"));
        assert!(text.contains("cause: worker saturation"));
    }

    #[test]
    fn connectivity_failure_has_suggestion() {
        let err = RemoteError::Connection {
            url: "http://localhost:9600/_node".into(),
            message: "connection refused".into(),
        };
        let text = connectivity("http://localhost:9600", &Err(err), true);
        assert_eq!(value_of(&text, "status"), "unreachable");
        assert!(value_of(&text, "suggestion").contains("http://localhost:9600"));
    }

    #[test]
    fn backpressure_reports_level_and_trend() {
        use crate::analyze::{OverallStatus, Thresholds, analyze, Metrics};

        let flow = json!({
            "timestamp": "2024-01-01T00:00:00Z",
            "flow": { "queue_backpressure": { "current": 0.12, "last_1_minute": 0.1, "lifetime": 0.01 } }
        });
        let metrics = Metrics {
            flow_backpressure: Metrics::flow_backpressure_from(&flow),
            ..Default::default()
        };
        let t = Thresholds::default();
        let report = analyze(&metrics, &t);
        assert_eq!(report.status, OverallStatus::Warning);

        let text = backpressure(&report, Some(BackpressureLevel::Critical), &flow, true);
        assert_eq!(value_of(&text, "backpressure level"), "critical");
        assert_eq!(value_of(&text, "current backpressure"), "12.0000%");
        assert_eq!(value_of(&text, "last 5 minutes"), NA);
        assert!(text.contains("[warning] queue backpressure critical"));
    }

    #[test]
    fn diagnostic_names_tool_and_remedy() {
        let err = RemoteError::Http {
            status: 404,
            body: "not found".into(),
        };
        let text = diagnostic("logstash_pipeline_stats", "http://ls:9600", &err);
        assert!(text.starts_with("logstash_pipeline_stats failed\n"));
        assert_eq!(value_of(&text, "kind"), "http");
        assert!(value_of(&text, "suggestion").contains("pipeline id"));
    }

    #[test]
    fn shaping_is_deterministic() {
        let payload = node_stats_payload();
        assert_eq!(
            shape(ToolKind::NodeStats, &payload, true),
            shape(ToolKind::NodeStats, &payload, true)
        );
    }
}
