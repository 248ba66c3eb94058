//! Fixed decision table behind the health and backpressure checks.
//!
//! Rows are evaluated in a fixed order (connectivity, heap, filtered vs.
//! output, queue depth, flow backpressure) so the same metrics always give the
//! same ordered findings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::shape::queue_events;

/// Soft limits the analyzer compares against. All of them can be overridden
/// from the `[thresholds]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// `heap_used / heap_max` above which heap usage is flagged.
    pub heap_ratio: f64,
    /// Queued events per pipeline above which the queue is flagged.
    pub queue_events_ceiling: u64,
    /// Persisted queue `size / max_size` above which the queue is flagged.
    pub queue_fill_ratio: f64,
    pub backpressure_caution: f64,
    pub backpressure_warning: f64,
    pub backpressure_critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heap_ratio: 0.80,
            queue_events_ceiling: 10_000,
            queue_fill_ratio: 0.80,
            backpressure_caution: 0.01,
            backpressure_warning: 0.05,
            backpressure_critical: 0.10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
}

impl Finding {
    fn info(message: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            recommendation: recommendation.into(),
        }
    }

    fn warning(message: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            recommendation: recommendation.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Warning,
    Unhealthy,
}

impl OverallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Warning => "warning",
            OverallStatus::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub status: OverallStatus,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn has_warning(&self, needle: &str) -> bool {
        self.findings
            .iter()
            .any(|f| f.severity == Severity::Warning && f.message.contains(needle))
    }
}

/// Share of time the queue pushed back on inputs, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackpressureLevel {
    Healthy,
    Caution,
    Warning,
    Critical,
}

impl BackpressureLevel {
    pub fn classify(current: f64, t: &Thresholds) -> Self {
        if current > t.backpressure_critical {
            BackpressureLevel::Critical
        } else if current > t.backpressure_warning {
            BackpressureLevel::Warning
        } else if current > t.backpressure_caution {
            BackpressureLevel::Caution
        } else {
            BackpressureLevel::Healthy
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackpressureLevel::Healthy => "healthy",
            BackpressureLevel::Caution => "caution",
            BackpressureLevel::Warning => "warning",
            BackpressureLevel::Critical => "critical",
        }
    }
}

/// Why the node could not be reached, as reported by the connectivity check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityFailure {
    pub message: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineMetrics {
    pub id: String,
    pub filtered: u64,
    pub out: u64,
    pub queue_events: Option<u64>,
    pub queue_bytes: Option<u64>,
    pub queue_max_bytes: Option<u64>,
}

/// Signals extracted from the remote engine for one evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub connectivity: Option<ConnectivityFailure>,
    pub heap_ratio: Option<f64>,
    pub pipelines: Vec<PipelineMetrics>,
    pub flow_backpressure: Option<f64>,
}

impl Metrics {
    /// Heap ratio from `/_node/stats` or `/_node/stats/jvm`. Prefers the byte
    /// counts and falls back to `heap_used_percent`.
    pub fn heap_ratio_from(stats: &Value) -> Option<f64> {
        let mem = stats.pointer("/jvm/mem")?;
        let used = mem.get("heap_used_in_bytes").and_then(Value::as_f64);
        let max = mem.get("heap_max_in_bytes").and_then(Value::as_f64);
        match (used, max) {
            (Some(used), Some(max)) if max > 0.0 => Some(used / max),
            _ => mem
                .get("heap_used_percent")
                .and_then(Value::as_f64)
                .map(|p| p / 100.0),
        }
    }

    /// Per-pipeline counters from `/_node/stats/pipelines`, in remote order.
    pub fn pipelines_from(stats: &Value) -> Vec<PipelineMetrics> {
        let Some(pipelines) = stats.get("pipelines").and_then(Value::as_object) else {
            return vec![];
        };
        pipelines
            .iter()
            .map(|(id, p)| PipelineMetrics {
                id: id.clone(),
                filtered: p.pointer("/events/filtered").and_then(Value::as_u64).unwrap_or(0),
                out: p.pointer("/events/out").and_then(Value::as_u64).unwrap_or(0),
                queue_events: queue_events(p).and_then(Value::as_u64),
                queue_bytes: p.pointer("/queue/queue_size_in_bytes").and_then(Value::as_u64),
                queue_max_bytes: p
                    .pointer("/queue/max_queue_size_in_bytes")
                    .and_then(Value::as_u64),
            })
            .collect()
    }

    /// `flow.queue_backpressure.current` from `/_node/stats/flow`.
    pub fn flow_backpressure_from(flow: &Value) -> Option<f64> {
        flow.pointer("/flow/queue_backpressure/current")
            .and_then(Value::as_f64)
    }
}

/// Evaluate the decision table once.
pub fn analyze(metrics: &Metrics, t: &Thresholds) -> Report {
    if let Some(failure) = &metrics.connectivity {
        return Report {
            status: OverallStatus::Unhealthy,
            findings: vec![Finding::warning(
                format!("connectivity failure: {}", failure.message),
                failure.suggestion.clone(),
            )],
        };
    }

    let mut findings = vec![];

    if let Some(ratio) = metrics.heap_ratio {
        if ratio > t.heap_ratio {
            findings.push(Finding::warning(
                format!("high JVM heap usage: {:.1}% of max", ratio * 100.0),
                "Consider increasing the JVM heap size (-Xmx) or reducing in-flight batch sizes",
            ));
        }
    }

    for p in &metrics.pipelines {
        if p.filtered > 0 && p.out == 0 {
            findings.push(Finding::warning(
                format!(
                    "events filtered but not output in pipeline {} ({} filtered, 0 out)",
                    p.id, p.filtered
                ),
                format!("Check pipeline {} output configuration and downstream reachability", p.id),
            ));
        }
    }

    for p in &metrics.pipelines {
        let over_ceiling = p.queue_events.filter(|&n| n > t.queue_events_ceiling);
        let fill = match (p.queue_bytes, p.queue_max_bytes) {
            (Some(size), Some(max)) if max > 0 => Some(size as f64 / max as f64),
            _ => None,
        }
        .filter(|&r| r > t.queue_fill_ratio);

        let detail = match (over_ceiling, fill) {
            (Some(n), _) => format!("{n} events queued (ceiling {})", t.queue_events_ceiling),
            (None, Some(r)) => format!("persisted queue {:.1}% full", r * 100.0),
            (None, None) => continue,
        };
        findings.push(Finding::warning(
            format!("queue backpressure in pipeline {}: {detail}", p.id),
            format!(
                "Add workers to pipeline {} or speed up its outputs so the queue can drain",
                p.id
            ),
        ));
    }

    if let Some(current) = metrics.flow_backpressure {
        let percent = current * 100.0;
        match BackpressureLevel::classify(current, t) {
            BackpressureLevel::Critical => findings.push(Finding::warning(
                format!("queue backpressure critical: inputs blocked {percent:.2}% of the time"),
                "High backpressure detected; consider scaling workers or optimizing filters",
            )),
            BackpressureLevel::Warning => findings.push(Finding::warning(
                format!("queue backpressure elevated: inputs blocked {percent:.2}% of the time"),
                "Moderate backpressure detected; monitor closely and consider optimization",
            )),
            BackpressureLevel::Caution => findings.push(Finding::info(
                format!("slight queue backpressure: inputs blocked {percent:.2}% of the time"),
                "Normal under heavy load",
            )),
            BackpressureLevel::Healthy => {}
        }
    }

    let status = if findings.iter().any(|f| f.severity == Severity::Warning) {
        OverallStatus::Warning
    } else {
        OverallStatus::Healthy
    };

    if findings.is_empty() {
        findings.push(Finding::info("no issues detected", "No action needed"));
    }

    Report { status, findings }
}
