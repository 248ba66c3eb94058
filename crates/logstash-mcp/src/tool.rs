use log::info;
use serde_json::Value;

use crate::{
    analyze::{self, ConnectivityFailure, Metrics, Thresholds},
    client::{ApiRequest, LogstashApi},
    error::{DispatchError, RemoteError},
    shape,
    types::{Args, ParamType, ToolDef, ToolParam},
};

/// Every operation the adapter exposes, one variant per tool.
///
/// The variant carries its schema ([`ToolKind::def`]) and its handler
/// ([`ToolKind::run`]); there is no dynamic registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CheckConnectivity,
    NodeInfo,
    NodeStats,
    PipelinesStats,
    PipelineStats,
    HotThreads,
    Plugins,
    CheckBackpressure,
    HealthCheck,
    JvmStats,
    HealthReport,
    FlowMetrics,
    /// Mutating: only registered when management is enabled.
    ReloadPipeline,
}

impl ToolKind {
    /// The read-only catalog, in the order `tools/list` reports it.
    pub const CATALOG: [ToolKind; 12] = [
        ToolKind::CheckConnectivity,
        ToolKind::NodeInfo,
        ToolKind::NodeStats,
        ToolKind::PipelinesStats,
        ToolKind::PipelineStats,
        ToolKind::HotThreads,
        ToolKind::Plugins,
        ToolKind::CheckBackpressure,
        ToolKind::HealthCheck,
        ToolKind::JvmStats,
        ToolKind::HealthReport,
        ToolKind::FlowMetrics,
    ];

    pub const DEFAULT_HOT_THREADS: i64 = 3;

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::CheckConnectivity => "logstash_check_connectivity",
            ToolKind::NodeInfo => "logstash_node_info",
            ToolKind::NodeStats => "logstash_node_stats",
            ToolKind::PipelinesStats => "logstash_pipelines_stats",
            ToolKind::PipelineStats => "logstash_pipeline_stats",
            ToolKind::HotThreads => "logstash_hot_threads",
            ToolKind::Plugins => "logstash_plugins",
            ToolKind::CheckBackpressure => "check_backpressure",
            ToolKind::HealthCheck => "logstash_health_check",
            ToolKind::JvmStats => "logstash_jvm_stats",
            ToolKind::HealthReport => "logstash_health_report",
            ToolKind::FlowMetrics => "flow_metrics",
            ToolKind::ReloadPipeline => "logstash_reload_pipeline",
        }
    }

    pub fn is_mutating(self) -> bool {
        matches!(self, ToolKind::ReloadPipeline)
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::CheckConnectivity => {
                "Check connectivity to Logstash instance with detailed diagnostics"
            }
            ToolKind::NodeInfo => "Get Logstash node information including version and settings",
            ToolKind::NodeStats => {
                "Get comprehensive node statistics including JVM and process metrics"
            }
            ToolKind::PipelinesStats => "Get statistics for all Logstash pipelines",
            ToolKind::PipelineStats => "Get statistics for a specific pipeline",
            ToolKind::HotThreads => "Get hot threads information for performance debugging",
            ToolKind::Plugins => "List all installed Logstash plugins",
            ToolKind::CheckBackpressure => {
                "Check queue backpressure metrics to monitor pipeline performance and congestion"
            }
            ToolKind::HealthCheck => {
                "Perform comprehensive health check with analysis and recommendations"
            }
            ToolKind::JvmStats => "Get detailed JVM statistics for memory analysis",
            ToolKind::HealthReport => "Get detailed health report from Logstash",
            ToolKind::FlowMetrics => {
                "Get detailed flow metrics including throughput, backpressure, and worker concurrency. \
                 Reference: https://www.elastic.co/docs/api/doc/logstash/operation/operation-nodestatsflow"
            }
            ToolKind::ReloadPipeline => "Ask Logstash to reload a pipeline from its configuration",
        }
    }

    fn params(self) -> Vec<ToolParam> {
        let id = || ToolParam::required("id", ParamType::String, "Pipeline ID");
        match self {
            ToolKind::CheckConnectivity
            | ToolKind::NodeInfo
            | ToolKind::Plugins
            | ToolKind::HealthCheck
            | ToolKind::HealthReport => vec![],
            ToolKind::NodeStats
            | ToolKind::PipelinesStats
            | ToolKind::CheckBackpressure
            | ToolKind::JvmStats
            | ToolKind::FlowMetrics => vec![ToolParam::human()],
            ToolKind::PipelineStats => vec![id(), ToolParam::human()],
            ToolKind::HotThreads => vec![
                ToolParam::optional(
                    "threads",
                    ParamType::Integer,
                    "Number of hot threads to return",
                    Value::from(Self::DEFAULT_HOT_THREADS),
                ),
                ToolParam::human(),
            ],
            ToolKind::ReloadPipeline => vec![id()],
        }
    }

    pub fn def(self) -> ToolDef {
        ToolDef {
            name: self.name().into(),
            description: self.description().into(),
            params: self.params(),
        }
    }

    /// Checks that go beyond the schema's types.
    pub(crate) fn check(self, args: &Args) -> Result<(), DispatchError> {
        let invalid = |param: &str, detail: &str| DispatchError::InvalidArguments {
            tool: self.name().into(),
            params: vec![param.into()],
            detail: detail.into(),
        };
        if matches!(self, ToolKind::PipelineStats | ToolKind::ReloadPipeline)
            && args.str("id").is_some_and(|id| id.trim().is_empty())
        {
            return Err(invalid("id", "parameter 'id' must not be empty"));
        }
        if self == ToolKind::HotThreads && args.int("threads").is_some_and(|n| n < 1) {
            return Err(invalid("threads", "parameter 'threads' must be at least 1"));
        }
        Ok(())
    }

    /// Run the tool against the remote engine and shape its text.
    ///
    /// Multi-call tools stop at the first failing request.
    pub(crate) fn run(
        self,
        args: &Args,
        api: &dyn LogstashApi,
        thresholds: &Thresholds,
    ) -> Result<String, RemoteError> {
        let human = args.human();
        let fetch = |req: ApiRequest| api.call(&req).map(|r| r.payload);
        let pipeline_id = || urlencoding::encode(args.str("id").unwrap_or_default()).into_owned();

        let text = match self {
            ToolKind::CheckConnectivity => {
                let outcome = api.call(&ApiRequest::get("/_node"));
                shape::connectivity(api.base_url(), &outcome, human)
            }
            ToolKind::NodeInfo => shape::shape(self, &fetch(ApiRequest::get("/_node"))?, human),
            ToolKind::NodeStats => shape::shape(
                self,
                &fetch(ApiRequest::get("/_node/stats").human(human))?,
                human,
            ),
            ToolKind::PipelinesStats => shape::shape(
                self,
                &fetch(ApiRequest::get("/_node/stats/pipelines").human(human))?,
                human,
            ),
            ToolKind::PipelineStats => {
                let path = format!("/_node/stats/pipelines/{}", pipeline_id());
                shape::shape(self, &fetch(ApiRequest::get(path).human(human))?, human)
            }
            ToolKind::HotThreads => {
                let threads = args.int("threads").unwrap_or(Self::DEFAULT_HOT_THREADS);
                let req = ApiRequest::get("/_node/hot_threads")
                    .query("threads", threads)
                    .human(human);
                shape::shape(self, &fetch(req)?, human)
            }
            ToolKind::Plugins => shape::shape(self, &fetch(ApiRequest::get("/_node/plugins"))?, human),
            ToolKind::CheckBackpressure => {
                let flow = fetch(ApiRequest::get("/_node/stats/flow").human(human))?;
                let pipelines = fetch(ApiRequest::get("/_node/stats/pipelines").human(human))?;
                let metrics = Metrics {
                    pipelines: Metrics::pipelines_from(&pipelines),
                    flow_backpressure: Metrics::flow_backpressure_from(&flow),
                    ..Default::default()
                };
                let level = metrics
                    .flow_backpressure
                    .map(|c| analyze::BackpressureLevel::classify(c, thresholds));
                let report = analyze::analyze(&metrics, thresholds);
                shape::backpressure(&report, level, &flow, human)
            }
            ToolKind::HealthCheck => match api.call(&ApiRequest::get("/_node")) {
                Err(err) => {
                    let metrics = Metrics {
                        connectivity: Some(ConnectivityFailure {
                            message: err.to_string(),
                            suggestion: err.suggestion(api.base_url()),
                        }),
                        ..Default::default()
                    };
                    shape::health_check(&analyze::analyze(&metrics, thresholds), None)
                }
                Ok(node) => {
                    let stats = fetch(ApiRequest::get("/_node/stats"))?;
                    let pipelines = fetch(ApiRequest::get("/_node/stats/pipelines"))?;
                    let metrics = Metrics {
                        heap_ratio: Metrics::heap_ratio_from(&stats),
                        pipelines: Metrics::pipelines_from(&pipelines),
                        ..Default::default()
                    };
                    let report = analyze::analyze(&metrics, thresholds);
                    shape::health_check(&report, Some(&node.payload))
                }
            },
            ToolKind::JvmStats => shape::shape(
                self,
                &fetch(ApiRequest::get("/_node/stats/jvm").human(human))?,
                human,
            ),
            ToolKind::HealthReport => {
                shape::shape(self, &fetch(ApiRequest::get("/_health_report"))?, human)
            }
            ToolKind::FlowMetrics => shape::shape(
                self,
                &fetch(ApiRequest::get("/_node/stats").human(human))?,
                human,
            ),
            ToolKind::ReloadPipeline => {
                let id = args.str("id").unwrap_or_default();
                info!("[tools] reloading pipeline {id}");
                let path = format!("/_node/pipelines/{}/_reload", pipeline_id());
                let ack = fetch(ApiRequest::post(path))?;
                shape::reload(id, &ack)
            }
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_names_are_unique_and_read_only() {
        let names: HashSet<&str> = ToolKind::CATALOG.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), 12);
        assert!(ToolKind::CATALOG.iter().all(|k| !k.is_mutating()));
        assert!(ToolKind::ReloadPipeline.is_mutating());
    }

    #[test]
    fn hot_threads_schema_defaults() {
        let schema = ToolKind::HotThreads.def().input_schema();
        assert_eq!(schema["properties"]["threads"]["default"], 3);
        assert_eq!(schema["properties"]["threads"]["type"], "integer");
        assert_eq!(schema["properties"]["human"]["default"], true);
    }

    #[test]
    fn check_rejects_empty_id_and_zero_threads() {
        let def = ToolKind::PipelineStats.def();
        let args = def.validate(&serde_json::json!({ "id": "  " })).unwrap();
        assert!(ToolKind::PipelineStats.check(&args).is_err());

        let def = ToolKind::HotThreads.def();
        let args = def.validate(&serde_json::json!({ "threads": 0 })).unwrap();
        match ToolKind::HotThreads.check(&args) {
            Err(DispatchError::InvalidArguments { params, .. }) => assert_eq!(params, vec!["threads"]),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
