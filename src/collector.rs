//! Flattens one node's stats document into an ordered stream of gauges.
//!
//! Emission order is node-level gauges first, then topics, channels and
//! clients in document order, each gauge tagged with the concatenation of its
//! ancestors' tags. A single pass, no state across calls.

use crate::{
    error::CollectError,
    fetch::{
        fetch_api,
        Fetch,
    },
    metrics::{
        GaugeValue,
        Metric,
    },
    node::NodeDescriptor,
    stats::{
        E2eProcessingLatency,
        StatsTree,
    },
};
use regex::Regex;
use std::{
    collections::HashMap,
    sync::Arc,
};
use tracing::debug;

pub struct MetricCollector {
    node: NodeDescriptor,
    excluded: Arc<Vec<Regex>>,
}

impl MetricCollector {
    pub fn new(node: NodeDescriptor, excluded: Arc<Vec<Regex>>) -> Self {
        Self { node, excluded }
    }

    pub fn node_address(&self) -> String {
        self.node.http_address()
    }

    /// Fetch `/stats?format=json` and flatten it. Any fetch or decode failure
    /// aborts with zero metrics; so does a value shape the coercion rules do
    /// not recognize.
    pub async fn collect<F>(&self, fetcher: &F) -> Result<Vec<Metric>, CollectError>
    where
        F: Fetch + ?Sized,
    {
        debug!(node = %self.node.hostname, "collecting metrics");

        let stats: StatsTree = fetch_api(fetcher, "stats?format=json")
            .await
            .map_err(|source| CollectError::Fetch {
                address: self.node.http_address(),
                source,
            })?;

        let mut metrics = Vec::new();
        let node_tags = self.node.tags();

        self.gauge(&mut metrics, "topic.count", stats.topics.len().into(), &node_tags);

        let memory = &stats.memory;
        self.gauge(&mut metrics, "memory.heap_objects", memory.heap_objects.into(), &node_tags);
        self.gauge(&mut metrics, "memory.heap_idle_bytes", memory.heap_idle_bytes.into(), &node_tags);
        self.gauge(&mut metrics, "memory.heap_in_use_bytes", memory.heap_in_use_bytes.into(), &node_tags);
        self.gauge(
            &mut metrics,
            "memory.heap_released_bytes",
            memory.heap_released_bytes.into(),
            &node_tags,
        );
        self.gauge(&mut metrics, "memory.gc_pause_usec_100", memory.gc_pause_usec_100.into(), &node_tags);
        self.gauge(&mut metrics, "memory.gc_pause_usec_99", memory.gc_pause_usec_99.into(), &node_tags);
        self.gauge(&mut metrics, "memory.gc_pause_usec_95", memory.gc_pause_usec_95.into(), &node_tags);
        self.gauge(&mut metrics, "memory.next_gc_bytes", memory.next_gc_bytes.into(), &node_tags);
        self.gauge(&mut metrics, "memory.gc_runs", memory.gc_total_runs.into(), &node_tags);

        for topic in &stats.topics {
            let mut topic_tags = node_tags.clone();
            topic_tags.push(format!("topic:{}", topic.topic_name));

            self.gauge(&mut metrics, "topic.channels", topic.channels.len().into(), &topic_tags);
            self.gauge(&mut metrics, "topic.depth", topic.depth.into(), &topic_tags);
            self.gauge(&mut metrics, "topic.backend_depth", topic.backend_depth.into(), &topic_tags);
            self.gauge(&mut metrics, "topic.messages", topic.message_count.into(), &topic_tags);
            self.gauge(&mut metrics, "topic.paused", topic.paused.into(), &topic_tags);

            if let Some(latency) = &topic.e2e_processing_latency {
                self.latency_gauges(&mut metrics, "topic", latency, &topic_tags)?;
            }

            for channel in &topic.channels {
                let mut channel_tags = topic_tags.clone();
                channel_tags.push(format!("channel:{}", channel.channel_name));

                self.gauge(&mut metrics, "channel.depth", channel.depth.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.backend_depth", channel.backend_depth.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.in_flight", channel.in_flight_count.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.deferred", channel.deferred_count.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.messages", channel.message_count.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.requeued", channel.requeue_count.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.timed_out", channel.timeout_count.into(), &channel_tags);
                self.gauge(&mut metrics, "channel.clients", channel.clients.len().into(), &channel_tags);
                self.gauge(&mut metrics, "channel.paused", channel.paused.into(), &channel_tags);

                if let Some(latency) = &channel.e2e_processing_latency {
                    self.latency_gauges(&mut metrics, "channel", latency, &channel_tags)?;
                }

                for client in &channel.clients {
                    let mut client_tags = channel_tags.clone();
                    client_tags.push(format!("client_id:{}", client.client_id));
                    client_tags.push(format!("client_agent:{}", client.user_agent));
                    client_tags.push(format!("client_hostname:{}", client.hostname));
                    client_tags.push(format!("client_address:{}", client.remote_address));

                    self.gauge(&mut metrics, "client.state", client.state.into(), &client_tags);
                    self.gauge(&mut metrics, "client.ready_count", client.ready_count.into(), &client_tags);
                    self.gauge(&mut metrics, "client.in_flight", client.in_flight_count.into(), &client_tags);
                    self.gauge(&mut metrics, "client.messages", client.message_count.into(), &client_tags);
                    self.gauge(&mut metrics, "client.finished", client.finish_count.into(), &client_tags);
                    self.gauge(&mut metrics, "client.requeued", client.requeue_count.into(), &client_tags);
                }
            }
        }

        debug!(node = %self.node.hostname, count = metrics.len(), "collected metrics");

        Ok(metrics)
    }

    /// One gauge per percentile sample, named by its quantile.
    fn latency_gauges(
        &self,
        out: &mut Vec<Metric>,
        prefix: &str,
        latency: &E2eProcessingLatency,
        tags: &[String],
    ) -> Result<(), CollectError> {
        for sample in &latency.percentiles {
            let quantile = self
                .sample_field(sample, "quantile", prefix)?
                .as_f64();
            let name = format!("{prefix}.e2e_processing_latency_{quantile:.6}");
            let value = self.sample_field(sample, "value", &name)?;
            self.gauge(out, &name, value, tags);
        }
        Ok(())
    }

    fn sample_field(
        &self,
        sample: &HashMap<String, serde_json::Value>,
        key: &str,
        metric: &str,
    ) -> Result<GaugeValue, CollectError> {
        let raw = sample.get(key).unwrap_or(&serde_json::Value::Null);
        GaugeValue::try_from(raw).map_err(|source| CollectError::UnsupportedValue {
            metric: format!("{metric} ({key})"),
            source,
        })
    }

    fn gauge(&self, out: &mut Vec<Metric>, name: &str, value: GaugeValue, tags: &[String]) {
        if self.excluded.iter().any(|filter| filter.is_match(name)) {
            debug!(name, "skipping excluded metric");
            return;
        }

        out.push(Metric::gauge(name, value, tags.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    struct StaticFetcher(String);

    #[async_trait]
    impl Fetch for StaticFetcher {
        async fn fetch(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl Fetch for FailingFetcher {
        async fn fetch(&self, _path: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Status(502))
        }
    }

    fn node() -> NodeDescriptor {
        NodeDescriptor {
            broadcast_address: "127.0.0.1".into(),
            http_port: 4151,
            hostname: "localhost".into(),
            ..Default::default()
        }
    }

    fn collector(patterns: &[&str]) -> MetricCollector {
        let excluded = patterns.iter().map(|p| Regex::new(p).unwrap()).collect();
        MetricCollector::new(node(), Arc::new(excluded))
    }

    fn envelope(data: &str) -> String {
        format!(r#"{{"status_code": 200, "status_txt": "OK", "data": {data}}}"#)
    }

    const NESTED_STATS: &str = r#"{
      "topics": [
        {
          "topic_name": "events",
          "depth": 12,
          "backend_depth": 2,
          "message_count": 100,
          "paused": false,
          "channels": [
            {
              "channel_name": "consumers",
              "depth": 3,
              "backend_depth": 0,
              "in_flight_count": 2,
              "deferred_count": 1,
              "message_count": 97,
              "requeue_count": 5,
              "timeout_count": 1,
              "paused": true,
              "clients": [
                {
                  "client_id": "worker-1",
                  "hostname": "worker-1.local",
                  "user_agent": "go-nsq/1.0.7",
                  "remote_address": "10.0.0.9:53311",
                  "state": 3,
                  "ready_count": 50,
                  "in_flight_count": 2,
                  "message_count": 40,
                  "finish_count": 38,
                  "requeue_count": 2
                }
              ]
            }
          ]
        },
        {
          "topic_name": "audit",
          "depth": 0,
          "message_count": 1,
          "paused": true,
          "channels": []
        }
      ],
      "memory": {"heap_objects": 20625}
    }"#;

    #[tokio::test]
    async fn zero_topics_emit_node_level_gauges_only() {
        let fetcher = StaticFetcher(envelope(r#"{"topics": [], "memory": {}}"#));
        let metrics = collector(&[]).collect(&fetcher).await.unwrap();

        // topic.count plus the nine memory gauges.
        assert_eq!(metrics.len(), 10);
        assert_eq!(metrics[0].name, "topic.count");
        assert_eq!(metrics[0].value, 0.0);
        for metric in &metrics {
            assert_eq!(metric.tags, vec!["node:localhost".to_string()]);
        }
    }

    #[tokio::test]
    async fn memory_gauges_carry_document_values() {
        let fetcher = StaticFetcher(envelope(
            r#"{
              "topics": [],
              "memory": {
                "heap_objects": 20625,
                "heap_idle_bytes": 61161472,
                "heap_in_use_bytes": 4661248,
                "heap_released_bytes": 0,
                "gc_pause_usec_100": 4113,
                "gc_pause_usec_99": 3001,
                "gc_pause_usec_95": 1777,
                "next_gc_bytes": 65011952,
                "gc_total_runs": 6
              }
            }"#,
        ));
        let metrics = collector(&[]).collect(&fetcher).await.unwrap();

        let by_name: HashMap<&str, f64> = metrics.iter().map(|m| (m.name.as_str(), m.value)).collect();
        assert_eq!(by_name["memory.heap_objects"], 20625.0);
        assert_eq!(by_name["memory.gc_pause_usec_95"], 1777.0);
        assert_eq!(by_name["memory.next_gc_bytes"], 65011952.0);
        assert_eq!(by_name["memory.gc_runs"], 6.0);
    }

    #[tokio::test]
    async fn nesting_order_is_preserved() {
        let fetcher = StaticFetcher(envelope(NESTED_STATS));
        let metrics = collector(&[]).collect(&fetcher).await.unwrap();
        let names: Vec<&str> = metrics.iter().map(|m| m.name.as_str()).collect();

        // Channel gauges of topic one come strictly before topic two's gauges.
        let first_channel = names.iter().position(|n| *n == "channel.depth").unwrap();
        let second_topic = names
            .iter()
            .enumerate()
            .filter(|(_, n)| **n == "topic.depth")
            .map(|(i, _)| i)
            .nth(1)
            .unwrap();
        assert!(first_channel < second_topic);

        // Clients come after their channel's own gauges.
        let client_state = names.iter().position(|n| *n == "client.state").unwrap();
        assert!(first_channel < client_state);
        assert!(client_state < second_topic);
    }

    #[tokio::test]
    async fn client_tags_concatenate_all_ancestors_in_order() {
        let fetcher = StaticFetcher(envelope(NESTED_STATS));
        let metrics = collector(&[]).collect(&fetcher).await.unwrap();

        let client_metric = metrics.iter().find(|m| m.name == "client.state").unwrap();
        assert_eq!(
            client_metric.tags,
            vec![
                "node:localhost".to_string(),
                "topic:events".to_string(),
                "channel:consumers".to_string(),
                "client_id:worker-1".to_string(),
                "client_agent:go-nsq/1.0.7".to_string(),
                "client_hostname:worker-1.local".to_string(),
                "client_address:10.0.0.9:53311".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn paused_flags_coerce_to_zero_and_one() {
        let fetcher = StaticFetcher(envelope(NESTED_STATS));
        let metrics = collector(&[]).collect(&fetcher).await.unwrap();

        let topic_paused: Vec<f64> = metrics.iter().filter(|m| m.name == "topic.paused").map(|m| m.value).collect();
        assert_eq!(topic_paused, vec![0.0, 1.0]);

        let channel_paused = metrics.iter().find(|m| m.name == "channel.paused").unwrap();
        assert_eq!(channel_paused.value, 1.0);
    }

    #[tokio::test]
    async fn exclusion_filter_drops_matching_gauges_only() {
        let fetcher = StaticFetcher(envelope(NESTED_STATS));
        let metrics = collector(&[r"^channel\."]).collect(&fetcher).await.unwrap();

        assert!(metrics.iter().all(|m| !m.name.starts_with("channel.")));
        assert!(metrics.iter().any(|m| m.name == "topic.depth"));
        assert!(metrics.iter().any(|m| m.name == "client.state"));
        assert!(metrics.iter().any(|m| m.name == "memory.heap_objects"));
    }

    #[tokio::test]
    async fn latency_percentiles_emit_one_gauge_per_sample() {
        let fetcher = StaticFetcher(envelope(
            r#"{
              "topics": [
                {
                  "topic_name": "events",
                  "e2e_processing_latency": {
                    "count": 100,
                    "percentiles": [
                      {"quantile": 0.99, "value": 1500},
                      {"quantile": 0.95, "value": 1100}
                    ]
                  },
                  "channels": []
                }
              ],
              "memory": {}
            }"#,
        ));
        let metrics = collector(&[]).collect(&fetcher).await.unwrap();

        let p99 = metrics
            .iter()
            .find(|m| m.name == "topic.e2e_processing_latency_0.990000")
            .unwrap();
        assert_eq!(p99.value, 1500.0);
        assert_eq!(p99.tags, vec!["node:localhost".to_string(), "topic:events".to_string()]);

        assert!(metrics.iter().any(|m| m.name == "topic.e2e_processing_latency_0.950000"));
    }

    #[tokio::test]
    async fn unsupported_percentile_shape_aborts_the_pass() {
        let fetcher = StaticFetcher(envelope(
            r#"{
              "topics": [
                {
                  "topic_name": "events",
                  "e2e_processing_latency": {
                    "percentiles": [{"quantile": 0.99, "value": "fast"}]
                  },
                  "channels": []
                }
              ],
              "memory": {}
            }"#,
        ));
        let err = collector(&[]).collect(&fetcher).await.unwrap_err();

        assert!(matches!(err, CollectError::UnsupportedValue { .. }));
    }

    #[tokio::test]
    async fn fetch_failure_produces_no_metrics() {
        let err = collector(&[]).collect(&FailingFetcher).await.unwrap_err();
        match err {
            CollectError::Fetch { address, source } => {
                assert_eq!(address, "127.0.0.1:4151");
                assert_eq!(source.to_string(), "response code was 502");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn embedded_error_status_produces_no_metrics() {
        let fetcher = StaticFetcher(r#"{"status_code": 403, "status_txt": "FORBIDDEN"}"#.to_string());
        let err = collector(&[]).collect(&fetcher).await.unwrap_err();
        assert!(matches!(
            err,
            CollectError::Fetch {
                source: FetchError::Api(403),
                ..
            }
        ));
    }
}
