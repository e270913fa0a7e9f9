//! The nested stats document served by `nsqd /stats?format=json`.
//!
//! Shapes follow the daemon's JSON output: a runtime memory section plus an
//! ordered topic → channel → client hierarchy. Latency percentile samples
//! stay loosely typed (`serde_json::Value`) until numeric coercion, which is
//! where schema drift is caught.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsTree {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub health: String,
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub topics: Vec<TopicStats>,
    #[serde(default)]
    pub memory: MemoryStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryStats {
    #[serde(default)]
    pub heap_objects: u64,
    #[serde(default)]
    pub heap_idle_bytes: u64,
    #[serde(default)]
    pub heap_in_use_bytes: u64,
    #[serde(default)]
    pub heap_released_bytes: u64,
    #[serde(default)]
    pub gc_pause_usec_100: u64,
    #[serde(default)]
    pub gc_pause_usec_99: u64,
    #[serde(default)]
    pub gc_pause_usec_95: u64,
    #[serde(default)]
    pub next_gc_bytes: u64,
    #[serde(default)]
    pub gc_total_runs: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicStats {
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub depth: i64,
    #[serde(default)]
    pub backend_depth: i64,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub e2e_processing_latency: Option<E2eProcessingLatency>,
    #[serde(default)]
    pub channels: Vec<ChannelStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelStats {
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub depth: i64,
    #[serde(default)]
    pub backend_depth: i64,
    #[serde(default)]
    pub in_flight_count: i64,
    #[serde(default)]
    pub deferred_count: i64,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub requeue_count: u64,
    #[serde(default)]
    pub timeout_count: u64,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub e2e_processing_latency: Option<E2eProcessingLatency>,
    #[serde(default)]
    pub clients: Vec<ClientStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientStats {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub remote_address: String,
    #[serde(default)]
    pub state: i32,
    #[serde(default)]
    pub ready_count: i64,
    #[serde(default)]
    pub in_flight_count: i64,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub finish_count: u64,
    #[serde(default)]
    pub requeue_count: u64,
}

/// End-to-end processing latency, reported as `{quantile, value}` samples.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct E2eProcessingLatency {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub percentiles: Vec<HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_nested_stats_document() {
        let stats: StatsTree = serde_json::from_str(
            r#"{
              "version": "1.2.1",
              "health": "OK",
              "start_time": 1588284231,
              "topics": [
                {
                  "topic_name": "events",
                  "depth": 12,
                  "backend_depth": 0,
                  "message_count": 100,
                  "paused": false,
                  "e2e_processing_latency": {
                    "count": 100,
                    "percentiles": [
                      {"quantile": 0.99, "value": 1500}
                    ]
                  },
                  "channels": [
                    {
                      "channel_name": "consumers",
                      "depth": 3,
                      "in_flight_count": 2,
                      "paused": true,
                      "clients": [
                        {
                          "client_id": "worker-1",
                          "hostname": "worker-1.local",
                          "user_agent": "go-nsq/1.0.7",
                          "remote_address": "10.0.0.9:53311",
                          "state": 3,
                          "ready_count": 50
                        }
                      ]
                    }
                  ]
                }
              ],
              "memory": {
                "heap_objects": 20625,
                "heap_idle_bytes": 61161472,
                "gc_total_runs": 4
              }
            }"#,
        )
        .unwrap();

        assert_eq!(stats.topics.len(), 1);
        let topic = &stats.topics[0];
        assert_eq!(topic.topic_name, "events");
        assert!(!topic.paused);
        assert_eq!(topic.e2e_processing_latency.as_ref().unwrap().percentiles.len(), 1);

        let channel = &topic.channels[0];
        assert!(channel.paused);
        assert_eq!(channel.clients[0].client_id, "worker-1");
        assert_eq!(stats.memory.heap_objects, 20625);
        assert_eq!(stats.memory.gc_total_runs, 4);
    }

    #[test]
    fn absent_sections_default() {
        let stats: StatsTree = serde_json::from_str(r#"{"topics": []}"#).unwrap();
        assert!(stats.topics.is_empty());
        assert_eq!(stats.memory.heap_objects, 0);
        assert!(stats.health.is_empty());
    }
}
