//! # nsq-dogstatsd
//!
//! Polls a set of nsqd daemons — configured directly or discovered through
//! nsqlookupd directory services — and pushes their per-topic, per-channel
//! and per-client statistics to a DogStatsD agent as tagged gauges.
//!
//! ## Architecture
//!
//! - **`config`**: validated runtime configuration.
//! - **`resolver`**: concurrent node resolution with canonical-address
//!   deduplication.
//! - **`collector`**: flattens one node's nested stats document into an
//!   ordered gauge stream with tag inheritance and exclusion filters.
//! - **`dogstatsd`**: UDP emission in the statsd line protocol.
//! - **`runner`**: the one-shot or interval-driven driver loop.
//! - **`fetch`** / **`node`** / **`stats`** / **`metrics`** / **`error`**:
//!   the HTTP collaborator, wire shapes and error taxonomy the above share.

pub mod collector;
pub mod config;
pub mod dogstatsd;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod node;
pub mod resolver;
pub mod runner;
pub mod stats;

pub use collector::MetricCollector;
pub use config::Config;
pub use dogstatsd::DogstatsdClient;
pub use metrics::Metric;
pub use node::NodeDescriptor;
pub use resolver::resolve_nodes;
