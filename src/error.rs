use crate::{
    metrics::UnsupportedValue,
    node::NodeDescriptor,
};

/// Failures while fetching or decoding one API response.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-200 HTTP status.
    #[error("response code was {0}")]
    Status(u16),
    /// Non-200 `status_code` embedded in an otherwise successful response.
    #[error("response code was {0}")]
    Api(i64),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Node resolution failed. Carries the descriptors that were gathered before
/// the failure was observed, so the caller can report on partial progress.
#[derive(Debug, thiserror::Error)]
#[error("resolving nodes via {address} failed: {source}")]
pub struct ResolveError {
    pub address: String,
    #[source]
    pub source: FetchError,
    pub resolved: Vec<NodeDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("fetching stats from {address} failed: {source}")]
    Fetch {
        address: String,
        #[source]
        source: FetchError,
    },
    /// A stats field that cannot be coerced into a gauge. Aborts the whole
    /// collection pass: a malformed field means the daemon's schema has
    /// drifted and the remaining values cannot be trusted either.
    #[error("metric {metric}: {source}")]
    UnsupportedValue {
        metric: String,
        #[source]
        source: UnsupportedValue,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one --nsqd-http-address or --lookupd-http-address must be provided")]
    NoAddresses,
    #[error("{flag}: address {address:?} should not contain a scheme")]
    SchemeInAddress { flag: &'static str, address: String },
    #[error("--exclude-metrics pattern {pattern:?} is invalid: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
