//! Node descriptors as returned by `nsqd /info` and `nsqlookupd /nodes`.

use serde::{
    Deserialize,
    Serialize,
};

/// One running nsqd, either configured directly or discovered through a
/// lookupd. Immutable once decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDescriptor {
    #[serde(default)]
    pub broadcast_address: String,
    #[serde(default)]
    pub http_port: u16,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
}

impl NodeDescriptor {
    /// Canonical `host:port` of the stats endpoint, also the dedup key during
    /// resolution. IPv6 hosts are bracketed.
    pub fn http_address(&self) -> String {
        if self.broadcast_address.contains(':') {
            format!("[{}]:{}", self.broadcast_address, self.http_port)
        } else {
            format!("{}:{}", self.broadcast_address, self.http_port)
        }
    }

    /// Base tags every gauge from this node inherits.
    pub fn tags(&self) -> Vec<String> {
        vec![format!("node:{}", self.hostname)]
    }
}

/// `data` payload of a lookupd `/nodes` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProducerList {
    #[serde(default)]
    pub producers: Vec<NodeDescriptor>,
}
