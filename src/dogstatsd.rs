//! Minimal DogStatsD client: encodes gauges into the statsd line protocol
//! with DataDog tag extensions and pushes them over UDP.
//!
//! Datagram shape: `<namespace>.<name>:<value>|g[|@<rate>][|#<tags>]`.

use crate::metrics::Metric;
use std::io;
use tokio::net::UdpSocket;

pub struct DogstatsdClient {
    socket: UdpSocket,
    namespace: String,
    global_tags: Vec<String>,
}

impl DogstatsdClient {
    /// Binds an ephemeral local socket and connects it to the agent address.
    pub async fn connect(address: &str, namespace: &str, global_tags: Vec<String>) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(address).await?;

        let namespace = if namespace.is_empty() || namespace.ends_with('.') {
            namespace.to_string()
        } else {
            format!("{namespace}.")
        };

        Ok(Self {
            socket,
            namespace,
            global_tags,
        })
    }

    pub async fn gauge(&self, metric: &Metric) -> io::Result<()> {
        let datagram = encode(&self.namespace, &self.global_tags, metric);
        self.socket.send(datagram.as_bytes()).await?;
        Ok(())
    }
}

fn encode(namespace: &str, global_tags: &[String], metric: &Metric) -> String {
    let mut datagram = format!("{namespace}{}:{}|g", metric.name, metric.value);

    // The fixed 1.0 sample rate is the protocol default and stays implicit.
    if (metric.rate - 1.0).abs() > f64::EPSILON {
        datagram.push_str(&format!("|@{}", metric.rate));
    }

    let mut separator = "|#";
    for tag in global_tags.iter().chain(metric.tags.iter()) {
        datagram.push_str(separator);
        datagram.push_str(tag);
        separator = ",";
    }

    datagram
}
