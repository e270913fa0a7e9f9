//! The driver loop: resolve nodes, then run collection passes one-shot or on
//! an interval until a shutdown signal arrives.

use crate::{
    collector::MetricCollector,
    config::Config,
    dogstatsd::DogstatsdClient,
    fetch::HttpFetcher,
    node::NodeDescriptor,
    resolver::resolve_nodes,
};
use eyre::Result;
use futures::future::join_all;
use regex::Regex;
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::signal::unix::{
    signal,
    SignalKind,
};
use tracing::{
    error,
    info,
    warn,
};

pub async fn run(config: Config) -> Result<()> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;

    // Nodes are resolved once per process start; interval passes reuse the set.
    let nodes = resolve_nodes(&config.nsqd_http_addresses, &config.lookupd_http_addresses, &client).await?;
    info!(count = nodes.len(), "resolved nodes");
    if nodes.is_empty() {
        warn!("no nodes resolved, nothing to poll");
    }

    let statsd = Arc::new(
        DogstatsdClient::connect(&config.dogstatsd_address, &config.namespace, config.global_tags.clone()).await?,
    );
    let excluded = Arc::new(config.excluded_metrics.clone());

    match config.interval {
        None => {
            poll_once(&client, &nodes, &excluded, &statsd).await;
        }
        Some(interval) => {
            info!(interval = %humantime::format_duration(interval), "interval set");

            let mut sigint = signal(SignalKind::interrupt())?;
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut ticker = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        poll_once(&client, &nodes, &excluded, &statsd).await;
                    }
                    _ = sigint.recv() => {
                        info!(signal = "SIGINT", "exiting due to signal");
                        break;
                    }
                    _ = sigterm.recv() => {
                        info!(signal = "SIGTERM", "exiting due to signal");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

/// One collection pass over every node, concurrently. A single node failing
/// is logged and isolated; the other nodes still report.
async fn poll_once(
    client: &reqwest::Client,
    nodes: &[NodeDescriptor],
    excluded: &Arc<Vec<Regex>>,
    statsd: &Arc<DogstatsdClient>,
) {
    let mut handles = Vec::new();

    for node in nodes {
        let fetcher = HttpFetcher::new(client.clone(), &node.http_address());
        let collector = MetricCollector::new(node.clone(), Arc::clone(excluded));
        let statsd = Arc::clone(statsd);

        handles.push(tokio::spawn(async move {
            let address = collector.node_address();

            let metrics = match collector.collect(&fetcher).await {
                Ok(metrics) => metrics,
                Err(err) => {
                    error!(%address, error = %err, "collection failed");
                    return false;
                }
            };

            for metric in &metrics {
                if let Err(err) = statsd.gauge(metric).await {
                    error!(%address, error = %err, "failed to push gauge");
                    return false;
                }
            }

            info!(%address, count = metrics.len(), "pushed gauges");
            true
        }));
    }

    let results = join_all(handles).await;
    let failed = results.iter().filter(|result| !matches!(result, Ok(true))).count();
    if failed > 0 {
        warn!(failed, total = nodes.len(), "collection pass finished with failures");
    }
}
