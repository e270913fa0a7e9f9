//! Node resolution: fan out one fetch task per configured address, fan the
//! results into a single aggregation task that owns the dedup set.
//!
//! Completion is signalled by channel closure once every producer task has
//! dropped its sender; there is no sentinel descriptor. The channel is
//! unbounded so tasks that are still in flight when the aggregator returns
//! early on an error can finish their send and exit instead of blocking
//! forever on an abandoned rendezvous.

use crate::{
    error::{
        FetchError,
        ResolveError,
    },
    fetch::{
        fetch_api,
        Fetch,
        HttpFetcher,
    },
    node::{
        NodeDescriptor,
        ProducerList,
    },
};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{
    debug,
    warn,
};

/// Queries every nsqd address for its own descriptor (`/info`) and every
/// lookupd address for the nodes it tracks (`/nodes`), concurrently, and
/// returns the deduplicated union. A direct node that is also registered with
/// a lookupd is kept once, keyed by its canonical `host:port`.
///
/// The first failure from any source is returned as soon as it is observed,
/// carrying whatever descriptors were gathered up to that point. Outstanding
/// queries are not cancelled; their late results are discarded.
pub async fn resolve_nodes(
    nsqd_addresses: &[String],
    lookupd_addresses: &[String],
    client: &reqwest::Client,
) -> Result<Vec<NodeDescriptor>, ResolveError> {
    let client = client.clone();
    resolve_with(nsqd_addresses, lookupd_addresses, move |address| {
        HttpFetcher::new(client.clone(), address)
    })
    .await
}

pub(crate) async fn resolve_with<F>(
    nsqd_addresses: &[String],
    lookupd_addresses: &[String],
    make_fetcher: impl Fn(&str) -> F,
) -> Result<Vec<NodeDescriptor>, ResolveError>
where
    F: Fetch + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Result<Vec<NodeDescriptor>, ResolveError>>();

    for address in nsqd_addresses {
        let fetcher = make_fetcher(address);
        let address = address.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = describe_node(&fetcher, &address).await;
            let _ = tx.send(result);
        });
    }

    for address in lookupd_addresses {
        let fetcher = make_fetcher(address);
        let address = address.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            debug!(%address, "resolving nodes from lookupd");
            let result = list_nodes(&fetcher, &address).await;
            let _ = tx.send(result);
        });
    }

    // All producing senders are cloned from this one; dropping it lets the
    // receive loop end once every task has reported.
    drop(tx);

    let mut seen: HashSet<String> = HashSet::new();
    let mut resolved: Vec<NodeDescriptor> = Vec::new();

    while let Some(result) = rx.recv().await {
        match result {
            Ok(nodes) => {
                for node in nodes {
                    if node.broadcast_address.is_empty() {
                        warn!(hostname = %node.hostname, "skipping node with empty broadcast address");
                        continue;
                    }

                    let address = node.http_address();
                    if !seen.insert(address.clone()) {
                        debug!(%address, "skipping duplicate address");
                        continue;
                    }

                    debug!(%address, "added address");
                    resolved.push(node);
                }
            }
            Err(mut error) => {
                error.resolved = resolved;
                return Err(error);
            }
        }
    }

    Ok(resolved)
}

async fn describe_node<F: Fetch>(fetcher: &F, address: &str) -> Result<Vec<NodeDescriptor>, ResolveError> {
    fetch_api::<NodeDescriptor, _>(fetcher, "info")
        .await
        .map(|node| vec![node])
        .map_err(|source| resolve_error(address, source))
}

async fn list_nodes<F: Fetch>(fetcher: &F, address: &str) -> Result<Vec<NodeDescriptor>, ResolveError> {
    fetch_api::<ProducerList, _>(fetcher, "nodes")
        .await
        .map(|list| list.producers)
        .map_err(|source| resolve_error(address, source))
}

fn resolve_error(address: &str, source: FetchError) -> ResolveError {
    ResolveError {
        address: address.to_string(),
        source,
        resolved: Vec::new(),
    }
}
