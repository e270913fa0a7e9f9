//! Runtime configuration, validated up front and threaded explicitly through
//! the runner — no ambient globals.

use crate::error::ConfigError;
use regex::Regex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub nsqd_http_addresses: Vec<String>,
    pub lookupd_http_addresses: Vec<String>,
    pub dogstatsd_address: String,
    pub namespace: String,
    pub global_tags: Vec<String>,
    pub excluded_metrics: Vec<Regex>,
    /// Poll period. `None` means a single pass, then exit.
    pub interval: Option<Duration>,
}

impl Config {
    pub fn new(
        nsqd_http_addresses: Vec<String>,
        lookupd_http_addresses: Vec<String>,
        dogstatsd_address: String,
        namespace: String,
        global_tags: Vec<String>,
        exclude_patterns: &[String],
        interval: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        if nsqd_http_addresses.is_empty() && lookupd_http_addresses.is_empty() {
            return Err(ConfigError::NoAddresses);
        }

        check_addresses("--nsqd-http-address", &nsqd_http_addresses)?;
        check_addresses("--lookupd-http-address", &lookupd_http_addresses)?;

        let excluded_metrics = compile_patterns(exclude_patterns)?;

        Ok(Self {
            nsqd_http_addresses,
            lookupd_http_addresses,
            dogstatsd_address,
            namespace,
            global_tags,
            excluded_metrics,
            interval,
        })
    }
}

/// Addresses are `host:port`; the fetcher adds the scheme itself.
fn check_addresses(flag: &'static str, addresses: &[String]) -> Result<(), ConfigError> {
    for address in addresses {
        if address.starts_with("http://") || address.starts_with("https://") {
            return Err(ConfigError::SchemeInAddress {
                flag,
                address: address.clone(),
            });
        }
    }
    Ok(())
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
