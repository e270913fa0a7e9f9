use clap::Parser;
use color_eyre::Result;
use nsq_dogstatsd::{
    config::Config,
    runner,
};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "nsq-to-dogstatsd")]
#[command(about = "Polls nsqd stats and pushes tagged gauges to a DogStatsD agent")]
#[command(version)]
struct Cli {
    /// <host>:<port> of an nsqd node to query stats for (repeatable)
    #[arg(long = "nsqd-http-address", value_name = "HOST:PORT")]
    nsqd_http_addresses: Vec<String>,

    /// <host>:<port> of an nsqlookupd to query nodes from (repeatable)
    #[arg(long = "lookupd-http-address", value_name = "HOST:PORT")]
    lookupd_http_addresses: Vec<String>,

    /// <host>:<port> of the DogStatsD agent
    #[arg(long, env = "DOGSTATSD_ADDRESS", default_value = "127.0.0.1:8125")]
    dogstatsd_address: String,

    /// Namespace prefixed to every metric name
    #[arg(long, default_value = "nsq")]
    namespace: String,

    /// Global tag added to every gauge, as key:value (repeatable)
    #[arg(long = "tag", value_name = "KEY:VALUE")]
    tags: Vec<String>,

    /// Exclude metrics whose name matches this regular expression (repeatable)
    #[arg(long = "exclude-metrics", value_name = "PATTERN")]
    exclude_metrics: Vec<String>,

    /// Interval between collection passes (e.g. "30s"); omit for a single pass
    #[arg(long, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Increase log verbosity (-v warn, -vv info, -vvv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(format!("nsq_dogstatsd={log_level},nsq_to_dogstatsd={log_level}"))
        .init();

    color_eyre::install()?;

    let config = Config::new(
        cli.nsqd_http_addresses,
        cli.lookupd_http_addresses,
        cli.dogstatsd_address,
        cli.namespace,
        cli.tags,
        &cli.exclude_metrics,
        cli.interval,
    )?;

    info!(
        nsqd = config.nsqd_http_addresses.len(),
        lookupd = config.lookupd_http_addresses.len(),
        "starting nsq-to-dogstatsd"
    );

    runner::run(config).await
}
