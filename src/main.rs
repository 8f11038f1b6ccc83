use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use subprobe::node::geo::GeoConfig;
use subprobe::node::prober::ProberConfig;
use subprobe::pipeline::{self, PipelineConfig};
use subprobe::subscription::fetcher::{collect_subscribe_urls, FetchConfig};

/// Probe proxy subscription nodes and build a geo-enriched latency report
#[derive(Parser)]
#[command(name = "subprobe")]
#[command(about = "Probe proxy subscription nodes and build a geo-enriched latency report")]
struct Cli {
    /// Subscription URLs (can specify multiple; overrides the URL file and
    /// the SUBSCRIBE_URL environment variable)
    #[arg(short, long)]
    url: Vec<String>,

    /// File containing subscription URLs, one per line
    #[arg(short = 'f', long, default_value = "urls.txt")]
    url_file: PathBuf,

    /// Output file for the JSON report
    #[arg(short, long, default_value = "nodes.json")]
    output: PathBuf,

    /// Number of concurrent TCP probes
    #[arg(short = 'n', long, default_value = "20")]
    concurrency: usize,

    /// Probe connect timeout in seconds
    #[arg(long, default_value = "3")]
    timeout: u64,

    /// Geolocation batch API endpoint
    #[arg(long, default_value = "http://ip-api.com/batch")]
    geo_api: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("subprobe=info")),
        )
        .init();

    let cli = Cli::parse();

    let config = PipelineConfig {
        urls: collect_subscribe_urls(&cli.url, &cli.url_file),
        output: cli.output,
        fetch: FetchConfig::new(),
        prober: ProberConfig::new()
            .with_concurrency(cli.concurrency)
            .with_timeout(Duration::from_secs(cli.timeout)),
        geo: GeoConfig::new().with_batch_url(cli.geo_api),
    };

    println!("Starting subprobe...");
    pipeline::run(config).await?;

    Ok(())
}
