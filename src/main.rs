//! Command-line interface for trace-replay
//!
//! # Usage Examples
//!
//! ```bash
//! # Steady load: 10 requesters, one request each per second
//! trace-replay access.trace --base-url http://localhost:8080 --tps 10
//!
//! # Replay 1000 records starting at record 500, stripping a path prefix
//! trace-replay access.trace --from 500 --for 1000 --strip /cdn --tps 10
//!
//! # Progressive load: 2, 5, 8 requests/second, one step every 10 seconds
//! trace-replay access.trace --tps 10 --start-tps 2 --progress-rate 3
//!
//! # Real-time replay of a trace that is still growing
//! trace-replay live.trace --realtime --protocol s3 --base-url s3://bucket/prefix
//! ```

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use trace_replay::{Engine, RunConfig, RunOpts};
use trace_replay_protocol::{ProtocolOptions, ProtocolRegistry};
use trace_replay_trace::TraceSource;
use tracing::info;

#[derive(Parser)]
#[command(name = "trace-replay")]
#[command(about = "Replay a request trace against a storage backend")]
#[command(version)]
struct Cli {
    /// Trace file to replay, or - for stdin
    trace: String,

    #[command(flatten)]
    opts: RunOpts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.opts.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = RunConfig::from(cli.opts);

    let registry = ProtocolRegistry::with_defaults();
    let options = ProtocolOptions {
        host_header: config.host_header.clone(),
    };
    let protocol = registry
        .create(&config.protocol, &options)
        .with_context(|| format!("Failed to set up protocol '{}'", config.protocol))?;

    let source = TraceSource::parse(&cli.trace);
    let input = source
        .open()
        .await
        .with_context(|| format!("Failed to open trace {}", source.display_name()))?;

    info!(
        "Replaying {} against {} ({})",
        source.display_name(),
        config.base_url,
        protocol.name()
    );

    let engine = Engine::new(config, Arc::clone(&protocol));
    let summary = engine.run(input, std::io::stdout()).await?;

    info!(
        "Run complete: {} requests ({} failed) from {} requesters",
        summary.processed, summary.failed, summary.requesters
    );
    Ok(())
}
