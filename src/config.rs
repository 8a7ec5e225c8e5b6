//! Run configuration.
//!
//! [`RunOpts`] is the command-line surface; it is converted once into an
//! immutable [`RunConfig`] that every component shares through an `Arc`.

use clap::Args;
use std::time::Duration;
use trace_replay_trace::{ReaderOptions, DEFAULT_QUEUE_CAPACITY};

/// Buffer of the completion channel between requests and the monitor.
pub const DEFAULT_COMPLETION_BUFFER: usize = 1000;

/// Requesters started in real-time mode.
pub const DEFAULT_REALTIME_REQUESTERS: usize = 3;

/// Time the full ramp keeps running before shutdown is raised.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(10);

/// Command-line options for a replay run.
#[derive(Args, Clone, Debug)]
pub struct RunOpts {
    /// Backend protocol (rest, s3, filesystem, ceph)
    #[arg(long, default_value = "rest", env = "TRACE_REPLAY_PROTOCOL")]
    pub protocol: String,

    /// Base address requests are issued against (URL, or s3://bucket[/prefix])
    #[arg(
        long,
        default_value = "http://localhost:8080",
        env = "TRACE_REPLAY_BASE_URL"
    )]
    pub base_url: String,

    /// Override the Host header sent to the backend
    #[arg(long, env = "TRACE_REPLAY_HOST_HEADER")]
    pub host_header: Option<String>,

    /// Target requests per second (requesters in steady mode, ceiling when ramping)
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    pub tps: i64,

    /// Requesters added per ramp step; enables the progressive profile when non-zero
    #[arg(long, default_value = "0")]
    pub progress_rate: usize,

    /// Requesters at the start of the ramp (defaults to --progress-rate)
    #[arg(long, default_value = "0")]
    pub start_tps: usize,

    /// Seconds between ramp steps
    #[arg(long, default_value = "10")]
    pub step_duration: u64,

    /// Records to skip at the start of the trace
    #[arg(long = "from", default_value = "0")]
    pub skip: u64,

    /// Maximum number of records to replay (default: whole trace)
    #[arg(long = "for")]
    pub limit: Option<u64>,

    /// Seconds without a completed request before the run halts
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Prefix removed once from every trace path
    #[arg(long)]
    pub strip: Option<String>,

    /// Follow the trace as it grows, replaying records as they arrive
    #[arg(long)]
    pub realtime: bool,

    /// Wait for each request before the requester's next tick
    #[arg(long)]
    pub serialize: bool,

    /// Log every dispatched request
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Seed for requester start-up jitter
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Capacity of the work queue between reader and requesters
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Requesters draining the queue in real-time mode
    #[arg(long, default_value_t = DEFAULT_REALTIME_REQUESTERS)]
    pub realtime_requesters: usize,

    /// Seconds the full ramp runs before requesters are stopped
    #[arg(long, default_value = "10")]
    pub settle: u64,
}

/// Immutable configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub protocol: String,
    pub base_url: String,
    pub host_header: Option<String>,
    pub verbose: bool,
    pub debug: bool,
    pub serialize: bool,
    pub realtime: bool,
    pub strip_prefix: Option<String>,
    pub timeout: Duration,
    pub step_duration: Duration,
    pub tps_target: i64,
    pub start_tps: usize,
    pub progress_rate: usize,
    pub skip: u64,
    pub limit: Option<u64>,
    pub seed: u64,
    pub queue_capacity: usize,
    pub completion_buffer: usize,
    pub realtime_requesters: usize,
    pub settle: Duration,
}

impl RunConfig {
    /// Reader options derived from this configuration.
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            skip: self.skip,
            limit: self.limit,
            strip_prefix: self.strip_prefix.clone(),
            tail: self.realtime,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            protocol: "rest".to_string(),
            base_url: "http://localhost:8080".to_string(),
            host_header: None,
            verbose: false,
            debug: false,
            serialize: false,
            realtime: false,
            strip_prefix: None,
            timeout: Duration::from_secs(30),
            step_duration: Duration::from_secs(10),
            tps_target: 1,
            start_tps: 0,
            progress_rate: 0,
            skip: 0,
            limit: None,
            seed: 42,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            completion_buffer: DEFAULT_COMPLETION_BUFFER,
            realtime_requesters: DEFAULT_REALTIME_REQUESTERS,
            settle: DEFAULT_SETTLE,
        }
    }
}

impl From<RunOpts> for RunConfig {
    fn from(opts: RunOpts) -> Self {
        Self {
            protocol: opts.protocol,
            base_url: opts.base_url,
            host_header: opts.host_header,
            verbose: opts.verbose,
            debug: opts.debug,
            serialize: opts.serialize,
            realtime: opts.realtime,
            strip_prefix: opts.strip.filter(|prefix| !prefix.is_empty()),
            timeout: Duration::from_secs(opts.timeout),
            step_duration: Duration::from_secs(opts.step_duration),
            tps_target: opts.tps,
            start_tps: opts.start_tps,
            progress_rate: opts.progress_rate,
            skip: opts.skip,
            limit: opts.limit,
            seed: opts.seed,
            queue_capacity: opts.queue_capacity,
            completion_buffer: DEFAULT_COMPLETION_BUFFER,
            realtime_requesters: opts.realtime_requesters,
            settle: Duration::from_secs(opts.settle),
        }
    }
}
