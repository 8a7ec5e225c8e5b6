//! trace-replay
//!
//! Replays a recorded request trace against a storage backend to generate
//! realistic load.
//!
//! # Overview
//!
//! A reader task streams trace lines onto a bounded work queue. A pool of
//! requesters, each ticking once per second, takes one line per tick and
//! issues the request through a [`Protocol`](trace_replay_protocol::Protocol)
//! backend, so the number of requesters is the request rate. The load
//! controller decides how many requesters run:
//!
//! - **Steady**: a fixed number for the whole run
//! - **Progressive**: a ramp that adds requesters every step period up to a
//!   ceiling, settles, then stops them
//! - **Real-time**: a few requesters draining a trace that is still being
//!   written
//!
//! Every completed request is printed to stdout in the trace's own column
//! layout. The run ends once no request has completed for the configured
//! timeout.
//!
//! # CLI Usage
//!
//! ```bash
//! # 20 requests/second against a web server
//! trace-replay access.trace --base-url http://localhost:8080 --tps 20
//!
//! # Ramp from 5 to 50 requests/second in steps of 5 every 30 seconds
//! trace-replay access.trace --tps 50 --start-tps 5 --progress-rate 5 --step-duration 30
//!
//! # Follow a live trace against S3
//! tail -f live.trace | trace-replay - --protocol s3 --base-url s3://load-test --realtime
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod output;
pub mod requester;

#[cfg(test)]
mod testing;

pub use config::{RunConfig, RunOpts};
pub use controller::{ramp_levels, LoadController, LoadProfile};
pub use engine::{Engine, RunSummary};
pub use error::EngineError;
pub use monitor::{Completion, CompletionCounts, LivenessMonitor};
pub use output::{RequestLog, HEADER};
pub use requester::{Requester, RequesterContext, RequesterExit, TICK};
