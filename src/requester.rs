//! Requesters: the units that turn queued trace lines into backend requests.
//!
//! A requester ticks once per second and takes at most one line off the work
//! queue per tick, so N requesters give roughly N requests per second while
//! the queue has data.

use crate::config::RunConfig;
use crate::monitor::Completion;
use crate::EngineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use trace_replay_protocol::Protocol;
use trace_replay_trace::{Operation, TraceLine, TraceRecord};

/// Period between a requester's dequeues.
pub const TICK: Duration = Duration::from_secs(1);

/// Channels and collaborators shared by every requester of a run.
#[derive(Clone)]
pub struct RequesterContext {
    pub config: Arc<RunConfig>,
    pub protocol: Arc<dyn Protocol>,
    pub queue: async_channel::Receiver<TraceLine>,
    pub shutdown: CancellationToken,
    pub completions: mpsc::Sender<Completion>,
}

/// Why a requester stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequesterExit {
    /// The shutdown signal was raised.
    Shutdown,
    /// The work queue was closed and drained.
    EndOfStream,
}

pub struct Requester {
    id: usize,
    jitter: Duration,
    ctx: RequesterContext,
}

impl Requester {
    /// `jitter` delays the first tick so requesters started together do not
    /// fire in lockstep.
    pub fn new(id: usize, jitter: Duration, ctx: RequesterContext) -> Self {
        Self { id, jitter, ctx }
    }

    /// Tick until shutdown or end-of-stream.
    ///
    /// A malformed record or unsupported operator is returned as an error,
    /// which ends the whole run.
    pub async fn run(self) -> Result<RequesterExit, EngineError> {
        debug!(requester = self.id, jitter = ?self.jitter, "started a requester");
        tokio::time::sleep(self.jitter).await;

        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let line = tokio::select! {
                biased;
                _ = self.ctx.shutdown.cancelled() => {
                    debug!(requester = self.id, "shutdown raised, no more requests to send");
                    return Ok(RequesterExit::Shutdown);
                }
                next = self.ctx.queue.recv() => match next {
                    Ok(line) => line,
                    Err(_) => {
                        debug!(requester = self.id, "end of input, no more requests to send");
                        return Ok(RequesterExit::EndOfStream);
                    }
                },
            };

            self.handle(line).await?;
        }
    }

    async fn handle(&self, line: TraceLine) -> Result<(), EngineError> {
        let record = TraceRecord::try_from(line)?;

        match record.operation()? {
            Operation::Get => {
                if self.ctx.config.verbose {
                    info!(requester = self.id, "GET {}", record.path);
                }
                let dispatch = dispatch_get(
                    self.ctx.protocol.clone(),
                    self.ctx.config.clone(),
                    record.path,
                    self.ctx.completions.clone(),
                );
                if self.ctx.config.serialize {
                    dispatch.await;
                } else {
                    tokio::spawn(dispatch);
                }
            }
            Operation::Put => {
                // PUT is accepted but not replayed against the backend
                debug!(requester = self.id, "ignoring PUT {}", record.path);
            }
        }
        Ok(())
    }
}

/// Issue one GET and report its outcome.
async fn dispatch_get(
    protocol: Arc<dyn Protocol>,
    config: Arc<RunConfig>,
    path: String,
    completions: mpsc::Sender<Completion>,
) {
    let outcome = protocol.get(&config.base_url, &path).await;
    // A closed channel means the run is already over
    let _ = completions.send(Completion::new(path, outcome)).await;
}
