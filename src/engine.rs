//! One replay run, end to end.
//!
//! The engine wires the reader, the load controller and the requesters
//! together, then drives the completion loop itself: every completion is
//! written to the request log and pushes back the inactivity deadline. A run
//! ends normally once no request has completed for the configured timeout,
//! and unsuccessfully on the first fatal error from any task.

use crate::config::RunConfig;
use crate::controller::{LoadController, LoadProfile};
use crate::monitor::{Completion, LivenessMonitor};
use crate::output::RequestLog;
use crate::requester::RequesterContext;
use crate::EngineError;
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trace_replay_protocol::Protocol;
use trace_replay_trace::{TraceError, TraceReader};

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Requests that reached a terminal outcome.
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Requesters started over the whole run.
    pub requesters: usize,
    /// Records the reader queued, if it finished before the run ended.
    pub records_queued: Option<u64>,
}

pub struct Engine {
    config: Arc<RunConfig>,
    protocol: Arc<dyn Protocol>,
}

impl Engine {
    pub fn new(config: RunConfig, protocol: Arc<dyn Protocol>) -> Self {
        Self {
            config: Arc::new(config),
            protocol,
        }
    }

    /// Replay `input`, writing one line per completed request to `output`.
    ///
    /// The load profile is validated and the backend prepared before any
    /// task is started.
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<RunSummary, EngineError>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: Write,
    {
        let profile = LoadProfile::select(&self.config)?;
        debug!(?profile, protocol = self.protocol.name(), "selected load profile");

        self.protocol
            .prepare(&self.config.base_url)
            .await
            .map_err(EngineError::Prepare)?;

        let shutdown = CancellationToken::new();
        let (queue_tx, queue_rx) = async_channel::bounded(self.config.queue_capacity);
        let (completion_tx, completion_rx) = mpsc::channel(self.config.completion_buffer);
        let (active_tx, active_rx) = watch::channel(0);

        let mut log = RequestLog::new(output);
        log.write_header()?;

        let reader = TraceReader::new(input, self.config.reader_options(), shutdown.clone());
        let reader = tokio::spawn(reader.run(queue_tx));

        let ctx = RequesterContext {
            config: self.config.clone(),
            protocol: self.protocol.clone(),
            queue: queue_rx,
            shutdown: shutdown.clone(),
            completions: completion_tx,
        };
        let controller = tokio::spawn(LoadController::new(profile, ctx, active_tx).run());

        let mut tasks = Tasks {
            reader,
            controller,
            reader_done: false,
            controller_done: false,
            records_queued: None,
        };
        let result = self.supervise(&mut tasks, completion_rx, &mut log).await;

        shutdown.cancel();
        tasks.reader.abort();
        tasks.controller.abort();

        let counts = result?;
        let requesters = *active_rx.borrow();
        Ok(RunSummary {
            processed: counts.processed,
            succeeded: counts.succeeded,
            failed: counts.failed,
            requesters,
            records_queued: tasks.records_queued,
        })
    }

    /// Consume completions until the inactivity deadline passes or a task
    /// reports a fatal error.
    async fn supervise<W: Write>(
        &self,
        tasks: &mut Tasks,
        mut completions: mpsc::Receiver<Completion>,
        log: &mut RequestLog<W>,
    ) -> Result<crate::monitor::CompletionCounts, EngineError> {
        let mut monitor = LivenessMonitor::new(self.config.timeout);

        loop {
            // Completions already buffered count before the deadline does
            tokio::select! {
                biased;
                Some(completion) = completions.recv() => {
                    monitor.observe(&completion);
                    record(log, completion)?;
                }
                _ = tokio::time::sleep_until(monitor.deadline()) => {
                    let counts = monitor.counts();
                    info!("{} records processed", counts.processed);
                    info!(
                        "No activity after {} seconds, halting normally.",
                        monitor.timeout().as_secs()
                    );
                    return Ok(counts);
                }
                joined = &mut tasks.reader, if !tasks.reader_done => {
                    tasks.reader_done = true;
                    let queued = joined.map_err(|e| EngineError::task("reader", e))??;
                    debug!("reader finished after queueing {} records", queued);
                    tasks.records_queued = Some(queued);
                }
                joined = &mut tasks.controller, if !tasks.controller_done => {
                    tasks.controller_done = true;
                    joined.map_err(|e| EngineError::task("controller", e))??;
                    debug!("controller finished, waiting for outstanding requests");
                }
            }
        }
    }
}

struct Tasks {
    reader: JoinHandle<Result<u64, TraceError>>,
    controller: JoinHandle<Result<(), EngineError>>,
    reader_done: bool,
    controller_done: bool,
    records_queued: Option<u64>,
}

/// Write a successful completion; failures only go to the log stream.
fn record<W: Write>(log: &mut RequestLog<W>, completion: Completion) -> Result<(), EngineError> {
    match completion.outcome {
        Ok(timing) => log.write_request(&completion.finished_at, &completion.path, &timing)?,
        Err(e) if e.is_not_implemented() => return Err(e.into()),
        Err(e) => warn!("request for {} failed: {}", completion.path, e),
    }
    Ok(())
}
