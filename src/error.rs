//! Error types for a replay run.

use thiserror::Error;
use trace_replay_protocol::ProtocolError;
use trace_replay_trace::TraceError;

/// Conditions that end a run unsuccessfully.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Steady and progressive profiles need a positive target.
    #[error("a zero or negative tps target ({0}) is not meaningful")]
    InvalidTarget(i64),

    /// A progressive ramp cannot step every zero seconds.
    #[error("the ramp step duration must be at least one second")]
    ZeroStepDuration,

    /// Malformed trace input or an unsupported operator.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// The backend could not be set up before the run.
    #[error("failed to prepare backend: {0}")]
    Prepare(#[source] ProtocolError),

    /// The selected backend cannot serve a request the trace asked for.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Writing the request log failed.
    #[error("failed to write request log: {0}")]
    Output(#[from] std::io::Error),

    /// A background task panicked or was cancelled.
    #[error("{task} task failed: {message}")]
    Task { task: &'static str, message: String },
}

impl EngineError {
    pub(crate) fn task(task: &'static str, err: tokio::task::JoinError) -> Self {
        EngineError::Task {
            task,
            message: err.to_string(),
        }
    }
}
