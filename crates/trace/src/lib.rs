//! Trace reading for trace-replay.
//!
//! A trace is a whitespace-delimited log of historical requests, one request
//! per line:
//!
//! ```text
//! # date time latency transferTime thinkTime bytes path returnCode operator
//! 01-Mar-2017 16:00:00 0 0 0 0 /images/a.jpg 404 GET
//! ```
//!
//! [`TraceReader`] turns such a stream into [`TraceLine`]s on a bounded work
//! queue. Requesters validate each line into a [`TraceRecord`] when they take
//! it off the queue.
//!
//! # Modes
//!
//! - **Bounded**: the reader stops at end-of-input or after its record budget
//!   and closes the queue, which is the end-of-stream signal for consumers.
//! - **Tailing**: end-of-input is treated as "no data yet"; the reader polls
//!   the source until shutdown and never closes the queue on its own.

mod error;
mod reader;
mod record;
mod source;

pub use error::TraceError;
pub use reader::{ReaderOptions, TraceReader, DEFAULT_QUEUE_CAPACITY, TAIL_POLL_INTERVAL};
pub use record::{Operation, TraceLine, TraceRecord, FIELD_COUNT, PATH_FIELD};
pub use source::{TraceSource, DEFAULT_BUFFER_SIZE};
