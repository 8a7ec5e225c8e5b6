//! Trace reader feeding the work queue.

use crate::{TraceError, TraceLine};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default capacity of the work queue between reader and requesters.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Pause between end-of-input polls in tailing mode.
pub const TAIL_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Options controlling which records the reader forwards.
#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Records to discard before forwarding starts
    pub skip: u64,
    /// Maximum number of records to forward (unbounded when `None`)
    pub limit: Option<u64>,
    /// Prefix removed once from every record's path
    pub strip_prefix: Option<String>,
    /// Keep polling at end-of-input instead of closing the queue
    pub tail: bool,
}

/// Reads trace lines from an async source onto a bounded work queue.
pub struct TraceReader<R> {
    input: R,
    options: ReaderOptions,
    shutdown: CancellationToken,
    line_number: u64,
    pending: Vec<u8>,
}

impl<R> TraceReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(input: R, options: ReaderOptions, shutdown: CancellationToken) -> Self {
        Self {
            input,
            options,
            shutdown,
            line_number: 0,
            pending: Vec::new(),
        }
    }

    /// Skip, then forward records to `queue` until the budget or the input
    /// runs out. Returns the number of records forwarded.
    ///
    /// In bounded mode the queue is closed when this returns. In tailing mode
    /// the reader only returns once `shutdown` fires, so consumers never see
    /// the queue close underneath them.
    pub async fn run(
        mut self,
        queue: async_channel::Sender<TraceLine>,
    ) -> Result<u64, TraceError> {
        if self.options.skip > 0 && !self.skip_forward().await? {
            return Ok(0);
        }

        let mut count = 0u64;
        while self.options.limit.map_or(true, |limit| count < limit) {
            match self.next_line().await? {
                Some(mut line) => {
                    if let Some(prefix) = &self.options.strip_prefix {
                        line.strip_path_prefix(prefix);
                    }
                    if queue.send(line).await.is_err() {
                        debug!("Work queue has no consumers left, stopping reader");
                        return Ok(count);
                    }
                    count += 1;
                }
                None if self.options.tail => {
                    if !self.wait_for_input().await {
                        return Ok(count);
                    }
                }
                None => break,
            }
        }

        if self.options.tail {
            info!("Loaded {} records, record budget reached", count);
            self.shutdown.cancelled().await;
        } else {
            info!("Loaded {} records, closing input", count);
        }
        Ok(count)
    }

    /// Discard the first `skip` records. Undecodable lines count as skipped.
    ///
    /// Returns `false` when shutdown arrived while waiting for input.
    async fn skip_forward(&mut self) -> Result<bool, TraceError> {
        let mut skipped = 0u64;
        while skipped < self.options.skip {
            match self.next_line().await {
                Ok(Some(_)) | Err(TraceError::Parse { .. }) => skipped += 1,
                Ok(None) if self.options.tail => {
                    if !self.wait_for_input().await {
                        return Ok(false);
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(e),
            }
        }
        debug!("Skipped {} records", skipped);
        Ok(true)
    }

    /// Pause before polling the input again. Returns `false` on shutdown.
    async fn wait_for_input(&mut self) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(TAIL_POLL_INTERVAL) => true,
        }
    }

    /// Next record line, skipping comments. `None` means no complete line is
    /// available right now.
    async fn next_line(&mut self) -> Result<Option<TraceLine>, TraceError> {
        while let Some(raw) = self.next_raw_line().await? {
            self.line_number += 1;
            let text = String::from_utf8(raw).map_err(|_| TraceError::Parse {
                line: self.line_number,
            })?;
            if let Some(line) = TraceLine::parse(self.line_number, &text) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    async fn next_raw_line(&mut self) -> Result<Option<Vec<u8>>, TraceError> {
        self.input.read_until(b'\n', &mut self.pending).await?;
        if self.pending.ends_with(b"\n") {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        // End of input. A partial line is kept while tailing, since the rest
        // of it may still be written.
        if self.options.tail || self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(&mut self.pending)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PATH_FIELD;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRACE: &str = "\
#yyy-mm-dd hh:mm:ss latency xfertime thinktime bytes url rc
01-Mar-2017 16:00:00 0 0 0 0 /cdn/one 200 GET
01-Mar-2017 16:00:01 0 0 0 0 /cdn/two 200 GET

01-Mar-2017 16:00:02 0 0 0 0 /cdn/three 404 GET
01-Mar-2017 16:00:03 0 0 0 0 /cdn/four 200 PUT
";

    fn paths(lines: &[TraceLine]) -> Vec<&str> {
        lines
            .iter()
            .map(|line| line.fields[PATH_FIELD].as_str())
            .collect()
    }

    async fn drain(rx: &async_channel::Receiver<TraceLine>) -> Vec<TraceLine> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_bounded_reads_everything_and_closes() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let reader = TraceReader::new(
            TRACE.as_bytes(),
            ReaderOptions::default(),
            CancellationToken::new(),
        );

        assert_eq!(reader.run(tx).await.unwrap(), 4);
        let lines = drain(&rx).await;
        assert_eq!(
            paths(&lines),
            vec!["/cdn/one", "/cdn/two", "/cdn/three", "/cdn/four"]
        );
        assert_eq!(lines[0].line_number, 2);
        assert_eq!(lines[2].line_number, 5);
        assert!(rx.is_closed());
    }

    #[tokio::test]
    async fn test_skip_and_limit() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let options = ReaderOptions {
            skip: 1,
            limit: Some(2),
            ..Default::default()
        };
        let reader = TraceReader::new(TRACE.as_bytes(), options, CancellationToken::new());

        assert_eq!(reader.run(tx).await.unwrap(), 2);
        assert_eq!(paths(&drain(&rx).await), vec!["/cdn/two", "/cdn/three"]);
    }

    #[tokio::test]
    async fn test_skip_past_end_of_input() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let options = ReaderOptions {
            skip: 10,
            ..Default::default()
        };
        let reader = TraceReader::new(TRACE.as_bytes(), options, CancellationToken::new());

        assert_eq!(reader.run(tx).await.unwrap(), 0);
        assert!(drain(&rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_strip_prefix_applied_once_per_record() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let options = ReaderOptions {
            strip_prefix: Some("/cdn".to_string()),
            limit: Some(2),
            ..Default::default()
        };
        let reader = TraceReader::new(TRACE.as_bytes(), options, CancellationToken::new());

        reader.run(tx).await.unwrap();
        assert_eq!(paths(&drain(&rx).await), vec!["/one", "/two"]);
    }

    #[tokio::test]
    async fn test_last_line_without_newline() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let input = "d t 0 0 0 0 /a 200 GET\nd t 0 0 0 0 /b 200 GET";
        let reader = TraceReader::new(
            input.as_bytes(),
            ReaderOptions::default(),
            CancellationToken::new(),
        );

        assert_eq!(reader.run(tx).await.unwrap(), 2);
        assert_eq!(paths(&drain(&rx).await), vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_undecodable_line_is_fatal() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let mut input = b"d t 0 0 0 0 /a 200 GET\n".to_vec();
        input.extend_from_slice(b"d t 0 0 0 0 /\xff\xfe 200 GET\n");
        input.extend_from_slice(b"d t 0 0 0 0 /c 200 GET\n");
        let reader = TraceReader::new(
            input.as_slice(),
            ReaderOptions::default(),
            CancellationToken::new(),
        );

        let result = reader.run(tx).await;
        assert!(matches!(result, Err(TraceError::Parse { line: 2 })));
        assert_eq!(paths(&drain(&rx).await), vec!["/a"]);
    }

    #[tokio::test]
    async fn test_undecodable_line_ignored_while_skipping() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let mut input = b"d t 0 0 0 0 /\xff 200 GET\n".to_vec();
        input.extend_from_slice(b"d t 0 0 0 0 /b 200 GET\n");
        let options = ReaderOptions {
            skip: 1,
            ..Default::default()
        };
        let reader = TraceReader::new(input.as_slice(), options, CancellationToken::new());

        assert_eq!(reader.run(tx).await.unwrap(), 1);
        assert_eq!(paths(&drain(&rx).await), vec!["/b"]);
    }

    #[tokio::test]
    async fn test_boxed_input_runs_on_a_spawned_task() {
        // Trace sources hand out `Send` but not `Sync` readers
        let input: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(TRACE.as_bytes());
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let reader = TraceReader::new(input, ReaderOptions::default(), CancellationToken::new());

        let handle = tokio::spawn(reader.run(tx));
        assert_eq!(handle.await.unwrap().unwrap(), 4);
        assert_eq!(drain(&rx).await.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tailing_never_closes_queue() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let shutdown = CancellationToken::new();
        let options = ReaderOptions {
            tail: true,
            ..Default::default()
        };
        let reader = TraceReader::new(TRACE.as_bytes(), options, shutdown.clone());
        let handle = tokio::spawn(reader.run(tx));

        for _ in 0..4 {
            rx.recv().await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!rx.is_closed());
        assert!(rx.is_empty());

        shutdown.cancel();
        assert_eq!(handle.await.unwrap().unwrap(), 4);
        assert!(rx.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tailing_budget_holds_queue_open() {
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let shutdown = CancellationToken::new();
        let options = ReaderOptions {
            tail: true,
            limit: Some(1),
            ..Default::default()
        };
        let reader = TraceReader::new(TRACE.as_bytes(), options, shutdown.clone());
        let handle = tokio::spawn(reader.run(tx));

        rx.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!handle.is_finished());
        assert!(!rx.is_closed());

        shutdown.cancel();
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tailing_picks_up_appended_lines() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "d t 0 0 0 0 /first 200 GET\nd t 0 0 0 0 /sec").unwrap();
        file.flush().unwrap();

        let input = tokio::io::BufReader::new(tokio::fs::File::open(file.path()).await.unwrap());
        let (tx, rx) = async_channel::bounded(DEFAULT_QUEUE_CAPACITY);
        let shutdown = CancellationToken::new();
        let options = ReaderOptions {
            tail: true,
            ..Default::default()
        };
        let handle = tokio::spawn(TraceReader::new(input, options, shutdown.clone()).run(tx));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.fields[PATH_FIELD], "/first");

        // The half-written second line must not be forwarded yet
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.is_empty());

        writeln!(file, "ond 200 GET").unwrap();
        file.flush().unwrap();

        let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.fields[PATH_FIELD], "/second");
        assert_eq!(second.line_number, 2);

        shutdown.cancel();
        assert_eq!(handle.await.unwrap().unwrap(), 2);
    }
}
