//! Per-request output lines.
//!
//! Lines share the column layout of the trace format so the output can be fed
//! to the offline aggregator, or replayed again.

use chrono::NaiveDateTime;
use std::io::{self, Write};
use trace_replay_protocol::RequestTiming;

/// Header printed before the first request line.
pub const HEADER: &str = "#yyy-mm-dd hh:mm:ss latency xfertime thinktime bytes url rc";

/// Writes the header and one line per completed request.
pub struct RequestLog<W: Write> {
    out: W,
}

impl<W: Write> RequestLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.out, "{HEADER}")?;
        self.out.flush()
    }

    /// `date time latency xfertime thinktime bytes url rc`, times in seconds.
    pub fn write_request(
        &mut self,
        finished_at: &NaiveDateTime,
        path: &str,
        timing: &RequestTiming,
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "{} {:.6} {:.6} 0 {} {} {}",
            finished_at.format("%Y-%m-%d %H:%M:%S"),
            timing.latency.as_secs_f64(),
            timing.transfer.as_secs_f64(),
            timing.bytes,
            path,
            timing.status
        )?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    #[test]
    fn test_header_and_request_line() {
        let mut log = RequestLog::new(Vec::new());
        log.write_header().unwrap();

        let at = NaiveDate::from_ymd_opt(2017, 3, 1)
            .unwrap()
            .and_hms_opt(16, 0, 5)
            .unwrap();
        let timing = RequestTiming {
            latency: Duration::from_millis(12),
            transfer: Duration::from_micros(3500),
            bytes: 2048,
            status: 200,
        };
        log.write_request(&at, "/images/a.jpg", &timing).unwrap();

        let text = String::from_utf8(log.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "2017-03-01 16:00:05 0.012000 0.003500 0 2048 /images/a.jpg 200"
        );
        // Same column count as a trace line, minus the operator
        assert_eq!(lines[1].split_whitespace().count(), 8);
    }
}
