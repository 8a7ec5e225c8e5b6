//! Trace line and record types.

use crate::TraceError;
use std::str::FromStr;

/// Number of columns in a well-formed trace line.
pub const FIELD_COUNT: usize = 9;

/// Index of the request path column.
pub const PATH_FIELD: usize = 6;

/// A trace line split into fields, as it travels through the work queue.
///
/// The field count is not checked here; a short or long line is only
/// rejected when a requester turns it into a [`TraceRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// 1-based line number in the source, comments included
    pub line_number: u64,
    pub fields: Vec<String>,
}

impl TraceLine {
    /// Split one line of text into fields.
    ///
    /// Returns `None` for blank lines and `#` comments.
    pub fn parse(line_number: u64, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            return None;
        }
        let fields = text.split_whitespace().map(str::to_string).collect();
        Some(Self {
            line_number,
            fields,
        })
    }

    /// Remove the first occurrence of `prefix` from the path column.
    pub fn strip_path_prefix(&mut self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        if let Some(path) = self.fields.get_mut(PATH_FIELD) {
            *path = path.replacen(prefix, "", 1);
        }
    }
}

/// Request operator of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Put,
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Operation::Get),
            "PUT" => Ok(Operation::Put),
            other => Err(other.to_string()),
        }
    }
}

/// A validated nine-column trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub line_number: u64,
    pub date: String,
    pub time: String,
    pub latency: String,
    pub transfer_time: String,
    pub think_time: String,
    pub bytes: String,
    pub path: String,
    pub return_code: String,
    pub operator: String,
}

impl TraceRecord {
    /// Parse the operator column.
    pub fn operation(&self) -> Result<Operation, TraceError> {
        self.operator
            .parse()
            .map_err(|operator| TraceError::UnsupportedOperator {
                line: self.line_number,
                operator,
            })
    }
}

impl TryFrom<TraceLine> for TraceRecord {
    type Error = TraceError;

    fn try_from(line: TraceLine) -> Result<Self, Self::Error> {
        let fields: [String; FIELD_COUNT] = line.fields.try_into().map_err(|fields| {
            TraceError::FieldCount {
                line: line.line_number,
                fields,
            }
        })?;
        let [date, time, latency, transfer_time, think_time, bytes, path, return_code, operator] =
            fields;

        Ok(Self {
            line_number: line.line_number,
            date,
            time,
            latency,
            transfer_time,
            think_time,
            bytes,
            path,
            return_code,
            operator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "01-Mar-2017 16:00:00 0 0 0 1024 /images/a.jpg 404 GET";

    #[test]
    fn test_parse_splits_on_whitespace() {
        let line = TraceLine::parse(3, "01-Mar-2017  16:00:00\t0 0 0 0 /x 200 GET").unwrap();
        assert_eq!(line.line_number, 3);
        assert_eq!(line.fields.len(), FIELD_COUNT);
        assert_eq!(line.fields[PATH_FIELD], "/x");
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        assert!(TraceLine::parse(1, "#yyy-mm-dd hh:mm:ss latency").is_none());
        assert!(TraceLine::parse(2, "   ").is_none());
        assert!(TraceLine::parse(3, "").is_none());
    }

    #[test]
    fn test_strip_removes_first_occurrence_only() {
        let mut line = TraceLine::parse(1, "d t 0 0 0 0 /cdn/a/cdn/b 200 GET").unwrap();
        line.strip_path_prefix("/cdn");
        assert_eq!(line.fields[PATH_FIELD], "/a/cdn/b");
    }

    #[test]
    fn test_strip_leaves_other_paths_unchanged() {
        let mut line = TraceLine::parse(1, SAMPLE).unwrap();
        line.strip_path_prefix("/video");
        assert_eq!(line.fields[PATH_FIELD], "/images/a.jpg");

        line.strip_path_prefix("");
        assert_eq!(line.fields[PATH_FIELD], "/images/a.jpg");
    }

    #[test]
    fn test_strip_ignores_short_lines() {
        let mut line = TraceLine::parse(1, "only three fields").unwrap();
        line.strip_path_prefix("/x");
        assert_eq!(line.fields, vec!["only", "three", "fields"]);
    }

    #[test]
    fn test_record_from_nine_fields() {
        let record = TraceRecord::try_from(TraceLine::parse(7, SAMPLE).unwrap()).unwrap();
        assert_eq!(record.line_number, 7);
        assert_eq!(record.date, "01-Mar-2017");
        assert_eq!(record.path, "/images/a.jpg");
        assert_eq!(record.return_code, "404");
        assert_eq!(record.bytes, "1024");
        assert_eq!(record.operation().unwrap(), Operation::Get);
    }

    #[test]
    fn test_record_rejects_wrong_field_count() {
        let line = TraceLine::parse(9, "d t 0 0 0 0 /x 200").unwrap();
        match TraceRecord::try_from(line) {
            Err(TraceError::FieldCount { line, fields }) => {
                assert_eq!(line, 9);
                assert_eq!(fields.len(), 8);
            }
            other => panic!("expected FieldCount error, got {other:?}"),
        }

        let line = TraceLine::parse(10, "d t 0 0 0 0 /x 200 GET extra").unwrap();
        assert!(matches!(
            TraceRecord::try_from(line),
            Err(TraceError::FieldCount { .. })
        ));
    }

    #[test]
    fn test_operation_parsing() {
        let put = TraceLine::parse(1, "d t 0 0 0 x /p 201 PUT").unwrap();
        let record = TraceRecord::try_from(put).unwrap();
        assert_eq!(record.operation().unwrap(), Operation::Put);

        let delete = TraceLine::parse(2, "d t 0 0 0 0 /p 204 DELETE").unwrap();
        let record = TraceRecord::try_from(delete).unwrap();
        assert!(matches!(
            record.operation(),
            Err(TraceError::UnsupportedOperator { line: 2, operator }) if operator == "DELETE"
        ));
    }
}
