//! Wire protocol.
//!
//! One request per connection. The client sends a single chunk of UTF-8
//! text, optionally NUL-padded up to [`MAX_REQUEST_BYTES`]; the server
//! replies with one comma-delimited line and closes the connection.
//!
//! ```text
//! STRING EXISTS, DEBUG: Request: banana, IP: 127.0.0.1:50312, Line: 2, Execution Time: 0.04 ms, TimeStamp: Sun Oct 18 11:17:00 2026
//! STRING NOT FOUND, DEBUG: Request: durian, IP: 127.0.0.1:50314, Execution Time: 0.05 ms, TimeStamp: Sun Oct 18 11:17:01 2026
//! ERROR: FILE NOT FOUND, /srv/data.txt, DEBUG: Request: apple, IP: 127.0.0.1:50316, TimeStamp: Sun Oct 18 11:17:02 2026
//! ```

use std::borrow::Cow;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::search::SearchOutcome;

/// Largest request read from a connection. Anything beyond is never read.
pub const MAX_REQUEST_BYTES: usize = 1024;

pub const STATUS_EXISTS: &str = "STRING EXISTS";
pub const STATUS_NOT_FOUND: &str = "STRING NOT FOUND";
pub const STATUS_FILE_NOT_FOUND: &str = "ERROR: FILE NOT FOUND";

/// C `ctime` layout, e.g. `Sun Oct 18 11:17:00 2026`.
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A decoded request and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub text: String,
    pub peer: SocketAddr,
}

impl RequestRecord {
    /// Decode raw request bytes: trailing NUL padding is dropped first,
    /// then trailing whitespace (including the newline). Invalid UTF-8 is
    /// replaced, and bytes past [`MAX_REQUEST_BYTES`] are ignored.
    pub fn from_bytes(raw: &[u8], peer: SocketAddr) -> Self {
        let raw = &raw[..raw.len().min(MAX_REQUEST_BYTES)];
        let end = raw
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        let text = String::from_utf8_lossy(&raw[..end]).trim_end().to_string();
        Self { text, peer }
    }
}

/// Response status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Exists,
    NotFound,
    /// The active data file could not be opened; carries a description.
    FileNotFound(String),
}

/// Everything that goes into one response line.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: Status,
    pub request: String,
    pub peer: SocketAddr,
    pub elapsed: Option<Duration>,
    pub timestamp: DateTime<Local>,
    pub line_number: Option<u64>,
}

impl ResponseRecord {
    /// Response for a completed search.
    pub fn from_outcome(request: &RequestRecord, outcome: SearchOutcome, elapsed: Duration) -> Self {
        Self {
            status: if outcome.found {
                Status::Exists
            } else {
                Status::NotFound
            },
            request: request.text.clone(),
            peer: request.peer,
            elapsed: Some(elapsed),
            timestamp: Local::now(),
            line_number: outcome.line_number,
        }
    }

    /// Response for a missing or unreadable data file.
    pub fn file_not_found(request: &RequestRecord, detail: impl Into<String>) -> Self {
        Self {
            status: Status::FileNotFound(detail.into()),
            request: request.text.clone(),
            peer: request.peer,
            elapsed: None,
            timestamp: Local::now(),
            line_number: None,
        }
    }

    /// Elapsed search time in milliseconds, rounded to two decimals.
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.elapsed
            .map(|d| (d.as_secs_f64() * 1000.0 * 100.0).round() / 100.0)
    }

    /// Serialize to the single wire line, newline included.
    pub fn to_wire(&self) -> String {
        format!("{}\n", self)
    }
}

/// Echoed text must not break the response line, so control characters
/// (CR and LF included) are written as spaces.
fn single_line(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_control) {
        Cow::Owned(
            text.chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

impl fmt::Display for ResponseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Status::Exists => write!(f, "{}", STATUS_EXISTS)?,
            Status::NotFound => write!(f, "{}", STATUS_NOT_FOUND)?,
            Status::FileNotFound(detail) => {
                write!(f, "{}, {}", STATUS_FILE_NOT_FOUND, single_line(detail))?
            }
        }
        write!(
            f,
            ", DEBUG: Request: {}, IP: {}",
            single_line(&self.request),
            self.peer
        )?;
        if let Some(line) = self.line_number {
            write!(f, ", Line: {}", line)?;
        }
        if let Some(ms) = self.elapsed_ms() {
            write!(f, ", Execution Time: {:.2} ms", ms)?;
        }
        write!(f, ", TimeStamp: {}", self.timestamp.format(TIMESTAMP_FORMAT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:50312".parse().unwrap()
    }

    #[test]
    fn test_request_strips_nul_padding_and_newline() {
        let mut raw = b"banana\n".to_vec();
        raw.resize(MAX_REQUEST_BYTES, 0);
        let req = RequestRecord::from_bytes(&raw, peer());
        assert_eq!(req.text, "banana");
        assert_eq!(req.peer, peer());
    }

    #[test]
    fn test_request_keeps_leading_whitespace() {
        let req = RequestRecord::from_bytes(b"  kiwi \r\n\0\0", peer());
        assert_eq!(req.text, "  kiwi");
    }

    #[test]
    fn test_request_empty_and_all_padding() {
        assert_eq!(RequestRecord::from_bytes(b"", peer()).text, "");
        assert_eq!(RequestRecord::from_bytes(&[0u8; 16], peer()).text, "");
    }

    #[test]
    fn test_request_truncates_oversized_input() {
        let raw = vec![b'a'; MAX_REQUEST_BYTES + 10];
        let req = RequestRecord::from_bytes(&raw, peer());
        assert_eq!(req.text.len(), MAX_REQUEST_BYTES);
    }

    #[test]
    fn test_request_invalid_utf8_is_replaced() {
        let req = RequestRecord::from_bytes(&[b'o', 0xff, b'k'], peer());
        assert_eq!(req.text, "o\u{fffd}k");
    }

    #[test]
    fn test_found_line_layout() {
        let req = RequestRecord::from_bytes(b"banana", peer());
        let outcome = SearchOutcome {
            found: true,
            line_number: Some(2),
        };
        let wire = ResponseRecord::from_outcome(&req, outcome, Duration::from_micros(1234)).to_wire();
        assert!(wire.starts_with("STRING EXISTS, DEBUG: Request: banana, IP: 127.0.0.1:50312, Line: 2, "));
        assert!(wire.contains("Execution Time: 1.23 ms"));
        assert!(wire.contains("TimeStamp: "));
        assert!(wire.ends_with('\n'));
        assert_eq!(wire.matches('\n').count(), 1);
    }

    #[test]
    fn test_not_found_line_layout() {
        let req = RequestRecord::from_bytes(b"durian", peer());
        let wire = ResponseRecord::from_outcome(&req, SearchOutcome::not_found(), Duration::ZERO)
            .to_wire();
        assert!(wire.starts_with("STRING NOT FOUND, DEBUG: Request: durian, IP: 127.0.0.1:50312, Execution Time: 0.00 ms"));
        assert!(!wire.contains("Line:"));
    }

    #[test]
    fn test_file_not_found_line_layout() {
        let req = RequestRecord::from_bytes(b"apple", peer());
        let wire = ResponseRecord::file_not_found(&req, "/srv/data.txt").to_wire();
        assert!(wire.starts_with("ERROR: FILE NOT FOUND, /srv/data.txt, DEBUG: Request: apple"));
        assert!(!wire.contains("STRING"));
        assert!(!wire.contains("Execution Time"));
    }

    #[test]
    fn test_embedded_newlines_stay_on_one_line() {
        let req = RequestRecord::from_bytes(b"apple\nINJECTED, IP: 6.6.6.6", peer());
        let wire = ResponseRecord::from_outcome(&req, SearchOutcome::not_found(), Duration::ZERO)
            .to_wire();
        assert_eq!(wire.matches('\n').count(), 1, "{:?}", wire);
        assert!(wire.starts_with(
            "STRING NOT FOUND, DEBUG: Request: apple INJECTED, IP: 6.6.6.6, IP: 127.0.0.1:50312, "
        ));

        let req = RequestRecord::from_bytes(b"a\rb", peer());
        let wire = ResponseRecord::file_not_found(&req, "gone").to_wire();
        assert!(!wire.contains('\r'));
        assert!(wire.contains("Request: a b, IP:"));
    }

    #[test]
    fn test_file_not_found_detail_stays_on_one_line() {
        let req = RequestRecord::from_bytes(b"apple", peer());
        let wire = ResponseRecord::file_not_found(&req, "/srv/odd\nname.txt").to_wire();
        assert_eq!(wire.matches('\n').count(), 1);
        assert!(wire.starts_with("ERROR: FILE NOT FOUND, /srv/odd name.txt, DEBUG:"));
    }
}
