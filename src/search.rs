//! Exact-line existence search.
//!
//! Two modes share one contract, [`search`]:
//!
//! | Mode | Document | Cost | Line number |
//! |------|----------|------|-------------|
//! | streaming | [`DocumentStream`] | O(n) scan, stops at first hit | yes, 1-based |
//! | set | [`DocumentSnapshot`] | O(1) membership | no |
//!
//! Both modes compare [`normalize`]d text, so a document line `" apple \n"`
//! matches the query `"apple"` under either policy. An empty normalized
//! query never matches, even when the document has blank lines.

use crate::error::Result;
use crate::store::{DocumentSnapshot, DocumentStream};

/// Trim a line (query or document) to its comparable form: newline and
/// surrounding whitespace removed.
pub fn normalize(line: &str) -> &str {
    line.trim()
}

/// The document a query is run against.
pub enum Document<'a> {
    Stream(DocumentStream),
    Snapshot(&'a DocumentSnapshot),
}

/// Verdict for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOutcome {
    pub found: bool,
    /// 1-based line of the first match. Only the streaming mode knows it.
    pub line_number: Option<u64>,
}

impl SearchOutcome {
    pub fn not_found() -> Self {
        Self::default()
    }
}

/// Decide whether `query` exists as a whole line of `document`.
pub async fn search(query: &str, document: Document<'_>) -> Result<SearchOutcome> {
    match document {
        Document::Stream(mut stream) => search_stream(query, &mut stream).await,
        Document::Snapshot(snapshot) => Ok(search_snapshot(query, snapshot)),
    }
}

/// Linear scan in file order, stopping at the first equal line.
pub async fn search_stream(query: &str, stream: &mut DocumentStream) -> Result<SearchOutcome> {
    let needle = normalize(query);
    if needle.is_empty() {
        return Ok(SearchOutcome::not_found());
    }

    let mut found = false;
    let mut line_number: u64 = 0;
    while let Some(line) = stream.next_line().await? {
        line_number += 1;
        if normalize(&line) == needle {
            found = true;
            break;
        }
    }

    if found {
        Ok(SearchOutcome {
            found,
            line_number: Some(line_number),
        })
    } else {
        Ok(SearchOutcome::not_found())
    }
}

/// Set membership against a pre-normalized snapshot.
pub fn search_snapshot(query: &str, snapshot: &DocumentSnapshot) -> SearchOutcome {
    let needle = normalize(query);
    SearchOutcome {
        found: !needle.is_empty() && snapshot.contains(needle),
        line_number: None,
    }
}
