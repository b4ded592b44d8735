//! Message fetching: the `MessageSource` seam and the Gmail client.

pub mod gmail;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::message::Message;

/// Parameters for one query run.
#[derive(Debug, Clone)]
pub struct FetchQuery {
    /// First day to search, inclusive.
    pub begin_date: NaiveDate,
    /// Last day to search, inclusive.
    pub end_date: NaiveDate,
    /// Restrict to a Gmail label.
    pub label: Option<String>,
    /// Raw Gmail search string, appended verbatim.
    pub search: Option<String>,
    /// Whether to download attachment payloads.
    pub download_attachments: bool,
    /// Skip messages larger than this when downloading attachments
    /// (adds a `smaller:` clause to the query).
    pub max_attachment_size: Option<u64>,
}

/// Something that can produce the messages matching a query.
///
/// The pipeline depends only on this seam; tests substitute an in-memory
/// source. Failures are fatal for the run — no partial consolidation
/// across retries.
pub trait MessageSource {
    /// Fetch all matching messages.
    ///
    /// The `progress` callback receives `(fetched, total)` as individual
    /// messages come in.
    fn fetch(
        &self,
        query: &FetchQuery,
        progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<Vec<Message>>;
}
