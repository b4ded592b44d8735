//! Fetched message and attachment types.

use chrono::{DateTime, Utc};

/// One fetched e-mail message.
///
/// Messages are owned by the query result set for the duration of a run.
/// `thread_id` groups messages belonging to the same conversation and is
/// required by consolidation; `timestamp` orders messages within a thread.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Opaque identifier, unique within one query result set.
    pub message_id: String,

    /// Identifier shared by all messages in the same conversation.
    pub thread_id: String,

    /// When the message was sent. `None` means the source did not supply
    /// one; consolidation rejects such messages.
    pub timestamp: Option<DateTime<Utc>>,

    /// The `From:` header value.
    pub from: String,

    /// The `To:` header, multiple recipients already joined with `", "`.
    pub to: String,

    /// The `Cc:` header, joined like `to`. Empty if absent.
    pub cc: String,

    /// The `Bcc:` header, joined like `to`. Empty if absent.
    pub bcc: String,

    /// Decoded subject line.
    pub subject: String,

    /// Extracted plain-text body.
    pub body: String,

    /// Attachments, possibly empty. Oversized ones are dropped by the
    /// pipeline's size pre-filter before rendering.
    pub attachments: Vec<Attachment>,
}

/// A downloaded attachment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Attachment {
    /// Filename as reported by the message part.
    pub filename: String,

    /// Decoded size in bytes.
    pub size: u64,

    /// Binary payload.
    #[serde(skip)]
    pub data: Vec<u8>,
}
