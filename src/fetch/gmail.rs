//! Gmail REST API v1 client.
//!
//! Lists message ids matching a search string, then fetches each message
//! with `format=full` and flattens the MIME part tree into our
//! [`Message`] model. Bodies prefer `text/plain` and fall back to
//! `text/html`; a body that cannot be located yields a placeholder, never
//! an error.
//!
//! OAuth token *exchange* is out of scope — a bearer token is read from a
//! credentials file produced externally (e.g. by the Google quickstart
//! flow).

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Days, Utc};
use serde::Deserialize;

use crate::error::{QueryError, Result};
use crate::model::message::{Attachment, Message};

use super::{FetchQuery, MessageSource};

const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";
const PLACEHOLDER_BODY: &str = "Message body could not be retrieved.";

/// Blocking Gmail API client authenticated with a bearer token.
pub struct GmailClient {
    http: reqwest::blocking::Client,
    token: String,
    /// Messages per list page.
    pub max_results: u32,
}

impl GmailClient {
    /// Create a client from a token loaded with [`load_access_token`].
    pub fn new(token: String, max_results: u32) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            token,
            max_results,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(params)
            .send()?;

        let status = resp.status();
        if status.as_u16() == 401 {
            return Err(QueryError::Auth(
                "Gmail rejected the stored token (401); re-run the authorization flow".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(QueryError::Api {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }

        Ok(resp.json()?)
    }

    /// List all message ids matching the query, following pagination.
    fn list_ids(&self, q: &str) -> Result<Vec<MessageRef>> {
        let url = format!("{API_BASE}/messages");
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q.to_string()),
                ("maxResults", self.max_results.to_string()),
            ];
            if let Some(ref token) = page_token {
                params.push(("pageToken", token.clone()));
            }

            let page: ListResponse = self.get_json(&url, &params)?;
            ids.extend(page.messages);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ids)
    }

    /// Fetch one full message and resolve its attachments if requested.
    fn get_message(&self, id: &str, download_attachments: bool) -> Result<Message> {
        let url = format!("{API_BASE}/messages/{id}");
        let raw: RawMessage = self.get_json(&url, &[("format", "full".to_string())])?;
        let (mut message, refs) = parse_message(&raw)?;

        if download_attachments {
            for r in refs {
                let data = match r.data {
                    Some(data) => data,
                    None => self.get_attachment_data(id, &r.attachment_id)?,
                };
                message.attachments.push(Attachment {
                    filename: r.filename,
                    size: r.size,
                    data,
                });
            }
        }

        Ok(message)
    }

    /// Fetch the payload of an attachment served out-of-band.
    fn get_attachment_data(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let url = format!("{API_BASE}/messages/{message_id}/attachments/{attachment_id}");
        let body: AttachmentBody = self.get_json(&url, &[])?;
        let data = body.data.ok_or_else(|| {
            QueryError::MalformedResponse(format!(
                "attachment {attachment_id} of message {message_id} has no data"
            ))
        })?;
        decode_base64(&data).ok_or_else(|| {
            QueryError::MalformedResponse(format!(
                "attachment {attachment_id} of message {message_id} is not valid base64"
            ))
        })
    }
}

impl MessageSource for GmailClient {
    fn fetch(
        &self,
        query: &FetchQuery,
        progress: Option<&dyn Fn(usize, usize)>,
    ) -> Result<Vec<Message>> {
        let q = build_query(query);
        tracing::info!(query = %q, "Listing Gmail messages");

        let ids = self.list_ids(&q)?;
        tracing::info!(count = ids.len(), "Fetching full messages");

        let mut messages = Vec::with_capacity(ids.len());
        for (i, r) in ids.iter().enumerate() {
            messages.push(self.get_message(&r.id, query.download_attachments)?);
            if let Some(cb) = progress {
                cb(i + 1, ids.len());
            }
        }

        Ok(messages)
    }
}

/// Build the Gmail search string for a query.
///
/// `before:` is exclusive in Gmail, so the end date is bumped by one day
/// to make the configured range inclusive.
pub fn build_query(query: &FetchQuery) -> String {
    let before = query
        .end_date
        .checked_add_days(Days::new(1))
        .unwrap_or(query.end_date);

    let mut parts = vec![
        format!("after:{}", query.begin_date.format("%Y-%m-%d")),
        format!("before:{}", before.format("%Y-%m-%d")),
    ];
    if let Some(ref label) = query.label {
        parts.push(format!("label:{}", label.to_lowercase()));
    }
    if let Some(ref search) = query.search {
        parts.push(search.clone());
    }
    if query.download_attachments {
        if let Some(max) = query.max_attachment_size {
            parts.push(format!("smaller:{max}"));
        }
    }

    parts.join(" ")
}

// ── Wire types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: String,
    #[serde(rename = "threadId")]
    thread_id: Option<String>,
    #[serde(rename = "internalDate")]
    internal_date: Option<String>,
    payload: Option<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PartBody {
    data: Option<String>,
    #[serde(default)]
    size: u64,
    #[serde(rename = "attachmentId")]
    attachment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentBody {
    data: Option<String>,
}

/// An attachment part found while walking the payload. The payload is
/// either inline (`data`) or served out-of-band (`attachment_id`).
struct AttachmentRef {
    filename: String,
    size: u64,
    data: Option<Vec<u8>>,
    attachment_id: String,
}

/// Convert a raw API message into our model plus its attachment parts.
fn parse_message(raw: &RawMessage) -> Result<(Message, Vec<AttachmentRef>)> {
    let payload = raw
        .payload
        .as_ref()
        .ok_or_else(|| QueryError::MalformedResponse(format!("message {} has no payload", raw.id)))?;

    let message = Message {
        message_id: raw.id.clone(),
        thread_id: raw.thread_id.clone().unwrap_or_default(),
        timestamp: raw.internal_date.as_deref().and_then(parse_internal_date),
        from: join_headers(payload, "from"),
        to: join_headers(payload, "to"),
        cc: join_headers(payload, "cc"),
        bcc: join_headers(payload, "bcc"),
        subject: join_headers(payload, "subject"),
        body: extract_body(payload),
        attachments: Vec::new(),
    };

    let mut refs = Vec::new();
    collect_attachments(payload, &mut refs);

    Ok((message, refs))
}

/// Epoch milliseconds (as the API's decimal string) to UTC.
fn parse_internal_date(s: &str) -> Option<DateTime<Utc>> {
    let millis: i64 = s.parse().ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// All values of a header, joined with `", "`. Header names are matched
/// case-insensitively; Gmail is not consistent about casing.
fn join_headers(payload: &Part, name: &str) -> String {
    payload
        .headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Walk the part tree for the message body, preferring `text/plain` and
/// falling back to `text/html`.
fn extract_body(payload: &Part) -> String {
    if let Some(text) = find_body_part(payload, "text/plain") {
        return text;
    }
    if let Some(html) = find_body_part(payload, "text/html") {
        tracing::debug!("No text/plain part; body retrieved as text/html");
        return html;
    }
    PLACEHOLDER_BODY.to_string()
}

/// Depth-first search for the first decodable part of `mime_type`.
fn find_body_part(part: &Part, mime_type: &str) -> Option<String> {
    if part.mime_type == mime_type && part.filename.is_empty() {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Some(bytes) = decode_base64(data) {
                return Some(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
    }
    part.parts.iter().find_map(|p| find_body_part(p, mime_type))
}

/// Collect attachment parts (non-empty filename) from the part tree.
fn collect_attachments(part: &Part, out: &mut Vec<AttachmentRef>) {
    if !part.filename.is_empty() {
        if let Some(body) = &part.body {
            out.push(AttachmentRef {
                filename: part.filename.clone(),
                size: body.size,
                data: body.data.as_deref().and_then(decode_base64),
                attachment_id: body.attachment_id.clone().unwrap_or_default(),
            });
        }
    }
    for p in &part.parts {
        collect_attachments(p, out);
    }
}

/// Gmail uses URL-safe base64; padding is sometimes dropped.
fn decode_base64(data: &str) -> Option<Vec<u8>> {
    let trimmed = data.trim_end_matches('=');
    URL_SAFE
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(trimmed))
        .ok()
}

/// Read the bearer token from a stored credentials file.
///
/// The file is JSON with an `access_token` field, as written by the
/// Google quickstart authorization flow.
pub fn load_access_token(path: &Path) -> Result<String> {
    #[derive(Deserialize)]
    struct Stored {
        access_token: String,
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        QueryError::Auth(format!(
            "could not read credentials file '{}': {e}",
            path.display()
        ))
    })?;
    let stored: Stored = serde_json::from_str(&contents).map_err(|e| {
        QueryError::Auth(format!(
            "could not parse credentials file '{}': {e}",
            path.display()
        ))
    })?;
    Ok(stored.access_token)
}
