//! Write rendered threads and their attachments to the output tree.
//!
//! Layout: `<output_root>/<begin_date>/<classified folder>/`, with the
//! classified folder omitted when no rule matched. One Markdown file per
//! thread representative, attachments alongside it.

use std::path::{Path, PathBuf};

use crate::error::{QueryError, Result};
use crate::model::message::Message;
use crate::render;

/// Write one representative message into `folder` under `output_root`.
///
/// Returns the path of the Markdown file. Attachments (already
/// size-filtered by the pipeline) are written next to it.
pub fn write_thread(
    output_root: &Path,
    folder: Option<&str>,
    msg: &Message,
    rendered: &str,
) -> Result<PathBuf> {
    let dir = match folder {
        Some(name) => output_root.join(sanitize_filename_part(name, 120)),
        None => output_root.to_path_buf(),
    };
    std::fs::create_dir_all(&dir).map_err(|e| QueryError::io(&dir, e))?;

    let path = unique_path(&dir, &markdown_filename(msg));
    std::fs::write(&path, rendered).map_err(|e| QueryError::io(&path, e))?;
    tracing::debug!(path = %path.display(), "Wrote thread");

    for att in &msg.attachments {
        let att_path = unique_path(&dir, &sanitize_filename_part(&att.filename, 160));
        std::fs::write(&att_path, &att.data).map_err(|e| QueryError::io(&att_path, e))?;
        tracing::debug!(path = %att_path.display(), size = att.size, "Wrote attachment");
    }

    Ok(path)
}

/// `"<date> - <subject>.md"`, sanitized.
fn markdown_filename(msg: &Message) -> String {
    let date = msg
        .timestamp
        .map(|ts| ts.format("%Y-%m-%d %H%M%S").to_string())
        .unwrap_or_else(|| "undated".to_string());
    let subject = sanitize_filename_part(&msg.subject, 80);
    format!("{date} - {subject}.{}", render::EXTENSION)
}

/// Avoid clobbering an existing file by appending a counter to the stem.
fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), format!(".{e}")),
        None => (filename.to_string(), String::new()),
    };
    for n in 1.. {
        let candidate = dir.join(format!("{stem} ({n}){ext}"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

/// Keep alphanumerics plus a few safe punctuation characters; everything
/// else becomes `_`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    let trimmed = sanitized.trim().to_string();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::Attachment;
    use chrono::{TimeZone, Utc};

    fn make_message() -> Message {
        Message {
            message_id: "m1".to_string(),
            thread_id: "t1".to_string(),
            timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()),
            from: "alice@example.com".to_string(),
            to: "bob@example.com".to_string(),
            cc: String::new(),
            bcc: String::new(),
            subject: "Budget: Q1/Q2".to_string(),
            body: "body".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world", 20), "hello world");
        assert_eq!(
            sanitize_filename_part("user@example.com", 30),
            "user@example.com"
        );
        assert_eq!(sanitize_filename_part("a/b\\c:d", 20), "a_b_c_d");
        assert_eq!(sanitize_filename_part("", 20), "unknown");
        assert_eq!(sanitize_filename_part("abcdef", 3), "abc");
    }

    #[test]
    fn test_write_thread_default_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let msg = make_message();
        let path = write_thread(dir.path(), None, &msg, "rendered text").expect("write");

        assert!(path.starts_with(dir.path()));
        assert_eq!(path.extension().unwrap(), "md");
        let contents = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(contents, "rendered text");
    }

    #[test]
    fn test_write_thread_classified_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let msg = make_message();
        let path = write_thread(dir.path(), Some("receipts"), &msg, "x").expect("write");
        assert!(path.starts_with(dir.path().join("receipts")));
    }

    #[test]
    fn test_write_thread_attachments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut msg = make_message();
        msg.attachments.push(Attachment {
            filename: "report.pdf".to_string(),
            size: 4,
            data: b"%PDF".to_vec(),
        });

        write_thread(dir.path(), None, &msg, "x").expect("write");
        let att = dir.path().join("report.pdf");
        assert_eq!(std::fs::read(&att).expect("read attachment"), b"%PDF");
    }

    #[test]
    fn test_unique_path_appends_counter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let msg = make_message();
        let first = write_thread(dir.path(), None, &msg, "one").expect("write");
        let second = write_thread(dir.path(), None, &msg, "two").expect("write");

        assert_ne!(first, second);
        assert!(second
            .file_name()
            .unwrap()
            .to_string_lossy()
            .contains("(1)"));
    }
}
