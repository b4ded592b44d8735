//! Render a representative message into its output text block and derive
//! the classifier's searchable text.

use crate::model::message::Message;

/// File extension for rendered output.
pub const EXTENSION: &str = "md";

/// Render the Markdown block written to disk: a bold header block, a
/// blank line, then the body.
pub fn render_markdown(msg: &Message) -> String {
    let mut out = String::new();

    out.push_str(&format!("**From:** {}\n", msg.from));
    out.push_str(&format!("**To:** {}\n", msg.to));
    if !msg.cc.is_empty() {
        out.push_str(&format!("**CC:** {}\n", msg.cc));
    }
    out.push_str(&format!("**Subject:** {}\n", msg.subject));
    if let Some(ts) = msg.timestamp {
        out.push_str(&format!(
            "**Date:** {}\n",
            ts.format("%A %b %d, %Y, %I:%M %p %Z")
        ));
    }

    out.push_str("\n\n");
    out.push_str(&msg.body);
    out
}

/// Build the text block that classification rules run against.
///
/// Each present header is emitted as `name: value` with its lowercase
/// name, newline-joined, followed by the body — so an end-user pattern
/// like `(from|cc|bcc|to|subject): .*@example\.com` works as expected.
pub fn searchable_text(msg: &Message) -> String {
    let mut lines = Vec::new();

    for (name, value) in [
        ("from", &msg.from),
        ("to", &msg.to),
        ("cc", &msg.cc),
        ("bcc", &msg.bcc),
        ("subject", &msg.subject),
    ] {
        if !value.is_empty() {
            lines.push(format!("{name}: {value}"));
        }
    }

    lines.push(msg.body.clone());
    lines.join("\n")
}
