//! The full query run: fetch → size pre-filter → consolidate → render →
//! classify → write. Strictly linear; the first error aborts the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use humansize::{format_size, BINARY};

use crate::classify::classify;
use crate::consolidate::{consolidate, Policy};
use crate::error::Result;
use crate::fetch::{FetchQuery, MessageSource};
use crate::model::message::Message;
use crate::model::rules::RuleSet;
use crate::render;
use crate::writer;

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root output directory; a subfolder named after the begin date is
    /// created underneath it.
    pub output_dir: PathBuf,
    /// Which message represents each thread.
    pub policy: Policy,
    /// Whether rule patterns match case-sensitively.
    pub case_sensitive: bool,
    /// Classification rule sets (already validated at load time).
    pub rules: Vec<RuleSet>,
    /// Attachments above this many bytes are dropped before rendering,
    /// with a note appended to the body.
    pub max_attachment_size: u64,
}

/// What a run produced, for the CLI summary.
#[derive(Debug, Default, serde::Serialize)]
pub struct RunSummary {
    /// Messages returned by the source.
    pub fetched: usize,
    /// Distinct threads after consolidation.
    pub threads: usize,
    /// Files written (Markdown only, not attachments).
    pub written: Vec<PathBuf>,
    /// Thread count per destination folder; the default location is
    /// keyed as `"(default)"`.
    pub by_folder: BTreeMap<String, usize>,
}

/// Execute one query run against `source`.
///
/// The `progress` callback is forwarded to the source while fetching.
pub fn run(
    source: &dyn MessageSource,
    query: &FetchQuery,
    config: &RunConfig,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<RunSummary> {
    let mut messages = source.fetch(query, progress)?;
    let fetched = messages.len();

    for msg in &mut messages {
        filter_attachments(msg, config.max_attachment_size);
    }

    let representatives = consolidate(&messages, config.policy)?;

    let output_root = config
        .output_dir
        .join(query.begin_date.format("%Y-%m-%d").to_string());

    let mut summary = RunSummary {
        fetched,
        threads: representatives.len(),
        ..Default::default()
    };

    for msg in &representatives {
        let folder = classify(
            &render::searchable_text(msg),
            &config.rules,
            config.case_sensitive,
        )?;

        let rendered = render::render_markdown(msg);
        let path = writer::write_thread(&output_root, folder.as_deref(), msg, &rendered)?;
        summary.written.push(path);

        let key = folder.unwrap_or_else(|| "(default)".to_string());
        *summary.by_folder.entry(key).or_insert(0) += 1;
    }

    tracing::info!(
        fetched = summary.fetched,
        threads = summary.threads,
        written = summary.written.len(),
        output = %output_root.display(),
        "Run complete"
    );

    Ok(summary)
}

/// Drop attachments above the size limit, noting each in the body so the
/// omission is visible in the written file.
fn filter_attachments(msg: &mut Message, max_size: u64) {
    let mut dropped = Vec::new();
    msg.attachments.retain(|att| {
        if att.size <= max_size {
            true
        } else {
            dropped.push(format!(
                "NOTE: attachment '{}' was {} but the limit is {}",
                att.filename,
                format_size(att.size, BINARY),
                format_size(max_size, BINARY)
            ));
            false
        }
    });

    for note in dropped {
        tracing::warn!(message_id = %msg.message_id, "{note}");
        msg.body.push_str("\n\n");
        msg.body.push_str(&note);
    }
}

/// Resolve the begin-date subfolder for a query, for display purposes.
pub fn output_root(output_dir: &Path, query: &FetchQuery) -> PathBuf {
    output_dir.join(query.begin_date.format("%Y-%m-%d").to_string())
}
