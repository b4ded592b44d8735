//! `gmail-query` — download Gmail messages for a date range, consolidate
//! them by conversation thread, and sort them into folders with regex
//! rules.
//!
//! This crate provides the core library: thread consolidation, rule-based
//! classification, the Gmail fetch client, and the output writer.

pub mod classify;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod writer;
