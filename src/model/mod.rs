//! Core data model types for fetched messages and classification rules.

pub mod message;
pub mod rules;
