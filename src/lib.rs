//! YouTube channel URL validation and enrichment.
//!
//! One pipeline replaces a pile of near-duplicate validator scripts:
//! normalize raw strings into canonical channel URLs, fetch channel
//! pages under a shared rate limit with bounded retries, extract
//! channel ID / handle / subscriber count via ordered pattern lists,
//! and record per-URL results into a CSV file or SQLite database with
//! resumable, batch-atomic checkpointing.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use config::Settings;
pub use models::{ChannelUrl, RunReport, UrlShape, ValidationRecord, ValidationStatus};
pub use pipeline::Pipeline;
