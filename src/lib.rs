//! # rustcoauthors
//!
//! OpenAlex coauthorship collector: resolves a list of researcher names to
//! OpenAlex authors, crawls each author's works, and emits one row per
//! qualifying publication.
//!
//! ## Modules
//!
//! - [`names`] - credential stripping for input names
//! - [`resolver`] - author search and disambiguation
//! - [`works`] - cursor-paged publication crawl with deduplication
//! - [`career`] - career stage classification
//! - [`rows`] - output row construction and filtering
//! - [`pipeline`] - batch orchestration
//! - [`fetch`] - HTTP GET with retry/backoff
//! - [`table`] - CSV input/output
//! - [`gender`] - coauthor gender tally over a pluggable classifier
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustcoauthors::{config::CollectConfig, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::new(CollectConfig::default())?;
//!     let report = pipeline.run(&["Jane Doe, PhD".to_string()]).await;
//!     println!("Collected {} rows", report.rows.len());
//!     Ok(())
//! }
//! ```

pub mod career;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gender;
pub mod names;
pub mod openalex;
pub mod pipeline;
pub mod random;
pub mod resolver;
pub mod rows;
pub mod table;
pub mod works;

pub use error::{CollectError, Result};
