//! Novelty Corpus
//!
//! Builds a year-partitioned bibliometric corpus from the OpenAlex works API
//! and feeds it to an external novelty engine over trailing windows.
//!
//! # Features
//!
//! - **Rank sampling**: Fixed ranks from a citation-ordered candidate pool
//! - **Reference expansion**: Two levels deep, bounded concurrency, order preserved
//! - **Citation scoring**: Mean, max, min reference percentile and topic breadth
//! - **Corpus store**: One JSON file per year, merge by id, atomic writes
//! - **Windows**: Co-occurrence and indicator runs over `[Y-10, Y)`
//!
//! # Example
//!
//! ```no_run
//! use novelty_corpus::{config::Config, pipeline::Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let pipeline = Pipeline::from_config(config)?;
//!
//!     let report = pipeline.run().await?;
//!     println!("{}", novelty_corpus::formatters::format_run_report_markdown(&report));
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod correlation;
pub mod error;
pub mod expander;
pub mod formatters;
pub mod models;
pub mod pipeline;
pub mod results;
pub mod scorer;
pub mod selector;
pub mod store;
pub mod window;

pub use client::OpenAlexClient;
pub use config::Config;
pub use error::{ClientError, CorpusError, EngineError};
pub use pipeline::{Pipeline, RunReport};
