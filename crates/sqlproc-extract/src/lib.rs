//! # sqlproc-extract
//!
//! Statement extraction for the sqlproc pipeline.
//!
//! - [`StatementSplitter`] segments script text line by line into statements,
//!   skipping whole-line comments and blank lines between statements.
//! - [`Extractor`] is the pipeline stage: it receives [`SqlFile`]s, reads
//!   them and sends each completed [`Statement`] downstream as soon as it is
//!   found.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sqlproc_extract::{Extractor, ExtractorConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let extractor = Extractor::new(file_rx, statement_tx)
//!     .with_config(ExtractorConfig { max_concurrent_files: 4 });
//! tokio::spawn(extractor.run(CancellationToken::new()));
//! ```
//!
//! [`SqlFile`]: sqlproc_core::SqlFile
//! [`Statement`]: sqlproc_core::Statement

pub mod extractor;
pub mod splitter;

pub use extractor::{Extractor, ExtractorConfig, extract_statements};
pub use splitter::{Segment, StatementSplitter, split_statements};
