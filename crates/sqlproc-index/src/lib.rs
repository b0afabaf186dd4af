//! Directory watching and pipeline coordination for sqlproc.
//!
//! Files flow one way through three concurrent stages:
//! watcher → extractor → dispatcher.
//!
//! # Components
//!
//! - [`Watcher`]: Maps filesystem events in watched directories to typed files
//! - [`NotifySource`] / [`ManualSource`]: Event sources the watcher reads from
//! - [`Pipeline`]: Spawns and joins the three stages
//! - [`PipelineConfig`]: Channel, debounce and extractor settings
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlproc_index::{Pipeline, PipelineConfig};
//! use sqlproc_export::{ConsoleFormat, ConsoleSink};
//!
//! let sinks = vec![Arc::new(ConsoleSink::stdout(ConsoleFormat::Text)) as _];
//! let pipeline = Pipeline::new(&["./sql/pg:postgres"], sinks, PipelineConfig::default())?;
//!
//! let cancel = CancellationToken::new();
//! pipeline.run(cancel).await?;
//! ```

pub mod pipeline;
pub mod source;
pub mod watcher;

pub use pipeline::{Pipeline, PipelineConfig};
pub use source::{ManualHandle, ManualSource, NotifySource};
pub use watcher::{WatchedDirectory, Watcher};
