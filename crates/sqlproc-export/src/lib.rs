//! # sqlproc-export
//!
//! Statement delivery for sqlproc.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Dispatcher`] | Pipeline stage delivering each statement to every sink |
//! | [`ConsoleSink`] | Writes statements to stdout (text or JSON lines) |
//! | [`MemorySink`] | Captures statements in memory |
//!
//! Sinks implement [`sqlproc_core::Sink`]; anything implementing it can be
//! registered with a [`Dispatcher`].

pub mod console;
pub mod dispatcher;
pub mod memory;

pub use console::{ConsoleFormat, ConsoleSink};
pub use dispatcher::Dispatcher;
pub use memory::MemorySink;
