//! Console sink writing one line per statement.

use async_trait::async_trait;
use sqlproc_core::{ExportError, Sink, Statement};
use std::io::{self, Write};
use std::sync::Mutex;

/// Line format used by [`ConsoleSink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleFormat {
    /// `<path>:<line> [<type>] [<content>]`
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Sink that writes statements to a text stream (stdout by default).
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
    format: ConsoleFormat,
}

impl ConsoleSink {
    /// Create a sink writing to stdout.
    #[must_use]
    pub fn stdout(format: ConsoleFormat) -> Self {
        Self::new(io::stdout(), format)
    }

    /// Create a sink writing to an arbitrary stream.
    pub fn new(writer: impl Write + Send + 'static, format: ConsoleFormat) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            format,
        }
    }

    fn render(&self, statement: &Statement) -> Result<String, ExportError> {
        match self.format {
            ConsoleFormat::Text => Ok(statement.to_string()),
            ConsoleFormat::Json => Ok(serde_json::to_string(statement)?),
        }
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn export(&self, statement: &Statement) -> Result<(), ExportError> {
        let line = self.render(statement)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ExportError::Failed("console writer lock poisoned".to_string()))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
