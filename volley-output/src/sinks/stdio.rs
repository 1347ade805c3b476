//! Standard output sink implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::sink::{Labels, SinkError, TelemetrySink};

/// Standard streams for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdStream {
    #[default]
    Stdout,
    Stderr,
}

impl StdStream {
    fn name(&self) -> &'static str {
        match self {
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }
}

/// Writes every push as one JSON object per line
#[derive(Debug, Default)]
pub struct StdioSink {
    stream: StdStream,
}

impl StdioSink {
    pub fn new(stream: StdStream) -> Self {
        Self { stream }
    }

    /// Render a push as a single JSON line
    pub fn format_line(
        labels: &Labels,
        timestamp: DateTime<Utc>,
        line: &str,
    ) -> Result<Vec<u8>, SinkError> {
        let mut out = serde_json::to_vec(&json!({
            "ts": timestamp.to_rfc3339(),
            "labels": labels,
            "line": line,
        }))?;
        out.push(b'\n');
        Ok(out)
    }

    async fn write_to<W>(&self, writer: &mut W, data: &[u8]) -> Result<(), SinkError>
    where
        W: AsyncWrite + Unpin,
    {
        let stdio_err = |e: std::io::Error| SinkError::Stdio {
            stream: self.stream.name().to_string(),
            error: e.to_string(),
        };
        writer.write_all(data).await.map_err(stdio_err)?;
        writer.flush().await.map_err(stdio_err)
    }
}

#[async_trait]
impl TelemetrySink for StdioSink {
    async fn push(
        &self,
        labels: &Labels,
        timestamp: DateTime<Utc>,
        line: String,
    ) -> Result<(), SinkError> {
        let data = Self::format_line(labels, timestamp, &line)?;
        match self.stream {
            StdStream::Stdout => self.write_to(&mut tokio::io::stdout(), &data).await,
            StdStream::Stderr => self.write_to(&mut tokio::io::stderr(), &data).await,
        }
    }
}
