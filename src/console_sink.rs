use crate::record::LogRecord;
use crate::sink::{BoxError, LogSink};
use async_trait::async_trait;
use std::io::Write;

/// Sink that prints each record as one JSON line on stdout.
///
/// Registered as the `console` client factory; handy when running a
/// service locally without a reachable Sentry project.
#[derive(Clone, Default)]
pub struct ConsoleSink;

#[async_trait]
impl LogSink for ConsoleSink {
    async fn send(&self, record: &LogRecord) -> Result<(), BoxError> {
        let line = serde_json::to_string(record)? + "\n";
        let mut out = std::io::stdout().lock();
        out.write_all(line.as_bytes())?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), BoxError> {
        std::io::stdout().lock().flush()?;
        Ok(())
    }
}
