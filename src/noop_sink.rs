use crate::record::LogRecord;
use crate::sink::{BoxError, LogSink};
use async_trait::async_trait;

/// A sink that simply drops all records.
///
/// Registered as the `noop` client factory. Useful for measuring the
/// overhead of the pipeline itself without any external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), BoxError> {
        Ok(())
    }
}
