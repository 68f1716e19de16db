use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Boxed error returned by sink implementations.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Asynchronous destination for [`LogRecord`]s.
///
/// Implementations transport records to a concrete backend (Sentry,
/// stdout, ...). The delivery pipeline calls `send` from its background
/// task and never awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send a single log record to the underlying backend.
    ///
    /// **Parameters**
    /// - `record`: fully-populated [`LogRecord`] that passed the filters.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was accepted by the backend.
    /// - `Err(..)` if the backend failed. The pipeline counts the failure
    ///   and moves on; the record is not retried.
    async fn send(&self, record: &LogRecord) -> Result<(), BoxError>;

    /// Flush any buffered records, if the backend implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Release the backend. Called once when the owning pipeline stops.
    ///
    /// Default implementation flushes.
    async fn close(&self) -> Result<(), BoxError> {
        self.flush().await
    }
}
