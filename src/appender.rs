use std::fmt;
use std::sync::Arc;

use crate::adapter::{SinkAdapter, SinkConfig, SinkError};
use crate::filter::{FilterReply, RecordFilter, SelfLoggingFilter};
use crate::pipeline::{AsyncDeliveryPipeline, PipelineConfig, PipelineError, PipelineStats};
use crate::record::{LogRecord, Severity};

/// Name given to appenders built by [`AppenderFactory`] unless overridden.
pub const APPENDER_NAME: &str = "sentry";

/// Threshold used when the sink config does not set one: every level passes.
pub const DEFAULT_THRESHOLD: Severity = Severity::Trace;

/// Error returned by [`AppenderFactory::build`].
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// A named sink attached to the [`RootLogger`](crate::root::RootLogger):
/// a severity threshold, a filter chain and the delivery pipeline behind
/// them.
pub struct Appender {
    name: String,
    threshold: Severity,
    filters: Vec<Arc<dyn RecordFilter>>,
    pipeline: AsyncDeliveryPipeline,
}

impl Appender {
    pub fn new(name: impl Into<String>, threshold: Severity, pipeline: AsyncDeliveryPipeline) -> Self {
        Appender { name: name.into(), threshold, filters: Vec::new(), pipeline }
    }

    /// Append a filter to the chain. Filters run in insertion order.
    pub fn with_filter(mut self, filter: impl RecordFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    fn with_shared_filter(mut self, filter: Arc<dyn RecordFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn pipeline(&self) -> &AsyncDeliveryPipeline {
        &self.pipeline
    }

    /// Run the threshold and the filter chain without delivering.
    pub fn decide(&self, record: &LogRecord) -> FilterReply {
        if record.level < self.threshold {
            return FilterReply::Deny;
        }
        for filter in &self.filters {
            if filter.decide(record) == FilterReply::Deny {
                return FilterReply::Deny;
            }
        }
        FilterReply::Accept
    }

    /// Hand `record` to the pipeline if the chain accepts it.
    pub fn append(&self, record: &LogRecord) -> FilterReply {
        let reply = self.decide(record);
        if reply == FilterReply::Accept {
            self.pipeline.deliver(record.clone());
        }
        reply
    }

    /// Shut the pipeline down and release the sink.
    pub async fn stop(&self) -> PipelineStats {
        self.pipeline.shutdown().await
    }
}

impl fmt::Debug for Appender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Appender")
            .field("name", &self.name)
            .field("threshold", &self.threshold)
            .field("filters", &self.filters.len())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// Builds a started [`Appender`] from a [`SinkConfig`].
///
/// The chain is assembled as: severity threshold, user filters in the order
/// they were added, then the [`SelfLoggingFilter`] so the client's own log
/// lines never reach its pipeline.
#[derive(Clone, Default)]
pub struct AppenderFactory {
    pub name: Option<String>,
    pub sink: SinkConfig,
    pub pipeline: PipelineConfig,
    pub self_logging: SelfLoggingFilter,
    filters: Vec<Arc<dyn RecordFilter>>,
}

impl AppenderFactory {
    pub fn new(sink: SinkConfig) -> Self {
        AppenderFactory { sink, ..Default::default() }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_self_logging(mut self, filter: SelfLoggingFilter) -> Self {
        self.self_logging = filter;
        self
    }

    pub fn with_filter(mut self, filter: impl RecordFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Build the sink handle through `adapter`, start its pipeline and wrap
    /// both in an [`Appender`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(&self, adapter: &SinkAdapter) -> Result<Appender, BuildError> {
        let handle = adapter.build(&self.sink)?;
        let pipeline = AsyncDeliveryPipeline::spawn(handle, self.pipeline.clone())?;

        let name = self.name.clone().unwrap_or_else(|| APPENDER_NAME.to_string());
        let threshold = self.sink.threshold.unwrap_or(DEFAULT_THRESHOLD);

        let mut appender = Appender::new(name, threshold, pipeline);
        for filter in &self.filters {
            appender = appender.with_shared_filter(Arc::clone(filter));
        }
        Ok(appender.with_filter(self.self_logging.clone()))
    }
}

impl fmt::Debug for AppenderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppenderFactory")
            .field("name", &self.name)
            .field("sink", &self.sink)
            .field("pipeline", &self.pipeline)
            .field("self_logging", &self.self_logging)
            .field("filters", &self.filters.len())
            .finish()
    }
}
