use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_sentry_sink::{
    adapter::{FactoryRegistry, SinkAdapter, SinkOptions},
    bootstrap::Bootstrap,
    init::init_tracing,
    locator::Locator,
    record::LogRecord,
    root::RootLogger,
    sink::{BoxError, LogSink},
};

/// Example of plugging in a completely custom client by registering a
/// factory under a name and selecting it as the default. Imagine this talks
/// to an in-house error tracker.
struct MyTrackerSink {
    project: String,
}

#[async_trait]
impl LogSink for MyTrackerSink {
    async fn send(&self, record: &LogRecord) -> Result<(), BoxError> {
        // Here you would call your own client library.
        println!("[my-tracker:{}] {:?}", self.project, record);
        Ok(())
    }
}

fn my_tracker(locator: &Locator, _options: &SinkOptions) -> Result<Arc<dyn LogSink>, BoxError> {
    Ok(Arc::new(MyTrackerSink { project: locator.path().to_string() }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = FactoryRegistry::with_defaults();
    registry.register("my-tracker", my_tracker);
    let adapter = SinkAdapter::new(registry).with_default_factory("my-tracker");

    let root = Arc::new(RootLogger::new());
    init_tracing(Arc::clone(&root))?;

    let appender = Bootstrap::with_dsn("https://key@tracker.internal/payments")
        .with_adapter(adapter)
        .bootstrap(&root)
        .await?;

    info!("custom backend example started");
    error!(db = "my-custom-db", "simulated error sent via custom backend");

    appender.stop().await;
    Ok(())
}
