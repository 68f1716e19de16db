use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::error;

use tracing_sentry_sink::adapter::{SinkAdapter, SinkConfig, NOOP_CLIENT_FACTORY};
use tracing_sentry_sink::appender::AppenderFactory;
use tracing_sentry_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_sentry_sink::pipeline::{OverflowPolicy, PipelineConfig};
use tracing_sentry_sink::root::RootLogger;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = Arc::new(RootLogger::new());
    init_tracing_with_config(Arc::clone(&root), LayerConfig { enable_stdout: false })?;

    let pipeline = PipelineConfig {
        capacity: 50_000,
        overflow: OverflowPolicy::DropOldest,
        delivery_timeout: None,
        drain_timeout: Duration::from_secs(5),
    };
    let config = SinkConfig {
        dsn: Some("https://public@localhost/1".to_string()),
        client_factory: Some(NOOP_CLIENT_FACTORY.to_string()),
        ..Default::default()
    };
    let appender = root.add_appender(
        AppenderFactory::new(config)
            .with_pipeline(pipeline)
            .build(&SinkAdapter::default())?,
    );

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let stats = appender.stop().await;
    println!("{:?}", stats);
    Ok(())
}
