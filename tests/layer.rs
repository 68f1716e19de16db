mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{adapter_for, config, RecordingSink};
use serde_json::json;
use tracing_sentry_sink::appender::AppenderFactory;
use tracing_sentry_sink::layer::SinkLayer;
use tracing_sentry_sink::record::Severity;
use tracing_sentry_sink::root::RootLogger;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

#[tokio::test]
async fn forwards_events_with_span_context() {
    let sink = Arc::new(RecordingSink::default());
    let root = Arc::new(RootLogger::new());
    let mut sink_config = config();
    sink_config.threshold = Some(Severity::Warn);
    let appender = root.add_appender(AppenderFactory::new(sink_config).build(&adapter_for(sink.clone())).unwrap());

    let layer = SinkLayer::new(Arc::clone(&root));
    let total = Arc::clone(&layer.total_events);
    let forwarded = Arc::clone(&layer.forwarded_events);
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        let outer = tracing::info_span!("request", request_id = "r-1", tenant = "acme", user = tracing::field::Empty);
        let _outer = outer.enter();
        outer.record("user", "u-7");

        let inner = tracing::info_span!("charge", tenant = "acme-eu");
        let _inner = inner.enter();

        tracing::error!(target: "billing", amount = 42, "charge failed");
        tracing::warn!(target: "billing", tenant = "override", "retrying");
        tracing::info!(target: "billing", "below threshold");
        tracing::error!(target: "io.sentry.connection", "connection refused");
        tracing::error!(target: "sentry_core::client", "transport error");
    });

    let stats = appender.stop().await;
    assert_eq!(stats.enqueued, 2);
    assert_eq!(stats.delivered, 2);
    assert_eq!(total.load(Ordering::Relaxed), 5);
    assert_eq!(forwarded.load(Ordering::Relaxed), 4);

    let records = sink.records();
    assert_eq!(records.len(), 2);

    let failed = &records[0];
    assert_eq!(failed.level, Severity::Error);
    assert_eq!(failed.target, "billing");
    assert_eq!(failed.message.as_deref(), Some("charge failed"));
    assert_eq!(failed.fields["request_id"], json!("r-1"));
    assert_eq!(failed.fields["user"], json!("u-7"));
    assert_eq!(failed.fields["tenant"], json!("acme-eu"));
    assert_eq!(failed.fields["amount"], json!(42));
    assert!(failed.line.is_some());

    let retry = &records[1];
    assert_eq!(retry.level, Severity::Warn);
    assert_eq!(retry.fields["tenant"], json!("override"));
}

#[tokio::test]
async fn nothing_is_forwarded_without_appenders() {
    let root = Arc::new(RootLogger::new());
    let layer = SinkLayer::new(Arc::clone(&root));
    let forwarded = Arc::clone(&layer.forwarded_events);

    tracing::subscriber::with_default(Registry::default().with(layer), || {
        tracing::error!("nobody is listening");
    });

    assert_eq!(forwarded.load(Ordering::Relaxed), 0);
}
