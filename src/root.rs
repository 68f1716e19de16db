use std::mem;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::appender::Appender;
use crate::record::{LogRecord, Severity};

/// The set of appenders that receive every record seen by the
/// [`SinkLayer`](crate::layer::SinkLayer).
///
/// Appenders are only ever attached or detached through explicit calls;
/// building an appender does not touch the root logger.
#[derive(Debug, Default)]
pub struct RootLogger {
    appenders: RwLock<Vec<Arc<Appender>>>,
}

impl RootLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_appender(&self, appender: Appender) -> Arc<Appender> {
        let appender = Arc::new(appender);
        self.write().push(Arc::clone(&appender));
        appender
    }

    /// Snapshot of the attached appenders.
    pub fn appenders(&self) -> Vec<Arc<Appender>> {
        self.appenders.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn is_empty(&self) -> bool {
        self.appenders.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }

    /// Whether any attached appender's threshold lets `level` through.
    pub fn accepts_level(&self, level: Severity) -> bool {
        self.appenders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|a| level >= a.threshold())
    }

    /// Offer `record` to every attached appender.
    pub fn append(&self, record: &LogRecord) {
        // appenders may block under the Block overflow policy; don't hold the lock meanwhile
        for appender in self.appenders() {
            appender.append(record);
        }
    }

    /// Detach every appender and shut its pipeline down. Returns how many
    /// were detached.
    pub async fn detach_and_stop_all(&self) -> usize {
        let detached = mem::take(&mut *self.write());
        stop_all(&detached).await;
        detached.len()
    }

    /// Swap the attached appenders for `appenders`, then stop the ones that
    /// were detached.
    pub async fn replace_appenders(&self, appenders: Vec<Appender>) -> Vec<Arc<Appender>> {
        let attached: Vec<Arc<Appender>> = appenders.into_iter().map(Arc::new).collect();
        let detached = mem::replace(&mut *self.write(), attached.clone());
        stop_all(&detached).await;
        attached
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Appender>>> {
        self.appenders.write().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn stop_all(appenders: &[Arc<Appender>]) {
    for appender in appenders {
        let stats = appender.stop().await;
        debug!(appender = appender.name(), ?stats, "appender detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FactoryRegistry, SinkAdapter, SinkConfig, NOOP_CLIENT_FACTORY};
    use crate::appender::AppenderFactory;
    use crate::pipeline::PipelineState;

    fn appender(name: &str, threshold: Severity) -> Appender {
        let adapter = SinkAdapter::new(FactoryRegistry::with_defaults()).with_default_factory(NOOP_CLIENT_FACTORY);
        AppenderFactory::new(SinkConfig {
            dsn: Some("https://u:p@host/1".to_string()),
            threshold: Some(threshold),
            ..Default::default()
        })
        .with_name(name)
        .build(&adapter)
        .unwrap()
    }

    #[tokio::test]
    async fn fans_out_to_every_appender() {
        let root = RootLogger::new();
        let errors = root.add_appender(appender("errors", Severity::Error));
        let warnings = root.add_appender(appender("warnings", Severity::Warn));

        root.append(&LogRecord::new(Severity::Warn, "app", "slow query"));
        root.append(&LogRecord::new(Severity::Error, "app", "query failed"));

        assert_eq!(errors.stop().await.enqueued, 1);
        assert_eq!(warnings.stop().await.enqueued, 2);
    }

    #[tokio::test]
    async fn level_check_uses_lowest_threshold() {
        let root = RootLogger::new();
        assert!(!root.accepts_level(Severity::Error));
        root.add_appender(appender("warnings", Severity::Warn));
        assert!(root.accepts_level(Severity::Warn));
        assert!(!root.accepts_level(Severity::Info));
        root.detach_and_stop_all().await;
    }

    #[tokio::test]
    async fn detach_stops_pipelines() {
        let root = RootLogger::new();
        let first = root.add_appender(appender("first", Severity::Error));
        assert_eq!(root.detach_and_stop_all().await, 1);
        assert!(root.is_empty());
        assert_eq!(first.pipeline().state(), PipelineState::Stopped);
        assert_eq!(root.detach_and_stop_all().await, 0);
    }

    #[tokio::test]
    async fn replace_swaps_sink_set() {
        let root = RootLogger::new();
        let old = root.add_appender(appender("old", Severity::Error));
        let attached = root.replace_appenders(vec![appender("new", Severity::Error)]).await;

        assert_eq!(old.pipeline().state(), PipelineState::Stopped);
        assert_eq!(attached.len(), 1);
        let names: Vec<String> = root.appenders().iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["new".to_string()]);
        root.detach_and_stop_all().await;
    }
}
