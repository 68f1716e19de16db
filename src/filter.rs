use crate::record::LogRecord;
use std::borrow::Cow;

/// Outcome of running a [`RecordFilter`] against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReply {
    Accept,
    Deny,
}

/// A step in an appender's filter chain.
///
/// A record reaches the delivery pipeline only if every filter accepts it.
pub trait RecordFilter: Send + Sync {
    fn decide(&self, record: &LogRecord) -> FilterReply;
}

impl<F> RecordFilter for F
where
    F: Fn(&LogRecord) -> FilterReply + Send + Sync,
{
    fn decide(&self, record: &LogRecord) -> FilterReply {
        self(record)
    }
}

/// Source prefixes used by the error-reporting client and by this crate.
///
/// The last entry is this crate's own target, so warnings about failed
/// deliveries never re-enter the pipeline that produced them.
pub const DEFAULT_SUPPRESSED_PREFIXES: &[&str] =
    &["io.sentry", "sentry", "sentry_core", env!("CARGO_CRATE_NAME")];

/// Drops records emitted by the error-reporting client itself.
///
/// Without it a sink that logs through the same subscriber would report its
/// own delivery failures, which would fail again and be reported again.
///
/// Matching is case-sensitive and aligned on namespace segments: a target
/// is denied when it equals a prefix or continues it with `.` or `::`.
/// `io.sentry.logback` is denied, `io.sentryx` and `org.example.sentry` are
/// not.
#[derive(Debug, Clone)]
pub struct SelfLoggingFilter {
    prefixes: Vec<Cow<'static, str>>,
}

impl SelfLoggingFilter {
    /// Filter for a single vendor prefix.
    pub fn new(prefix: impl Into<Cow<'static, str>>) -> Self {
        SelfLoggingFilter { prefixes: vec![prefix.into()] }
    }

    pub fn with_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(|p| p.as_ref())
    }

    /// Decide on a bare source identifier.
    pub fn decide_target(&self, target: &str) -> FilterReply {
        if self.prefixes.iter().any(|p| is_in_namespace(target, p)) {
            FilterReply::Deny
        } else {
            FilterReply::Accept
        }
    }
}

impl Default for SelfLoggingFilter {
    fn default() -> Self {
        SelfLoggingFilter {
            prefixes: DEFAULT_SUPPRESSED_PREFIXES.iter().map(|p| Cow::Borrowed(*p)).collect(),
        }
    }
}

impl RecordFilter for SelfLoggingFilter {
    fn decide(&self, record: &LogRecord) -> FilterReply {
        self.decide_target(&record.target)
    }
}

fn is_in_namespace(target: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return false;
    }
    match target.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with("::"),
        None => false,
    }
}
