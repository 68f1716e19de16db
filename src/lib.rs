pub mod record;
pub mod sink;
pub mod filter;
pub mod locator;
pub mod adapter;
pub mod pipeline;
pub mod appender;
pub mod root;
pub mod layer;

#[cfg(feature = "sentry")]
pub mod sentry_sink;

pub mod bootstrap;
pub mod init;
pub mod noop_sink;
pub mod console_sink;
