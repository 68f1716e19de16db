use crate::layer::SinkLayer;
use crate::root::RootLogger;
use std::sync::Arc;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global subscriber installed by
/// [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked next to the [`SinkLayer`] so events are printed to the console
///   as well.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self { enable_stdout: true }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] SetGlobalDefaultError),
}

/// Install the global `tracing` subscriber that feeds `root`.
///
/// **Parameters**
/// - `root`: [`RootLogger`] whose appenders receive every event. Appenders
///   may be attached before or after this call.
/// - `config`: [`LayerConfig`] controlling the console output.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`SinkLayer`] as the global default
/// subscriber. Fails if another global subscriber was installed first.
pub fn init_tracing_with_config(root: Arc<RootLogger>, config: LayerConfig) -> Result<(), InitError> {
    let layer = SinkLayer::new(root);

    // The two arms build differently typed subscribers.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(root: Arc<RootLogger>) -> Result<(), InitError> {
    init_tracing_with_config(root, LayerConfig::default())
}
