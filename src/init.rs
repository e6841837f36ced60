use crate::error::SinkError;
use crate::layer::FileLogLayer;
use crate::service::LogSinkService;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Options for the global subscriber installed by [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`FileLogLayer`] so events are also printed to the
///   console. Level filtering of the console output is left to `fmt`'s
///   defaults; the file side uses the sink's own thresholds.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self { enable_stdout: true }
    }
}

/// Install a global `tracing` subscriber that feeds `service`.
///
/// **Returns**
/// - `Err(SinkError::Subscriber)` if a global subscriber was already set.
pub fn init_tracing_with_config(service: &LogSinkService, config: LayerConfig) -> Result<(), SinkError> {
    let layer = FileLogLayer::new(service.handle());

    // The two subscriber shapes have different types, hence two branches.
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

/// Equivalent to [`init_tracing_with_config`] with [`LayerConfig::default`].
pub fn init_tracing(service: &LogSinkService) -> Result<(), SinkError> {
    init_tracing_with_config(service, LayerConfig::default())
}
