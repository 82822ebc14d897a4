use anyhow::Result;
use enclave_config::{LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Build the event filter from an explicit directive, falling back to
/// `RUST_LOG` and then `info`
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config.level.as_str());
    let location = config.include_location;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(location)
        .with_line_number(location);

    let fmt_layer = match config.format {
        LogFormat::Text => fmt_layer.boxed(),
        LogFormat::Compact => fmt_layer.compact().with_target(false).boxed(),
        LogFormat::Pretty => fmt_layer.pretty().boxed(),
        LogFormat::Json => fmt_layer.json().with_current_span(false).boxed(),
    };

    // Use try_init to avoid panic if global subscriber already set
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    let env_filter = build_env_filter(log_level);

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}
