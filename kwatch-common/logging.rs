use anyhow::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes logging to stdout and returns the worker guard that flushes buffered lines on drop.\
/// `level` is used when `RUST_LOG` is not set; `json` switches the line format from logfmt-style
/// compact output to one JSON object per line.
pub fn initialize(level: &str, json: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let timer = time::format_description::parse("[year]-[month padding:zero]-[day padding:zero] [hour]:[minute]:[second]")?;
    let time_offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(time_offset, timer);

    let env_filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(level.to_ascii_lowercase()));

    let subscriber = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_timer(timer)
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(env_filter)
            .boxed()
    };

    tracing_subscriber::registry().with(subscriber).with(ErrorLayer::default()).init();

    Ok(guard)
}
