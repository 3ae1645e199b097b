use tracing::Level;
use tracing_subscriber::EnvFilter;
use tsdns_proxy_domain::config::{LogFormat, LoggingConfig};

/// Client libraries that are chatty at debug level.
const QUIET_TARGETS: &[&str] = &["kube", "hyper", "hyper_util", "tower", "rustls"];

/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &LoggingConfig) {
    let level = parse_level(&config.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level.unwrap_or(Level::WARN))));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_ids(false)
        .with_level(true);

    match config.format {
        LogFormat::Json => builder.json().with_target(true).with_current_span(false).init(),
        LogFormat::Pretty => builder
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init(),
    }

    if level.is_none() {
        tracing::warn!(level = %config.level, "Unknown log level, using warn");
    }
    tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
}

fn parse_level(raw: &str) -> Option<Level> {
    raw.trim().parse().ok()
}

fn filter_directives(level: Level) -> String {
    QUIET_TARGETS
        .iter()
        .fold(level.to_string().to_lowercase(), |acc, target| {
            format!("{},{}=warn", acc, target)
        })
}
