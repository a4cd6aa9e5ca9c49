pub mod config;
pub use self::config::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{Layer, Registry};

fn build_filter(max_level: &LoggingLevel, directives: &str, env: &str) -> EnvFilter {
    let mut filter_builder = EnvFilter::builder();
    if !env.is_empty() {
        filter_builder = filter_builder.with_env_var(env);
    }
    filter_builder
        .with_default_directive(max_level.clone().into())
        .parse_lossy(directives)
}

/// Install the global subscriber: a console layer and an optional rolling file
/// layer, each with its own filter under the global one.
pub fn initialize_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    if !config.enable {
        return Ok(());
    }
    let filter = build_filter(&config.max_level, &config.level_filter, &config.level_filter_env);
    let console = {
        let config = &config.console;
        config.enable.then(|| {
            let debug = config.enable_debug_logging;
            tracing_subscriber::fmt::layer()
                .with_file(debug)
                .with_line_number(debug)
                .with_thread_ids(debug)
                .with_target(debug)
                .with_filter(build_filter(
                    &config.max_level,
                    &config.level_filter,
                    &config.level_filter_env,
                ))
        })
    };
    let file = {
        let config = &config.file;
        config.enable.then(|| {
            let debug = config.enable_debug_logging;
            let file_appender = RollingFileAppender::new(
                config.rolling_time.clone().into(),
                &config.path,
                &config.prefix,
            );
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender)
                .with_file(debug)
                .with_line_number(debug)
                .with_thread_ids(debug)
                .with_target(debug)
                .with_filter(build_filter(
                    &config.max_level,
                    &config.level_filter,
                    &config.level_filter_env,
                ))
        })
    };
    Registry::default().with(filter).with(console).with(file).try_init()?;
    Ok(())
}
