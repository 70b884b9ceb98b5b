/*!
 * Logging Module
 * Centralized logging configuration and request logging middleware
 */
pub mod config;
pub mod middleware;

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use config::{LogConfig, LogFormat};

/// Initialize the logging system.
///
/// The returned guards flush the background writers when dropped, so the
/// caller must hold them until shutdown.
pub fn init(config: &LogConfig) -> Vec<WorkerGuard> {
    std::fs::create_dir_all(&config.directory).ok();

    // All logs
    let (file_writer, file_guard) = non_blocking(rolling::daily(&config.directory, "app.log"));
    // Errors only
    let (error_writer, error_guard) =
        non_blocking(rolling::daily(&config.directory, "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => {
            let file_layer = fmt::layer()
                .json()
                .with_writer(file_writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);

            let error_layer = fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

            let console_layer = fmt::layer()
                .json()
                .with_writer(console_writer)
                .with_target(false);

            subscriber
                .with(file_layer)
                .with(error_layer)
                .with(console_layer)
                .init();
        }
        LogFormat::Pretty => {
            let file_layer = fmt::layer()
                .with_writer(file_writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);

            let error_layer = fmt::layer()
                .json()
                .with_writer(error_writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::ERROR);

            let console_layer = fmt::layer()
                .with_writer(console_writer)
                .with_target(true)
                .pretty();

            subscriber
                .with(file_layer)
                .with(error_layer)
                .with(console_layer)
                .init();
        }
    }

    tracing::info!(
        environment = %config.environment,
        format = %config.format,
        "Logging initialized"
    );

    vec![file_guard, error_guard, console_guard]
}
